//! Polling task that drives alert evaluation.

use super::{AlertSink, AlertStore, AlertTrigger, DesktopNotifier, evaluate};
use crate::error::Result;
use crate::market::PriceSource;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Evaluates a user's alerts against live prices.
#[derive(Clone)]
pub struct AlertMonitor {
    prices: Arc<dyn PriceSource>,
    store: Arc<dyn AlertStore>,
    sink: Arc<dyn AlertSink>,
    notifier: Option<Arc<dyn DesktopNotifier>>,
}

impl AlertMonitor {
    /// Create a monitor without desktop notifications.
    pub fn new(
        prices: Arc<dyn PriceSource>,
        store: Arc<dyn AlertStore>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            prices,
            store,
            sink,
            notifier: None,
        }
    }

    /// Announce fired alerts through `notifier`. Passing `permitted = false`
    /// keeps notifications off.
    pub fn with_notifier(mut self, notifier: Arc<dyn DesktopNotifier>, permitted: bool) -> Self {
        self.notifier = permitted.then_some(notifier);
        self
    }

    /// Start polling for `user_id`.
    ///
    /// The first cycle runs immediately, then one per `interval`. Missed
    /// ticks are not caught up. The returned handle owns the task.
    pub fn start(&self, user_id: Uuid, interval: Duration) -> MonitorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        let monitor = self.clone();

        info!(%user_id, interval_secs = interval.as_secs(), "Starting price alert monitoring");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut fired = HashSet::new();

            loop {
                tokio::select! {
                    biased;
                    // Fires on explicit stop and when the handle is dropped.
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                match monitor.cycle(user_id, &mut fired).await {
                    Ok(triggers) if !triggers.is_empty() => {
                        info!(%user_id, count = triggers.len(), "Price alerts triggered");
                    }
                    Ok(_) => debug!(%user_id, "No price alerts triggered"),
                    Err(e) => warn!(%user_id, "Price alert check failed: {}", e),
                }
            }

            debug!(%user_id, "Price alert monitoring stopped");
        });

        MonitorHandle {
            user_id,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Run a single evaluation outside the polling loop.
    pub async fn check_now(&self, user_id: Uuid) -> Result<Vec<AlertTrigger>> {
        self.cycle(user_id, &mut HashSet::new()).await
    }

    /// One polling cycle. `fired` holds alerts already reported by this
    /// session so a failed deactivation never reports an alert twice.
    async fn cycle(&self, user_id: Uuid, fired: &mut HashSet<Uuid>) -> Result<Vec<AlertTrigger>> {
        let alerts: Vec<_> = self
            .store
            .armed_alerts(user_id)
            .await?
            .into_iter()
            .filter(|alert| !fired.contains(&alert.id))
            .collect();

        if alerts.is_empty() {
            return Ok(Vec::new());
        }

        let mut coin_ids: Vec<String> = alerts.iter().map(|a| a.coin_id.clone()).collect();
        coin_ids.sort();
        coin_ids.dedup();

        let snapshot = self.prices.fetch_prices(&coin_ids).await?;
        let triggers = evaluate(&alerts, &snapshot, Utc::now());

        for trigger in &triggers {
            fired.insert(trigger.alert.id);

            if let Err(e) = self
                .store
                .mark_triggered(trigger.alert.id, trigger.triggered_at)
                .await
            {
                warn!(alert_id = %trigger.alert.id, "Failed to deactivate alert: {}", e);
            }

            self.sink.on_alert(trigger);

            if let Some(notifier) = &self.notifier
                && let Err(e) = notifier.notify("Price alert", &trigger.describe())
            {
                debug!("Desktop notification failed: {}", e);
            }
        }

        Ok(triggers)
    }
}

/// Owner of a running monitoring task. Dropping it stops the task.
pub struct MonitorHandle {
    user_id: Uuid,
    shutdown_tx: Option<watch::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// The monitored user.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for it to finish.
    ///
    /// A cycle already in progress runs to completion, so an alert that was
    /// deactivated is always reported. No cycle starts after this returns.
    pub async fn stop(mut self) {
        self.shutdown_tx.take();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(user_id = %self.user_id, "Price alert task ended abnormally: {}", e);
        }
        info!(user_id = %self.user_id, "Stopped price alert monitoring");
    }
}

impl Drop for MonitorHandle {
    /// Closing the shutdown channel ends the loop after the current cycle.
    fn drop(&mut self) {
        self.shutdown_tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, Repository};
    use crate::error::Error;
    use crate::market::{MockPriceSource, PriceSnapshot};
    use crate::models::{AlertCondition, NewPriceAlert};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(60);

    #[derive(Default)]
    struct Recorder {
        triggers: Mutex<Vec<AlertTrigger>>,
    }

    impl AlertSink for Recorder {
        fn on_alert(&self, trigger: &AlertTrigger) {
            self.triggers.lock().unwrap().push(trigger.clone());
        }
    }

    impl Recorder {
        fn prices(&self) -> Vec<Decimal> {
            self.triggers.lock().unwrap().iter().map(|t| t.price).collect()
        }
    }

    /// Fixed prices, counting fetches.
    struct FixedPrices {
        prices: Mutex<PriceSnapshot>,
        calls: AtomicUsize,
    }

    impl FixedPrices {
        fn new(prices: &[(&str, Decimal)]) -> Arc<Self> {
            Arc::new(Self {
                prices: Mutex::new(prices.iter().map(|(id, p)| (*id, *p)).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, prices: &[(&str, Decimal)]) {
            *self.prices.lock().unwrap() = prices.iter().map(|(id, p)| (*id, *p)).collect();
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PriceSource for FixedPrices {
        async fn fetch_prices(&self, _coin_ids: &[String]) -> Result<PriceSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.prices.lock().unwrap().clone())
        }
    }

    struct CountingNotifier(AtomicUsize);

    impl DesktopNotifier for CountingNotifier {
        fn notify(&self, _title: &str, _body: &str) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn setup(
        alerts: &[(&str, Decimal, AlertCondition)],
    ) -> (Repository, Uuid, Arc<Recorder>) {
        let repo = Repository::new(Arc::new(MemoryBackend::new()));
        let user = Uuid::new_v4();
        for (coin, target, condition) in alerts {
            repo.create_alert(&NewPriceAlert::new(user, *coin, *target, *condition))
                .await
                .unwrap();
        }
        (repo, user, Arc::new(Recorder::default()))
    }

    /// Let the monitor task run until it is idle again.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluates_immediately_and_fires_once() {
        let (repo, user, recorder) = setup(&[("bitcoin", dec!(60000), AlertCondition::Above)]).await;
        let prices = FixedPrices::new(&[("bitcoin", dec!(65000))]);
        let monitor = AlertMonitor::new(prices.clone(), Arc::new(repo.clone()), recorder.clone());

        let handle = monitor.start(user, INTERVAL);
        settle().await;
        assert_eq!(recorder.prices(), vec![dec!(65000)]);

        let stored = repo.list_alerts(user).await.unwrap();
        assert!(!stored[0].is_active);
        assert!(stored[0].triggered_at.is_some());

        // Later ticks find nothing armed.
        tokio::time::sleep(INTERVAL * 3).await;
        settle().await;
        assert_eq!(recorder.prices().len(), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_below_fires_when_price_drops() {
        let (repo, user, recorder) = setup(&[("ethereum", dec!(2500), AlertCondition::Below)]).await;
        let prices = FixedPrices::new(&[("ethereum", dec!(3000))]);
        let monitor = AlertMonitor::new(prices.clone(), Arc::new(repo), recorder.clone());

        let handle = monitor.start(user, INTERVAL);
        settle().await;
        assert!(recorder.prices().is_empty());

        prices.set(&[("ethereum", dec!(2499.99))]);
        tokio::time::sleep(INTERVAL).await;
        settle().await;
        assert_eq!(recorder.prices(), vec![dec!(2499.99)]);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_coin_never_fires() {
        let (repo, user, recorder) = setup(&[("dogecoin", dec!(0.01), AlertCondition::Above)]).await;
        let prices = FixedPrices::new(&[("bitcoin", dec!(65000))]);
        let monitor = AlertMonitor::new(prices.clone(), Arc::new(repo.clone()), recorder.clone());

        let handle = monitor.start(user, INTERVAL);
        settle().await;

        assert!(recorder.prices().is_empty());
        assert_eq!(repo.armed_alerts(user).await.unwrap().len(), 1);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_cycles() {
        let (repo, user, recorder) = setup(&[("bitcoin", dec!(100000), AlertCondition::Above)]).await;
        let prices = FixedPrices::new(&[("bitcoin", dec!(65000))]);
        let monitor = AlertMonitor::new(prices.clone(), Arc::new(repo), recorder.clone());

        let handle = monitor.start(user, INTERVAL);
        settle().await;
        assert_eq!(prices.calls(), 1);

        handle.stop().await;
        prices.set(&[("bitcoin", dec!(200000))]);
        tokio::time::sleep(INTERVAL * 5).await;
        settle().await;

        assert_eq!(prices.calls(), 1);
        assert!(recorder.prices().is_empty());
    }

    /// Deactivates first, then stalls before acknowledging, like a remote
    /// write whose response is slow.
    struct SlowStore {
        repo: Repository,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl AlertStore for SlowStore {
        async fn armed_alerts(&self, user_id: Uuid) -> Result<Vec<crate::models::PriceAlert>> {
            self.repo.armed_alerts(user_id).await
        }

        async fn mark_triggered(&self, alert_id: Uuid, at: chrono::DateTime<Utc>) -> Result<()> {
            self.repo.mark_alert_triggered(alert_id, at).await?;
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    /// Never manages to deactivate anything.
    struct FailingStore {
        repo: Repository,
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AlertStore for FailingStore {
        async fn armed_alerts(&self, user_id: Uuid) -> Result<Vec<crate::models::PriceAlert>> {
            self.repo.armed_alerts(user_id).await
        }

        async fn mark_triggered(&self, _alert_id: Uuid, _at: chrono::DateTime<Utc>) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::backend("write rejected"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_write_still_reports_alert() {
        let (repo, user, recorder) = setup(&[("bitcoin", dec!(60000), AlertCondition::Above)]).await;
        let prices = FixedPrices::new(&[("bitcoin", dec!(65000))]);
        let store = Arc::new(SlowStore {
            repo: repo.clone(),
            delay: Duration::from_secs(1),
        });
        let monitor = AlertMonitor::new(prices, store, recorder.clone());

        let handle = monitor.start(user, INTERVAL);
        settle().await;
        // The write landed but its acknowledgement is still pending.
        assert!(repo.armed_alerts(user).await.unwrap().is_empty());
        assert!(recorder.prices().is_empty());

        handle.stop().await;

        assert_eq!(recorder.prices(), vec![dec!(65000)]);
        let stored = repo.list_alerts(user).await.unwrap();
        assert!(!stored[0].is_active);
        assert!(stored[0].triggered_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_deactivation_reports_once_per_session() {
        let (repo, user, recorder) = setup(&[("bitcoin", dec!(60000), AlertCondition::Above)]).await;
        let prices = FixedPrices::new(&[("bitcoin", dec!(65000))]);
        let store = Arc::new(FailingStore {
            repo: repo.clone(),
            attempts: AtomicUsize::new(0),
        });
        let monitor = AlertMonitor::new(prices, store.clone(), recorder.clone());

        let handle = monitor.start(user, INTERVAL);
        settle().await;
        for _ in 0..5 {
            tokio::time::sleep(INTERVAL).await;
            settle().await;
        }
        handle.stop().await;

        assert_eq!(recorder.prices(), vec![dec!(65000)]);
        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
        // Still armed in the backend, so a later session reports it again.
        assert_eq!(repo.armed_alerts(user).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_task() {
        let (repo, user, recorder) = setup(&[("bitcoin", dec!(100000), AlertCondition::Above)]).await;
        let prices = FixedPrices::new(&[("bitcoin", dec!(65000))]);
        let monitor = AlertMonitor::new(prices.clone(), Arc::new(repo), recorder);

        drop(monitor.start(user, INTERVAL));
        tokio::time::sleep(INTERVAL * 2).await;
        settle().await;

        assert!(prices.calls() <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_keeps_polling() {
        let (repo, user, recorder) = setup(&[("bitcoin", dec!(60000), AlertCondition::Above)]).await;

        let mut mock = MockPriceSource::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_fetch_prices()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::network("connection reset")));
        mock.expect_fetch_prices()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|ids: &[String]| ids == ["bitcoin".to_string()])
            .returning(|_| Ok(PriceSnapshot::from_iter([("bitcoin", dec!(61000))])));

        let monitor = AlertMonitor::new(Arc::new(mock), Arc::new(repo), recorder.clone());
        let handle = monitor.start(user, INTERVAL);
        settle().await;
        assert!(recorder.prices().is_empty());

        tokio::time::sleep(INTERVAL).await;
        settle().await;
        assert_eq!(recorder.prices(), vec![dec!(61000)]);

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_notifier_respects_permission() {
        let (repo, user, recorder) = setup(&[
            ("bitcoin", dec!(1), AlertCondition::Above),
            ("bitcoin", dec!(2), AlertCondition::Above),
        ])
        .await;
        let prices = FixedPrices::new(&[("bitcoin", dec!(65000))]);
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));

        let denied = AlertMonitor::new(prices.clone(), Arc::new(repo.clone()), recorder.clone())
            .with_notifier(notifier.clone(), false);
        assert!(denied.notifier.is_none());

        let allowed = AlertMonitor::new(prices, Arc::new(repo), recorder.clone())
            .with_notifier(notifier.clone(), true);
        let triggers = allowed.check_now(user).await.unwrap();

        assert_eq!(triggers.len(), 2);
        assert_eq!(notifier.0.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.prices().len(), 2);
    }

    #[tokio::test]
    async fn test_no_alerts_skips_price_fetch() {
        let (repo, user, recorder) = setup(&[]).await;
        let mut mock = MockPriceSource::new();
        mock.expect_fetch_prices().never();

        let monitor = AlertMonitor::new(Arc::new(mock), Arc::new(repo), recorder);
        assert!(monitor.check_now(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closure_sink() {
        let (repo, user, _) = setup(&[("solana", dec!(150), AlertCondition::Above)]).await;
        let prices = FixedPrices::new(&[("solana", dec!(151))]);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let sink = move |_: &AlertTrigger| {
            counter.fetch_add(1, Ordering::SeqCst);
        };

        let monitor = AlertMonitor::new(prices, Arc::new(repo), Arc::new(sink));
        monitor.check_now(user).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
