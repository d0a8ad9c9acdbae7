//! Signed-in session and its alert monitoring lifecycle.

use crate::alerts::{AlertMonitor, MonitorHandle};
use crate::backend::Session;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Owns the current session and the single monitoring task bound to it.
///
/// Signing in replaces any running monitor wholesale and signing out stops
/// it before returning, so at most one polling task is ever live.
pub struct SessionController {
    monitor: Option<AlertMonitor>,
    interval: Duration,
    session: Option<Session>,
    handle: Option<MonitorHandle>,
}

impl SessionController {
    /// `monitor` is `None` when alert monitoring is disabled.
    pub fn new(monitor: Option<AlertMonitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            session: None,
            handle: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.user_id)
    }

    /// Whether a monitoring task is running.
    pub fn is_monitoring(&self) -> bool {
        self.handle.as_ref().is_some_and(MonitorHandle::is_running)
    }

    /// User the running monitor polls for.
    pub fn monitored_user(&self) -> Option<Uuid> {
        self.handle.as_ref().map(MonitorHandle::user_id)
    }

    /// Adopt `session`, restarting monitoring for its user.
    pub async fn login(&mut self, session: Session) {
        self.stop_monitor().await;

        info!(user_id = %session.user_id, "Session started");
        if let Some(monitor) = &self.monitor {
            self.handle = Some(monitor.start(session.user_id, self.interval));
        }
        self.session = Some(session);
    }

    /// Drop the session. Monitoring has stopped when this returns.
    pub async fn logout(&mut self) {
        self.stop_monitor().await;
        if let Some(session) = self.session.take() {
            info!(user_id = %session.user_id, "Session ended");
        }
    }

    async fn stop_monitor(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertTrigger;
    use crate::backend::{MemoryBackend, Repository};
    use crate::market::{PriceSnapshot, PriceSource};
    use crate::models::{AlertCondition, NewPriceAlert};
    use crate::error::Result;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(60);

    #[derive(Default)]
    struct CountingPrices(AtomicUsize);

    #[async_trait::async_trait]
    impl PriceSource for CountingPrices {
        async fn fetch_prices(&self, _coin_ids: &[String]) -> Result<PriceSnapshot> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(PriceSnapshot::from_iter([("bitcoin", dec!(50000))]))
        }
    }

    fn session(user_id: Uuid) -> Session {
        Session {
            access_token: "token".to_string(),
            user_id,
            email: "user@example.com".to_string(),
            expires_at: None,
        }
    }

    async fn setup(users: &[Uuid]) -> (SessionController, Arc<CountingPrices>) {
        let repo = Repository::new(Arc::new(MemoryBackend::new()));
        for user in users {
            repo.create_alert(&NewPriceAlert::new(
                *user,
                "bitcoin",
                dec!(100000),
                AlertCondition::Above,
            ))
            .await
            .unwrap();
        }
        let prices = Arc::new(CountingPrices::default());
        let sink = |_: &AlertTrigger| {};
        let monitor = AlertMonitor::new(prices.clone(), Arc::new(repo), Arc::new(sink));
        (SessionController::new(Some(monitor), INTERVAL), prices)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_starts_monitoring() {
        let user = Uuid::new_v4();
        let (mut controller, prices) = setup(&[user]).await;

        controller.login(session(user)).await;
        settle().await;

        assert!(controller.is_monitoring());
        assert_eq!(controller.monitored_user(), Some(user));
        assert_eq!(prices.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_change_replaces_monitor() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let (mut controller, prices) = setup(&[first, second]).await;

        controller.login(session(first)).await;
        settle().await;
        controller.login(session(second)).await;
        settle().await;
        assert_eq!(controller.monitored_user(), Some(second));
        assert_eq!(prices.0.load(Ordering::SeqCst), 2);

        // One task polls per interval, not two.
        tokio::time::sleep(INTERVAL).await;
        settle().await;
        assert_eq!(prices.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_login_keeps_one_task() {
        let user = Uuid::new_v4();
        let (mut controller, prices) = setup(&[user]).await;

        controller.login(session(user)).await;
        controller.login(session(user)).await;
        settle().await;
        let after_login = prices.0.load(Ordering::SeqCst);

        tokio::time::sleep(INTERVAL).await;
        settle().await;
        assert_eq!(prices.0.load(Ordering::SeqCst), after_login + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_stops_monitoring() {
        let user = Uuid::new_v4();
        let (mut controller, prices) = setup(&[user]).await;

        controller.login(session(user)).await;
        settle().await;
        controller.logout().await;

        assert!(!controller.is_monitoring());
        assert!(controller.session().is_none());

        tokio::time::sleep(INTERVAL * 3).await;
        settle().await;
        assert_eq!(prices.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_monitoring_still_tracks_session() {
        let mut controller = SessionController::new(None, INTERVAL);
        let user = Uuid::new_v4();

        controller.login(session(user)).await;
        assert_eq!(controller.user_id(), Some(user));
        assert!(!controller.is_monitoring());

        controller.logout().await;
        assert_eq!(controller.user_id(), None);
    }
}
