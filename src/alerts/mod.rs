//! Client-side price alert monitoring.
//!
//! Each polling cycle loads a user's armed alerts, fetches current prices
//! for their coins and fires every alert whose threshold is crossed. A fired
//! alert is deactivated in the backend, reported to the [`AlertSink`] with
//! the observed price and, when permitted, announced through a
//! [`DesktopNotifier`]. Polling is best effort: a failed cycle is logged and
//! the next tick runs as usual.

mod monitor;
mod notify;

pub use monitor::{AlertMonitor, MonitorHandle};
pub use notify::{DesktopNotifier, TerminalBell};

use crate::error::Result;
use crate::market::PriceSnapshot;
use crate::models::PriceAlert;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// An alert that crossed its threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTrigger {
    /// The alert as it was before triggering.
    pub alert: PriceAlert,
    /// Price that crossed the threshold.
    pub price: Decimal,
    /// When the crossing was observed.
    pub triggered_at: DateTime<Utc>,
}

impl AlertTrigger {
    /// One-line human description.
    pub fn describe(&self) -> String {
        format!(
            "{} is {} {} (now {})",
            self.alert.coin_id,
            self.alert.condition,
            self.alert.target_price.normalize(),
            self.price.normalize()
        )
    }
}

/// Persistence the monitor needs.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Alerts of `user_id` that are active and never triggered.
    async fn armed_alerts(&self, user_id: Uuid) -> Result<Vec<PriceAlert>>;

    /// Deactivate an alert, stamping the trigger time.
    async fn mark_triggered(&self, alert_id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Receives every fired alert.
pub trait AlertSink: Send + Sync {
    fn on_alert(&self, trigger: &AlertTrigger);
}

impl<F> AlertSink for F
where
    F: Fn(&AlertTrigger) + Send + Sync,
{
    fn on_alert(&self, trigger: &AlertTrigger) {
        self(trigger)
    }
}

/// Alerts in `alerts` that fire against `snapshot`.
///
/// Alerts that are not armed, or whose coin is missing from the snapshot,
/// never fire.
pub fn evaluate(
    alerts: &[PriceAlert],
    snapshot: &PriceSnapshot,
    now: DateTime<Utc>,
) -> Vec<AlertTrigger> {
    alerts
        .iter()
        .filter(|alert| alert.is_armed())
        .filter_map(|alert| {
            let price = snapshot.price(&alert.coin_id)?;
            alert.is_met_by(price).then(|| AlertTrigger {
                alert: alert.clone(),
                price,
                triggered_at: now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertCondition;
    use rust_decimal_macros::dec;

    fn alert(coin: &str, target: Decimal, condition: AlertCondition) -> PriceAlert {
        PriceAlert {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            coin_id: coin.to_string(),
            target_price: target,
            condition,
            is_active: true,
            triggered_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_above_fires_at_or_over_target() {
        let alerts = [
            alert("bitcoin", dec!(60000), AlertCondition::Above),
            alert("bitcoin", dec!(65000), AlertCondition::Above),
            alert("bitcoin", dec!(70000), AlertCondition::Above),
        ];
        let snapshot = PriceSnapshot::from_iter([("bitcoin", dec!(65000))]);

        let fired = evaluate(&alerts, &snapshot, Utc::now());
        let targets: Vec<Decimal> = fired.iter().map(|t| t.alert.target_price).collect();
        assert_eq!(targets, vec![dec!(60000), dec!(65000)]);
        assert!(fired.iter().all(|t| t.price == dec!(65000)));
    }

    #[test]
    fn test_below_fires_at_or_under_target() {
        let alerts = [
            alert("ethereum", dec!(2500), AlertCondition::Below),
            alert("ethereum", dec!(3000), AlertCondition::Below),
        ];
        let snapshot = PriceSnapshot::from_iter([("ethereum", dec!(2500))]);

        let fired = evaluate(&alerts, &snapshot, Utc::now());
        assert_eq!(fired.len(), 2);
    }

    #[test]
    fn test_missing_coin_skipped() {
        let alerts = [alert("dogecoin", dec!(0.01), AlertCondition::Above)];
        let snapshot = PriceSnapshot::from_iter([("bitcoin", dec!(65000))]);
        assert!(evaluate(&alerts, &snapshot, Utc::now()).is_empty());
    }

    #[test]
    fn test_disarmed_alerts_skipped() {
        let mut inactive = alert("bitcoin", dec!(1), AlertCondition::Above);
        inactive.is_active = false;
        let mut triggered = alert("bitcoin", dec!(1), AlertCondition::Above);
        triggered.triggered_at = Some(Utc::now());

        let snapshot = PriceSnapshot::from_iter([("bitcoin", dec!(65000))]);
        assert!(evaluate(&[inactive, triggered], &snapshot, Utc::now()).is_empty());
    }

    #[test]
    fn test_describe() {
        let trigger = AlertTrigger {
            alert: alert("bitcoin", dec!(70000.00), AlertCondition::Above),
            price: dec!(70123.50),
            triggered_at: Utc::now(),
        };
        assert_eq!(trigger.describe(), "bitcoin is above 70000 (now 70123.5)");
    }
}
