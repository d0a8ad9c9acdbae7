//! Price alert state.

use crate::alerts::AlertTrigger;
use crate::models::PriceAlert;

/// Number of fired alerts kept for display.
const RECENT_TRIGGERS: usize = 20;

#[derive(Debug, Default)]
pub struct AlertState {
    pub alerts: Vec<PriceAlert>,
    pub selected_index: Option<usize>,
    /// Alerts fired this session, newest first.
    pub recent: Vec<AlertTrigger>,
    pub loading: bool,
}

impl AlertState {
    pub fn selected(&self) -> Option<&PriceAlert> {
        self.selected_index.and_then(|i| self.alerts.get(i))
    }

    pub fn armed_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.is_armed()).count()
    }

    /// Record a fired alert and mirror the deactivation locally.
    pub fn record(&mut self, trigger: AlertTrigger) {
        if let Some(alert) = self.alerts.iter_mut().find(|a| a.id == trigger.alert.id) {
            alert.is_active = false;
            alert.triggered_at = Some(trigger.triggered_at);
        }
        self.recent.insert(0, trigger);
        self.recent.truncate(RECENT_TRIGGERS);
    }
}
