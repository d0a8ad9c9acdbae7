//! State management for hodlr.
//!
//! State changes flow one way: input and background tasks dispatch
//! [`Action`]s, the [`Store`] reduces them, and the UI renders the result.
//! Actions with side effects (network, backend writes) are intercepted by
//! the application before they reach the reducer.

mod admin_state;
mod alert_state;
mod app_state;
mod feed_state;
mod market_state;
mod watchlist_state;

pub use admin_state::{AdminPane, AdminState, ReportRow};
pub use alert_state::AlertState;
pub use app_state::{AppState, ComposeTarget, InputMode, SessionInfo, View};
pub use feed_state::FeedState;
pub use market_state::{ChartSeries, Coin, MarketState, PricePoint};
pub use watchlist_state::WatchlistState;

use crate::alerts::AlertTrigger;
use crate::error::Result;
use crate::models::{Admin, Ban, Comment, FavoriteCoin, PriceAlert};
use crate::social::FeedItem;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Actions that can be dispatched to modify state.
#[derive(Debug, Clone)]
pub enum Action {
    // Navigation
    SetView(View),
    SetInputMode(InputMode),
    StartCompose(ComposeTarget),

    // Text input
    InputChar(char),
    InputBackspace,
    InputLeft,
    InputRight,
    SubmitInput,
    CancelInput,

    // Session
    SessionChanged(Option<SessionInfo>),
    SignOut,

    // Markets
    RefreshMarkets,
    MarketsLoaded(Vec<Coin>),
    NextPage,
    PrevPage,
    LoadChart,
    ChartLoaded(ChartSeries),

    // Feed
    RefreshFeed,
    FeedLoaded(Vec<FeedItem>),
    OpenPost,
    ClosePost,
    CommentsLoaded(Uuid, Vec<Comment>),
    ToggleLike,
    DeleteSelected,

    // Watchlist
    RefreshWatchlist,
    WatchlistLoaded(Vec<FavoriteCoin>),
    ToggleFavorite,

    // Alerts
    RefreshAlerts,
    AlertsLoaded(Vec<PriceAlert>),
    AlertTriggered(AlertTrigger),

    // Admin
    RefreshAdmin,
    AdminLoaded {
        me: Option<Admin>,
        reports: Vec<ReportRow>,
        bans: Vec<Ban>,
        admins: Vec<Admin>,
    },
    ActionReport,
    DismissReport,
    CycleAdminPane,
    UnbanSelected,
    RevokeSelected,

    // UI actions
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    ToggleHelp,
    ShowNotification(Notification),
    DismissNotification,
    Tick,

    // Data refresh
    RefreshAll,

    // Errors surface as toasts; warnings are for failures worth retrying
    SetError(String),
    SetWarning(String),

    // Connection status
    SetConnected(bool),
    SetLoading(bool),

    Quit,
}

/// A notification to display to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub duration_secs: u64,
}

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
            duration_secs: 3,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Success,
            duration_secs: 3,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Warning,
            duration_secs: 5,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
            duration_secs: 10,
        }
    }

    /// Toast for a fired price alert.
    pub fn alert(trigger: &AlertTrigger) -> Self {
        Self {
            message: format!("Price alert: {}", trigger.describe()),
            level: NotificationLevel::Warning,
            duration_secs: 15,
        }
    }
}

/// The global state store.
#[derive(Debug)]
pub struct Store {
    pub app: AppState,
    pub markets: MarketState,
    pub feed: FeedState,
    pub watchlist: WatchlistState,
    pub alerts: AlertState,
    pub admin: AdminState,
    /// Action sender for dispatching actions.
    action_tx: mpsc::UnboundedSender<Action>,
}

impl Store {
    /// Create a new store with the given action sender.
    pub fn new(action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self {
            app: AppState::default(),
            markets: MarketState::default(),
            feed: FeedState::default(),
            watchlist: WatchlistState::default(),
            alerts: AlertState::default(),
            admin: AdminState::default(),
            action_tx,
        }
    }

    /// Sender for background tasks that dispatch into the store.
    pub fn sender(&self) -> mpsc::UnboundedSender<Action> {
        self.action_tx.clone()
    }

    /// Dispatch an action to the store.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.action_tx
            .send(action)
            .map_err(|e| crate::Error::channel(e.to_string()))
    }

    /// Apply an action to update state.
    pub fn reduce(&mut self, action: Action) {
        match action {
            // Navigation
            Action::SetView(view) => {
                self.app.current_view = view;
                self.app.show_help = false;
            }
            Action::SetInputMode(mode) => {
                self.app.input_mode = mode;
                if mode == InputMode::Search {
                    self.app.input_buffer = self.markets.search_query.clone().unwrap_or_default();
                    self.app.cursor_position = self.app.input_buffer.chars().count();
                }
            }
            Action::StartCompose(target) => {
                self.app.clear_input();
                self.app.compose = Some(target);
                self.app.input_mode = InputMode::Compose;
            }

            // Text input
            Action::InputChar(c) => {
                self.app.push_char(c);
                self.sync_search();
            }
            Action::InputBackspace => {
                self.app.pop_char();
                self.sync_search();
            }
            Action::InputLeft => self.app.cursor_left(),
            Action::InputRight => self.app.cursor_right(),
            Action::SubmitInput => self.finish_input(false),
            Action::CancelInput => self.finish_input(true),

            // Session
            Action::SessionChanged(session) => {
                if session.is_none() {
                    self.feed.close_post();
                    self.watchlist = WatchlistState::default();
                    self.alerts = AlertState::default();
                    self.admin = AdminState::default();
                    if self.app.current_view == View::Admin {
                        self.app.current_view = View::Markets;
                    }
                }
                self.app.session = session;
            }

            // Markets
            Action::RefreshMarkets => self.markets.loading = true,
            Action::MarketsLoaded(coins) => {
                self.markets.coins = coins;
                self.markets.loading = false;
                self.markets.last_updated = Some(chrono::Utc::now());
                let len = self.markets.filtered_coins().len();
                self.markets.selected_index = clamp_selection(self.markets.selected_index, len);
            }
            Action::NextPage => {
                self.markets.page = self.markets.current_page() + 1;
                self.markets.selected_index = Some(0);
            }
            Action::PrevPage => {
                self.markets.page = self.markets.current_page().saturating_sub(1).max(1);
                self.markets.selected_index = Some(0);
            }
            Action::ChartLoaded(series) => self.markets.chart = Some(series),

            // Feed
            Action::RefreshFeed => self.feed.loading = true,
            Action::FeedLoaded(items) => {
                self.feed.set_items(items);
                self.feed.loading = false;
                self.feed.last_updated = Some(chrono::Utc::now());
            }
            Action::CommentsLoaded(post_id, comments) => {
                if self.feed.open_post != Some(post_id) {
                    self.feed.comment_index = None;
                }
                self.feed.open_post = Some(post_id);
                self.feed.comment_index = self
                    .feed
                    .comment_index
                    .map(|i| i.min(comments.len().saturating_sub(1)))
                    .filter(|_| !comments.is_empty());
                self.feed.comments = comments;
            }
            Action::ClosePost => self.feed.close_post(),

            // Watchlist
            Action::RefreshWatchlist => self.watchlist.loading = true,
            Action::WatchlistLoaded(favorites) => {
                self.watchlist.selected_index =
                    clamp_selection(self.watchlist.selected_index, favorites.len());
                self.watchlist.favorites = favorites;
                self.watchlist.loading = false;
            }

            // Alerts
            Action::RefreshAlerts => self.alerts.loading = true,
            Action::AlertsLoaded(alerts) => {
                self.alerts.selected_index =
                    clamp_selection(self.alerts.selected_index, alerts.len());
                self.alerts.alerts = alerts;
                self.alerts.loading = false;
            }
            Action::AlertTriggered(trigger) => {
                self.show(Notification::alert(&trigger));
                self.alerts.record(trigger);
            }

            // Admin
            Action::RefreshAdmin => self.admin.loading = true,
            Action::AdminLoaded {
                me,
                reports,
                mut bans,
                admins,
            } => {
                let now = chrono::Utc::now();
                bans.retain(|ban| ban.is_active(now));
                self.admin.selected_index =
                    clamp_selection(self.admin.selected_index, reports.len());
                self.admin.ban_index = clamp_selection(self.admin.ban_index, bans.len());
                self.admin.admin_index = clamp_selection(self.admin.admin_index, admins.len());
                self.admin.me = me;
                self.admin.reports = reports;
                self.admin.bans = bans;
                self.admin.admins = admins;
                self.admin.loading = false;
            }
            Action::CycleAdminPane => self.admin.pane = self.admin.pane.next(),

            // UI actions
            Action::ScrollUp => self.scroll(-1),
            Action::ScrollDown => self.scroll(1),
            Action::PageUp => self.scroll(-10),
            Action::PageDown => self.scroll(10),
            Action::GoToTop => self.select(|_| Some(0)),
            Action::GoToBottom => self.select(|len| Some(len.saturating_sub(1))),
            Action::ToggleHelp => self.app.show_help = !self.app.show_help,
            Action::ShowNotification(notification) => self.show(notification),
            Action::DismissNotification => self.app.notification = None,
            Action::Tick => self.app.expire_notification(Instant::now()),

            Action::RefreshAll => self.app.loading = true,

            Action::SetError(error) => self.fail(Notification::error(error)),
            Action::SetWarning(warning) => self.fail(Notification::warning(warning)),

            Action::SetConnected(connected) => self.app.connected = connected,
            Action::SetLoading(loading) => self.app.loading = loading,

            Action::Quit => self.app.should_quit = true,

            // Side effects only; the application handles these.
            Action::SignOut
            | Action::LoadChart
            | Action::OpenPost
            | Action::ToggleLike
            | Action::DeleteSelected
            | Action::ToggleFavorite
            | Action::ActionReport
            | Action::DismissReport
            | Action::UnbanSelected
            | Action::RevokeSelected => {}
        }
    }

    fn show(&mut self, notification: Notification) {
        self.app.notification = Some((notification, Instant::now()));
    }

    /// Show a failure and stop every loading indicator.
    fn fail(&mut self, notification: Notification) {
        self.show(notification);
        self.app.loading = false;
        self.markets.loading = false;
        self.feed.loading = false;
        self.watchlist.loading = false;
        self.alerts.loading = false;
        self.admin.loading = false;
    }

    fn sync_search(&mut self) {
        if self.app.input_mode == InputMode::Search {
            let query = self.app.input_buffer.trim();
            self.markets.search_query = (!query.is_empty()).then(|| query.to_string());
            self.markets.selected_index = Some(0);
        }
    }

    /// Leave search or compose mode. Cancelling a search clears the filter;
    /// submitted compose input is consumed by the application first.
    fn finish_input(&mut self, cancelled: bool) {
        if cancelled && self.app.input_mode == InputMode::Search {
            self.markets.search_query = None;
        }
        self.app.input_mode = InputMode::Normal;
        self.app.compose = None;
        self.app.clear_input();
    }

    /// Length of the list shown in the current view.
    fn current_len(&self) -> usize {
        match self.app.current_view {
            View::Markets => self.markets.filtered_coins().len(),
            View::Feed => self.feed.items.len(),
            View::Watchlist => self.watchlist.favorites.len(),
            View::Alerts => self.alerts.alerts.len(),
            View::Admin => self.admin.pane_len(),
        }
    }

    fn selection_mut(&mut self) -> &mut Option<usize> {
        match self.app.current_view {
            View::Markets => &mut self.markets.selected_index,
            View::Feed => &mut self.feed.selected_index,
            View::Watchlist => &mut self.watchlist.selected_index,
            View::Alerts => &mut self.alerts.selected_index,
            View::Admin => self.admin.pane_selection_mut(),
        }
    }

    fn select(&mut self, pick: impl FnOnce(usize) -> Option<usize>) {
        let len = self.current_len();
        let index = if len == 0 { None } else { pick(len) };
        *self.selection_mut() = index;
    }

    fn scroll(&mut self, delta: i32) {
        if self.app.current_view == View::Feed && self.feed.open_post.is_some() {
            self.scroll_thread(delta);
            return;
        }
        let current = self.selection_mut().unwrap_or(0) as i32;
        self.select(|len| {
            let max_index = len.saturating_sub(1) as i32;
            Some((current + delta).clamp(0, max_index) as usize)
        });
    }

    /// Move through the open thread. No comment selected means the post
    /// itself is.
    fn scroll_thread(&mut self, delta: i32) {
        let len = self.feed.comments.len() as i32;
        let current = self.feed.comment_index.map_or(-1, |i| i as i32);
        let next = (current + delta).clamp(-1, len - 1);
        self.feed.comment_index = usize::try_from(next).ok();
    }
}

fn clamp_selection(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(current.unwrap_or(0).min(len - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertCondition;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn store() -> Store {
        let (tx, _rx) = mpsc::unbounded_channel();
        Store::new(tx)
    }

    fn coin(id: &str, symbol: &str, price: Decimal) -> Coin {
        Coin {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: id.to_string(),
            image_url: None,
            current_price: price,
            market_cap: None,
            market_cap_rank: None,
            total_volume: None,
            high_24h: None,
            low_24h: None,
            price_change_24h_percent: None,
            last_updated: None,
        }
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut store = store();
        store.reduce(Action::MarketsLoaded(vec![
            coin("bitcoin", "btc", dec!(60000)),
            coin("ethereum", "eth", dec!(3000)),
            coin("solana", "sol", dec!(150)),
        ]));
        assert_eq!(store.markets.selected_index, Some(0));

        store.reduce(Action::ScrollUp);
        assert_eq!(store.markets.selected_index, Some(0));
        store.reduce(Action::PageDown);
        assert_eq!(store.markets.selected_index, Some(2));
        store.reduce(Action::GoToTop);
        assert_eq!(store.markets.selected_index, Some(0));
    }

    #[test]
    fn test_scroll_on_empty_list_selects_nothing() {
        let mut store = store();
        store.reduce(Action::SetView(View::Alerts));
        store.reduce(Action::ScrollDown);
        assert_eq!(store.alerts.selected_index, None);
    }

    #[test]
    fn test_live_search_and_cancel() {
        let mut store = store();
        store.reduce(Action::MarketsLoaded(vec![
            coin("bitcoin", "btc", dec!(60000)),
            coin("ethereum", "eth", dec!(3000)),
        ]));
        store.reduce(Action::SetInputMode(InputMode::Search));
        for c in "eth".chars() {
            store.reduce(Action::InputChar(c));
        }
        assert_eq!(store.markets.filtered_coins().len(), 1);

        store.reduce(Action::SubmitInput);
        assert_eq!(store.app.input_mode, InputMode::Normal);
        assert_eq!(store.markets.search_query.as_deref(), Some("eth"));

        store.reduce(Action::SetInputMode(InputMode::Search));
        assert_eq!(store.app.input_buffer, "eth");
        store.reduce(Action::CancelInput);
        assert_eq!(store.markets.search_query, None);
    }

    #[test]
    fn test_compose_lifecycle() {
        let mut store = store();
        store.reduce(Action::StartCompose(ComposeTarget::Post));
        assert_eq!(store.app.input_mode, InputMode::Compose);
        store.reduce(Action::InputChar('g'));
        store.reduce(Action::InputChar('m'));
        assert_eq!(store.app.input_buffer, "gm");

        store.reduce(Action::CancelInput);
        assert_eq!(store.app.compose, None);
        assert!(store.app.input_buffer.is_empty());
    }

    #[test]
    fn test_alert_trigger_raises_toast() {
        let mut store = store();
        let alert = PriceAlert {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            coin_id: "bitcoin".to_string(),
            target_price: dec!(60000),
            condition: AlertCondition::Above,
            is_active: true,
            triggered_at: None,
            created_at: Utc::now(),
        };
        store.reduce(Action::AlertsLoaded(vec![alert.clone()]));
        store.reduce(Action::AlertTriggered(AlertTrigger {
            alert,
            price: dec!(61000),
            triggered_at: Utc::now(),
        }));

        let (toast, _) = store.app.notification.as_ref().unwrap();
        assert_eq!(toast.level, NotificationLevel::Warning);
        assert_eq!(toast.message, "Price alert: bitcoin is above 60000 (now 61000)");
        assert_eq!(store.alerts.armed_count(), 0);
    }

    #[test]
    fn test_sign_out_clears_private_state() {
        let mut store = store();
        store.reduce(Action::SessionChanged(Some(SessionInfo {
            user_id: Uuid::new_v4(),
            email: "me@example.com".to_string(),
            username: Some("me".to_string()),
            admin_role: Some(crate::models::AdminRole::Moderator),
        })));
        store.reduce(Action::SetView(View::Admin));
        store.reduce(Action::WatchlistLoaded(vec![FavoriteCoin {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            coin_id: "bitcoin".to_string(),
            created_at: Utc::now(),
        }]));

        store.reduce(Action::SessionChanged(None));
        assert_eq!(store.app.current_view, View::Markets);
        assert!(store.watchlist.favorites.is_empty());
        assert!(!store.app.is_admin());
    }

    #[test]
    fn test_set_error_becomes_error_toast() {
        let mut store = store();
        store.reduce(Action::SetLoading(true));
        store.reduce(Action::RefreshMarkets);
        store.reduce(Action::SetError("boom".to_string()));

        let (toast, _) = store.app.notification.as_ref().unwrap();
        assert_eq!(toast.level, NotificationLevel::Error);
        assert!(!store.app.loading);
        assert!(!store.markets.loading);
    }

    fn comment(post_id: Uuid, content: &str) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_thread_scroll_moves_from_post_to_comments() {
        let mut store = store();
        store.reduce(Action::SetView(View::Feed));
        let post_id = Uuid::new_v4();
        store.reduce(Action::CommentsLoaded(
            post_id,
            vec![comment(post_id, "first"), comment(post_id, "second")],
        ));
        assert!(store.feed.selected_comment().is_none());

        store.reduce(Action::ScrollDown);
        store.reduce(Action::ScrollDown);
        store.reduce(Action::ScrollDown);
        assert_eq!(store.feed.selected_comment().unwrap().content, "second");

        store.reduce(Action::PageUp);
        assert!(store.feed.selected_comment().is_none());

        store.reduce(Action::ClosePost);
        assert_eq!(store.feed.comment_index, None);
    }

    #[test]
    fn test_admin_panes_keep_their_own_selection() {
        let mut store = store();
        store.reduce(Action::SetView(View::Admin));
        let ban = |expires_at| Ban {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            banned_by: Uuid::new_v4(),
            reason: "spam".to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        store.reduce(Action::AdminLoaded {
            me: None,
            reports: Vec::new(),
            bans: vec![
                ban(None),
                ban(Some(Utc::now() - chrono::Duration::hours(1))),
                ban(Some(Utc::now() + chrono::Duration::hours(1))),
            ],
            admins: Vec::new(),
        });
        assert_eq!(store.admin.bans.len(), 2);
        assert_eq!(store.admin.selected_index, None);

        store.reduce(Action::CycleAdminPane);
        assert_eq!(store.admin.pane, AdminPane::Bans);
        store.reduce(Action::ScrollDown);
        assert_eq!(store.admin.ban_index, Some(1));
        assert_eq!(store.admin.selected_index, None);

        store.reduce(Action::CycleAdminPane);
        store.reduce(Action::CycleAdminPane);
        assert_eq!(store.admin.pane, AdminPane::Reports);
    }

    #[test]
    fn test_set_warning_stops_loading_with_warning_toast() {
        let mut store = store();
        store.reduce(Action::RefreshFeed);
        store.reduce(Action::SetWarning("Network error: down".to_string()));

        let (toast, _) = store.app.notification.as_ref().unwrap();
        assert_eq!(toast.level, NotificationLevel::Warning);
        assert!(!store.feed.loading);
    }

    #[test]
    fn test_prev_page_stops_at_one() {
        let mut store = store();
        store.reduce(Action::PrevPage);
        assert_eq!(store.markets.current_page(), 1);
        store.reduce(Action::NextPage);
        store.reduce(Action::NextPage);
        assert_eq!(store.markets.current_page(), 3);
    }
}
