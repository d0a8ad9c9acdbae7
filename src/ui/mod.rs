//! UI rendering using ratatui.
//!
//! Rendering is a pure function of the [`Store`]: every frame is drawn from
//! scratch.

mod layout;
mod widgets;

pub use layout::Layout;

use crate::config::KeyBindings;
use crate::state::{Store, View};
use ratatui::Frame;
use widgets::{
    AdminPanel, AlertList, CoinList, FeedView, HelpPanel, InputBar, StatusBar, TabBar,
    WatchlistView,
};

/// Main UI renderer.
pub struct Ui;

impl Ui {
    /// Render the entire UI.
    pub fn render(frame: &mut Frame, store: &Store, keys: &KeyBindings, show_status_bar: bool) {
        let layout = Layout::new(frame.area(), store.app.is_editing(), show_status_bar);

        if show_status_bar {
            StatusBar::render(frame, layout.status_area, store, &keys.help);
        }
        TabBar::render(frame, layout.tab_area, store, keys);

        match store.app.current_view {
            View::Markets => CoinList::render(frame, layout.main_area, store),
            View::Feed => FeedView::render(frame, layout.main_area, store),
            View::Watchlist => WatchlistView::render(frame, layout.main_area, store),
            View::Alerts => AlertList::render(frame, layout.main_area, store),
            View::Admin => AdminPanel::render(frame, layout.main_area, store),
        }

        if let Some(input_area) = layout.input_area {
            InputBar::render(frame, input_area, store);
        }

        if store.app.show_help {
            HelpPanel::render(frame, frame.area(), keys);
        }

        if let Some((notification, _)) = &store.app.notification {
            widgets::render_notification(frame, layout.notification_area, notification);
        }
    }
}
