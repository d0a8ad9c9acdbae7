//! TUI widgets.

mod admin_panel;
mod alert_list;
mod coin_list;
mod common;
mod feed;
mod help;
mod input_bar;
mod notifications;
mod status_bar;
mod tab_bar;
mod watchlist;

pub use admin_panel::AdminPanel;
pub use alert_list::AlertList;
pub use coin_list::CoinList;
pub use feed::FeedView;
pub use help::HelpPanel;
pub use input_bar::InputBar;
pub use notifications::render_notification;
pub use status_bar::StatusBar;
pub use tab_bar::TabBar;
pub use watchlist::WatchlistView;
