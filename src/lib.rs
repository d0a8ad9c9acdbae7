//! # hodlr - crypto community terminal client
//!
//! Live coin prices, a social feed, a personal watchlist and price alerts,
//! backed by a managed database service and a public market data API.
//!
//! ## Architecture
//!
//! - **App**: Terminal lifecycle and the event loop
//! - **Controller**: Side effects behind the store
//! - **State**: Centralized state management
//! - **UI**: Layout and rendering logic
//! - **Events**: Input handling and key bindings
//! - **Market**: Market data API client
//! - **Backend**: Managed backend (REST or in-memory) and typed repository
//! - **Alerts**: Price alert evaluation and the polling monitor
//! - **Social / Admin**: User and moderation operations
//! - **Config**: Configuration management

pub mod admin;
pub mod alerts;
pub mod app;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod market;
pub mod models;
pub mod moderation;
pub mod session;
pub mod social;
pub mod state;
pub mod ui;

pub use app::App;
pub use config::Config;
pub use controller::Controller;
pub use error::{Error, Result};
