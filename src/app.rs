//! Main application module.
//!
//! This module contains the main `App` struct that coordinates
//! the event loop, state management, and rendering.

use crate::backend::{Backend, MemoryBackend, RestBackend};
use crate::config::Config;
use crate::controller::Controller;
use crate::error::Result;
use crate::events::EventHandler;
use crate::market::MarketClient;
use crate::state::{Action, Store};
use crate::ui::Ui;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// The main application.
pub struct App {
    /// Terminal.
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Store and services.
    controller: Controller,
    /// Event handler.
    event_handler: EventHandler,
    /// Action receiver.
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Configuration.
    config: Config,
}

impl App {
    /// Create a new application.
    ///
    /// Without a configured backend URL the app runs against an in-memory
    /// store that lives as long as the process.
    pub async fn new(config: Config) -> Result<Self> {
        let market = Arc::new(MarketClient::new(config.api.clone())?);

        let (backend, offline): (Arc<dyn Backend>, bool) = if config.backend.is_remote() {
            let backend = RestBackend::new(&config.backend, config.api.timeout())?;
            info!("Using remote backend");
            (Arc::new(backend), false)
        } else {
            info!("No backend configured, using the in-memory store");
            (Arc::new(MemoryBackend::new()), true)
        };

        // Create action channel
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let mut store = Store::new(action_tx);
        store.app.offline = offline;
        let controller = Controller::new(&config, backend, market, store);

        let event_handler = EventHandler::new(
            config.keybindings.clone(),
            Duration::from_millis(config.ui.tick_rate_ms),
            config.ui.mouse_support,
        );

        // Set up terminal last so a failure above leaves it untouched
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if config.ui.mouse_support {
            execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        } else {
            execute!(stdout, EnterAlternateScreen)?;
        }
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            controller,
            event_handler,
            action_rx,
            config,
        })
    }

    /// Run the application event loop.
    pub async fn run(&mut self) -> Result<()> {
        // Initial connection test
        let connected = match self.controller.market().test_connection().await {
            Ok(connected) => connected,
            Err(e) => {
                warn!("Market API unreachable: {}", e);
                false
            }
        };
        self.controller.reduce(Action::SetConnected(connected));
        self.controller.store().dispatch(Action::RefreshAll)?;

        let auto_refresh = self.config.ui.auto_refresh_secs > 0;
        let period = Duration::from_secs(self.config.ui.auto_refresh_secs.max(1));
        let mut refresh = tokio::time::interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Main event loop
        loop {
            self.controller.reduce(Action::Tick);

            // Update event handler with current state
            self.event_handler
                .update_store_snapshot(self.controller.store());

            // Render UI
            let store = self.controller.store();
            let keys = &self.config.keybindings;
            let show_status_bar = self.config.ui.show_status_bar;
            self.terminal.draw(|frame| {
                Ui::render(frame, store, keys, show_status_bar);
            })?;

            tokio::select! {
                // Handle terminal events
                result = self.event_handler.next() => {
                    if let Some(action) = result? {
                        self.controller.handle_action(action).await;
                    }
                }

                // Handle actions from the channel
                Some(action) = self.action_rx.recv() => {
                    self.controller.handle_action(action).await;
                }

                // Backend pushed a change
                Some(table) = self.controller.next_change() => {
                    debug!(%table, "Backend change");
                    if let Some(action) = self.controller.change_action(table) {
                        self.controller.handle_action(action).await;
                    }
                }

                // Prices always poll; everything else only without change feeds
                _ = refresh.tick(), if auto_refresh => {
                    let action = if self.controller.has_live_feeds() {
                        Action::RefreshMarkets
                    } else {
                        Action::RefreshAll
                    };
                    self.controller.handle_action(action).await;
                }
            }

            // Check if we should quit
            if self.controller.store().app.should_quit {
                break;
            }
        }

        self.controller.shutdown().await;
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal state
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}
