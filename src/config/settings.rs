//! Configuration settings for hodlr.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted alert polling interval: one day.
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 24 * 60;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Market data API configuration.
    pub api: MarketApiConfig,
    /// Managed backend configuration.
    pub backend: BackendConfig,
    /// Price alert monitoring.
    pub alerts: AlertConfig,
    /// Content moderation.
    pub moderation: ModerationConfig,
    /// UI configuration.
    pub ui: UiConfig,
    /// Key bindings.
    pub keybindings: KeyBindings,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load_or_default() -> crate::Result<Self> {
        Self::load(None)
    }

    /// Load configuration.
    ///
    /// Sources are layered: built-in defaults, then the TOML file (if it
    /// exists), then `HODLR_*` environment variables using `__` between
    /// section and key.
    pub fn load(path: Option<PathBuf>) -> crate::Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);
        let to_config_err = |e: config::ConfigError| crate::Error::config(e.to_string());

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(to_config_err)?)
            .add_source(config::File::from(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(super::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(to_config_err)?;

        let config: Self = settings.try_deserialize().map_err(to_config_err)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: Option<PathBuf>) -> crate::Result<()> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Reject settings the application cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if !(1..=MAX_POLL_INTERVAL_MINUTES).contains(&self.alerts.poll_interval_minutes) {
            return Err(crate::Error::config(format!(
                "alerts.poll_interval_minutes must be between 1 and {}",
                MAX_POLL_INTERVAL_MINUTES
            )));
        }
        if self.api.vs_currency.trim().is_empty() {
            return Err(crate::Error::config("api.vs_currency must not be empty"));
        }
        if self.api.rate_limit == 0 {
            return Err(crate::Error::config("api.rate_limit must be at least 1"));
        }
        if self.api.per_page == 0 || self.api.per_page > 250 {
            return Err(crate::Error::config("api.per_page must be between 1 and 250"));
        }
        for (name, binding) in self.keybindings.entries() {
            if binding.parse::<crate::events::KeyBinding>().is_err() {
                return Err(crate::Error::config(format!(
                    "keybindings.{} = '{}' is not a valid key",
                    name, binding
                )));
            }
        }
        Ok(())
    }

    fn default_path() -> PathBuf {
        super::config_dir()
            .map(|p| p.join("config.toml"))
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }
}

/// Market data API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketApiConfig {
    /// CoinGecko-compatible API base URL.
    pub base_url: String,
    /// Optional API key sent as `x-cg-demo-api-key`.
    pub api_key: Option<String>,
    /// Quote currency for all prices.
    pub vs_currency: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Rate limit (requests per second).
    pub rate_limit: u32,
    /// Coins per listing page.
    pub per_page: u32,
}

impl Default for MarketApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            api_key: None,
            vs_currency: "usd".to_string(),
            timeout_secs: 30,
            rate_limit: 5,
            per_page: 50,
        }
    }
}

impl MarketApiConfig {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Managed backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL of the managed backend.
    pub url: Option<String>,
    /// Public (anon) API key.
    pub anon_key: Option<String>,
    /// Run against the in-process backend instead of the remote one.
    pub offline: bool,
}

impl BackendConfig {
    /// Whether enough is configured to reach the remote backend.
    pub fn is_remote(&self) -> bool {
        !self.offline && self.url.is_some() && self.anon_key.is_some()
    }
}

/// Price alert monitoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Start monitoring automatically after sign-in.
    pub enabled: bool,
    /// Minutes between polling cycles.
    pub poll_interval_minutes: u64,
    /// Permission to raise desktop notifications when an alert fires.
    pub desktop_notifications: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_minutes: 1,
            desktop_notifications: true,
        }
    }
}

impl AlertConfig {
    /// Polling interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }
}

/// Content moderation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Terms blocked in addition to the built-in list.
    pub extra_terms: Vec<String>,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Tick rate in milliseconds for UI updates.
    pub tick_rate_ms: u64,
    /// Enable mouse support.
    pub mouse_support: bool,
    /// Show status bar.
    pub show_status_bar: bool,
    /// Auto-refresh interval for market data in seconds (0 to disable).
    pub auto_refresh_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            mouse_support: true,
            show_status_bar: true,
            auto_refresh_secs: 60,
        }
    }
}

/// Key bindings configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Quit the application.
    pub quit: String,
    /// Show help.
    pub help: String,
    /// Navigate up.
    pub up: String,
    /// Navigate down.
    pub down: String,
    /// Select/confirm.
    pub select: String,
    /// Cancel/back.
    pub back: String,
    /// Refresh data.
    pub refresh: String,
    /// Switch to markets view.
    pub markets: String,
    /// Switch to feed view.
    pub feed: String,
    /// Switch to watchlist view.
    pub watchlist: String,
    /// Switch to alerts view.
    pub alerts: String,
    /// Switch to admin console.
    pub admin: String,
    /// Open search.
    pub search: String,
    /// Compose a post, comment or alert depending on the view.
    pub compose: String,
    /// Like the selected post.
    pub like: String,
    /// Toggle the selected coin on the watchlist.
    pub favorite: String,
    /// Delete the selected item.
    pub delete: String,
    /// Report the selected post, or the selected comment of an open thread.
    pub report: String,
    /// Report the author's profile.
    pub report_author: String,
    /// Edit username and bio.
    pub profile: String,
    /// Upload an avatar image.
    pub avatar: String,
    /// Cycle the admin console between reports, bans and admins.
    pub next_pane: String,
    /// Sign in.
    pub sign_in: String,
    /// Create an account.
    pub sign_up: String,
    /// Sign out.
    pub sign_out: String,
}

impl KeyBindings {
    /// Every binding with its config key.
    pub fn entries(&self) -> [(&'static str, &str); 25] {
        [
            ("quit", self.quit.as_str()),
            ("help", self.help.as_str()),
            ("up", self.up.as_str()),
            ("down", self.down.as_str()),
            ("select", self.select.as_str()),
            ("back", self.back.as_str()),
            ("refresh", self.refresh.as_str()),
            ("markets", self.markets.as_str()),
            ("feed", self.feed.as_str()),
            ("watchlist", self.watchlist.as_str()),
            ("alerts", self.alerts.as_str()),
            ("admin", self.admin.as_str()),
            ("search", self.search.as_str()),
            ("compose", self.compose.as_str()),
            ("like", self.like.as_str()),
            ("favorite", self.favorite.as_str()),
            ("delete", self.delete.as_str()),
            ("report", self.report.as_str()),
            ("report_author", self.report_author.as_str()),
            ("profile", self.profile.as_str()),
            ("avatar", self.avatar.as_str()),
            ("next_pane", self.next_pane.as_str()),
            ("sign_in", self.sign_in.as_str()),
            ("sign_up", self.sign_up.as_str()),
            ("sign_out", self.sign_out.as_str()),
        ]
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: "q".to_string(),
            help: "?".to_string(),
            up: "k".to_string(),
            down: "j".to_string(),
            select: "Enter".to_string(),
            back: "Esc".to_string(),
            refresh: "r".to_string(),
            markets: "1".to_string(),
            feed: "2".to_string(),
            watchlist: "3".to_string(),
            alerts: "4".to_string(),
            admin: "5".to_string(),
            search: "/".to_string(),
            compose: "n".to_string(),
            like: "l".to_string(),
            favorite: "w".to_string(),
            delete: "d".to_string(),
            report: "!".to_string(),
            report_author: "@".to_string(),
            profile: "p".to_string(),
            avatar: "P".to_string(),
            next_pane: "Tab".to_string(),
            sign_in: "a".to_string(),
            sign_up: "u".to_string(),
            sign_out: "o".to_string(),
        }
    }
}
