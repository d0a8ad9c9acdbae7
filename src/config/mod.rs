//! Configuration management for hodlr.

mod settings;

pub use settings::{
    AlertConfig, BackendConfig, Config, KeyBindings, MarketApiConfig, ModerationConfig, UiConfig,
};

use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Prefix for environment variable overrides (`HODLR_ALERTS__POLL_INTERVAL_MINUTES=5`).
pub const ENV_PREFIX: &str = "HODLR";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "hodlr", "hodlr")
        .ok_or_else(|| Error::config("Could not determine project directories"))
}

/// Get the configuration directory path.
pub fn config_dir() -> Result<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path.
pub fn data_dir() -> Result<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the log directory path.
pub fn log_dir() -> Result<PathBuf> {
    data_dir().map(|dir| dir.join("logs"))
}
