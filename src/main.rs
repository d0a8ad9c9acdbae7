//! hodlr - crypto prices, a social feed and price alerts in the terminal.

use anyhow::Context;
use hodlr::{App, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The TUI owns the terminal, so logs go to a daily file
    let log_dir = hodlr::config::log_dir().context("Failed to resolve log directory")?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "hodlr.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hodlr=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .init();

    // Load configuration
    let config = Config::load_or_default().context("Failed to load configuration")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting hodlr");

    // Run the application
    let mut app = App::new(config)
        .await
        .context("Failed to start application")?;
    app.run().await?;

    Ok(())
}
