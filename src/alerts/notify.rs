//! Desktop notification hook.

use crate::error::Result;
use std::io::Write;

/// Out-of-band notification raised when an alert fires.
pub trait DesktopNotifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Rings the terminal bell, which most terminal emulators surface as a
/// desktop notification or an urgency hint.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl DesktopNotifier for TerminalBell {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        tracing::debug!(title, body, "ringing terminal bell");
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}
