//! Terminal input handling.
//!
//! Key presses are turned into [`crate::state::Action`]s according to the
//! configured key bindings and what the current view shows.

mod handler;
mod input;

pub use handler::EventHandler;
pub use input::{InputEvent, Key, KeyBinding, Modifiers};
