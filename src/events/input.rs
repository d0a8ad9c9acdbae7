//! Key events and configurable key bindings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Simplified key representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    Other,
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        match code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Escape,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Tab => Key::Tab,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::F(n) => Key::F(n),
            _ => Key::Other,
        }
    }
}

/// Key modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        Self {
            ctrl: mods.contains(KeyModifiers::CONTROL),
            alt: mods.contains(KeyModifiers::ALT),
            shift: mods.contains(KeyModifiers::SHIFT),
        }
    }
}

/// A parsed binding such as `q`, `Ctrl+r` or `Enter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl std::str::FromStr for KeyBinding {
    type Err = crate::Error;

    fn from_str(binding: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::default();
        let mut key = None;

        for part in binding.split('+').map(str::trim) {
            match part.to_lowercase().as_str() {
                "ctrl" => modifiers.ctrl = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "enter" => key = Some(Key::Enter),
                "esc" | "escape" => key = Some(Key::Escape),
                "backspace" => key = Some(Key::Backspace),
                "delete" | "del" => key = Some(Key::Delete),
                "tab" => key = Some(Key::Tab),
                "up" => key = Some(Key::Up),
                "down" => key = Some(Key::Down),
                "left" => key = Some(Key::Left),
                "right" => key = Some(Key::Right),
                "home" => key = Some(Key::Home),
                "end" => key = Some(Key::End),
                "pageup" => key = Some(Key::PageUp),
                "pagedown" => key = Some(Key::PageDown),
                lower if lower.len() > 1 && lower.starts_with('f') => {
                    let n = lower[1..].parse::<u8>().map_err(|_| {
                        crate::Error::config(format!("invalid key binding '{}'", binding))
                    })?;
                    key = Some(Key::F(n));
                }
                _ => {
                    let mut chars = part.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => key = Some(Key::Char(c)),
                        _ => {
                            return Err(crate::Error::config(format!(
                                "invalid key binding '{}'",
                                binding
                            )));
                        }
                    }
                }
            }
        }

        key.map(|key| Self { key, modifiers }).ok_or_else(|| {
            crate::Error::config(format!("key binding '{}' names no key", binding))
        })
    }
}

/// A processed input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        Self {
            key: Key::from(event.code),
            modifiers: Modifiers::from(event.modifiers),
        }
    }
}

impl InputEvent {
    /// Character typed, ignoring control chords.
    pub fn text(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !self.modifiers.ctrl && !self.modifiers.alt => Some(c),
            _ => None,
        }
    }

    /// Check against a binding string. Unparseable bindings never match.
    ///
    /// Shift is implied by the character itself, so `?`, `!` and `G` match
    /// whether or not the terminal reports the modifier.
    pub fn matches(&self, binding: &str) -> bool {
        let Ok(binding) = binding.parse::<KeyBinding>() else {
            return false;
        };

        if self.modifiers.ctrl != binding.modifiers.ctrl
            || self.modifiers.alt != binding.modifiers.alt
        {
            return false;
        }

        match (self.key, binding.key) {
            (Key::Char(pressed), Key::Char(bound)) if binding.modifiers.shift => {
                pressed.eq_ignore_ascii_case(&bound) && (self.modifiers.shift || pressed.is_uppercase())
            }
            (Key::Char(pressed), Key::Char(bound)) => pressed == bound,
            (pressed, bound) => pressed == bound && self.modifiers.shift == binding.modifiers.shift,
        }
    }
}
