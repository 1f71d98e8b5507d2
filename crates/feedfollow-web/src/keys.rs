#![forbid(unsafe_code)]

//! DOM `keydown` normalization.

use feedfollow_core::keys::{KeyPress, Modifiers};

/// Plain copy of the `KeyboardEvent` fields the toggle cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomKey {
    pub code: String,
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    pub repeat: bool,
}

impl DomKey {
    /// Physical `code` when the browser reports one, else a code derived
    /// from the logical `key` (some embedded webviews leave `code` empty).
    #[must_use]
    pub fn to_press(&self) -> KeyPress {
        let code = if self.code.is_empty() {
            code_from_key(&self.key)
        } else {
            self.code.clone()
        };
        KeyPress {
            code,
            mods: Modifiers::from_flags(self.shift, self.alt, self.ctrl, self.meta),
            repeat: self.repeat,
        }
    }
}

fn code_from_key(key: &str) -> String {
    match key {
        " " | "Spacebar" => "Space".to_owned(),
        k if k.len() == 1 && k.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("Key{}", k.to_ascii_uppercase())
        }
        k if k.len() == 1 && k.chars().all(|c| c.is_ascii_digit()) => format!("Digit{k}"),
        other => other.to_owned(),
    }
}
