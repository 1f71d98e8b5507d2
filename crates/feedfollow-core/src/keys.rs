#![forbid(unsafe_code)]

//! Key chord matching for the pause/resume toggle.
//!
//! The host normalizes a keyboard event into a [`KeyPress`] (physical DOM
//! `code` plus a modifier bitset) and asks the configured [`KeyChord`]
//! whether it matches. Matching is exact on modifiers so that `Ctrl+Shift+Space`
//! does not fire a `Ctrl+Space` binding.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    /// Build a modifier set from the four DOM boolean flags.
    #[must_use]
    pub fn from_flags(shift: bool, alt: bool, ctrl: bool, meta: bool) -> Self {
        let mut mods = Self::empty();
        mods.set(Self::SHIFT, shift);
        mods.set(Self::ALT, alt);
        mods.set(Self::CTRL, ctrl);
        mods.set(Self::SUPER, meta);
        mods
    }
}

/// One normalized keydown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// Physical key code (`KeyboardEvent.code`, e.g. `"Space"`).
    pub code: String,
    pub mods: Modifiers,
    pub repeat: bool,
}

impl KeyPress {
    #[must_use]
    pub fn new(code: impl Into<String>, mods: Modifiers) -> Self {
        Self {
            code: code.into(),
            mods,
            repeat: false,
        }
    }
}

/// Reserved key combination that toggles following.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyChord {
    pub code: String,
    pub mods: Modifiers,
}

impl KeyChord {
    #[must_use]
    pub fn new(code: impl Into<String>, mods: Modifiers) -> Self {
        Self {
            code: code.into(),
            mods,
        }
    }

    /// Whether `press` triggers this chord. Auto-repeat presses never do.
    #[must_use]
    pub fn matches(&self, press: &KeyPress) -> bool {
        !press.repeat && press.mods == self.mods && press.code == self.code
    }
}

impl Default for KeyChord {
    fn default() -> Self {
        Self::new("Space", Modifiers::CTRL)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CTRL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::SUPER, "Meta"),
        ] {
            if self.mods.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(self.code.strip_prefix("Key").unwrap_or(&self.code))
    }
}
