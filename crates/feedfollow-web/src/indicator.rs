#![forbid(unsafe_code)]

//! Status indicator: a small fixed badge in the bottom-right corner.
//!
//! [`IndicatorModel`] holds everything the DOM element shows. The wasm layer
//! only copies `label()`, `title()` and `opacity()` onto the element.

use feedfollow_core::keys::KeyChord;

/// `id` of the badge element.
pub const INDICATOR_ELEMENT_ID: &str = "feedfollow-indicator";

pub const RESTING_OPACITY: f64 = 0.7;
pub const HOVER_OPACITY: f64 = 1.0;
pub const FADED_OPACITY: f64 = 0.3;

/// Inline style applied when the badge is created.
pub const INDICATOR_CSS: &str = "position: fixed; bottom: 10px; right: 10px; \
    background: rgba(0, 0, 0, 0.7); color: white; padding: 5px 10px; \
    border-radius: 5px; font-size: 12px; z-index: 9999; opacity: 0.7; \
    transition: opacity 0.3s; pointer-events: auto; cursor: pointer;";

/// Visual emphasis of the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Resting,
    Hovered,
    /// Dimmed after the fade timeout.
    Faded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorModel {
    paused: bool,
    emphasis: Emphasis,
    title: String,
}

impl IndicatorModel {
    #[must_use]
    pub fn new(chord: &KeyChord) -> Self {
        Self {
            paused: false,
            emphasis: Emphasis::Resting,
            title: format!("Press {chord} to toggle auto-scrolling"),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.paused {
            "📜 Auto-scroll paused"
        } else {
            "📜 Auto-scroll active"
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn emphasis(&self) -> Emphasis {
        self.emphasis
    }

    #[must_use]
    pub fn opacity(&self) -> f64 {
        match self.emphasis {
            Emphasis::Resting => RESTING_OPACITY,
            Emphasis::Hovered => HOVER_OPACITY,
            Emphasis::Faded => FADED_OPACITY,
        }
    }

    #[must_use]
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Returns `true` when the label changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.paused != paused;
        self.paused = paused;
        changed
    }

    /// Pointer entered (`true`) or left (`false`). Leaving always restores
    /// the resting opacity, even after a fade.
    pub fn hover(&mut self, inside: bool) {
        self.emphasis = if inside {
            Emphasis::Hovered
        } else {
            Emphasis::Resting
        };
    }

    pub fn fade(&mut self) {
        self.emphasis = Emphasis::Faded;
    }
}
