#![forbid(unsafe_code)]

//! Browser binding for `feedfollow-core`.
//!
//! The exported `boot(configJson?)` function wires the page: a DOM host for
//! the controller, lifecycle and keyboard listeners, and the status badge.
//! It returns a `FeedFollow` handle with `toggle()`, `isPaused()` and
//! `state()`.
//!
//! Configuration parsing, console logging, the indicator model and key
//! normalization live in plain modules so they are tested natively; only
//! the `wasm` module touches `web-sys`.

pub mod boot_config;
pub mod console_log;
pub mod indicator;
pub mod keys;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{FeedFollow, boot};

use feedfollow_core::ControllerState;

/// Short lowercase name for a controller state, as reported to JS.
#[must_use]
pub fn state_label(state: ControllerState) -> &'static str {
    match state {
        ControllerState::Disabled(_) => "disabled",
        ControllerState::Unbound => "unbound",
        ControllerState::Locating { .. } => "locating",
        ControllerState::Following => "following",
        ControllerState::Paused => "paused",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedfollow_core::controller::DisabledReason;

    #[test]
    fn state_labels() {
        assert_eq!(
            state_label(ControllerState::Disabled(DisabledReason::AlreadyInjected)),
            "disabled"
        );
        assert_eq!(state_label(ControllerState::Locating { attempt: 3 }), "locating");
        assert_eq!(state_label(ControllerState::Paused), "paused");
    }
}
