#![forbid(unsafe_code)]

//! Pause/resume toggle and the read model handed to the indicator.

/// Read-only projection of the pause flag for the status indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorState {
    pub paused: bool,
}

/// Direction of one toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Paused,
    Resumed,
}

/// Suspends the follow action without touching observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseControl {
    paused: bool,
}

impl PauseControl {
    #[must_use]
    pub const fn new() -> Self {
        Self { paused: false }
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle(&mut self) -> Toggle {
        self.paused = !self.paused;
        if self.paused {
            Toggle::Paused
        } else {
            Toggle::Resumed
        }
    }

    #[must_use]
    pub const fn indicator(&self) -> IndicatorState {
        IndicatorState {
            paused: self.paused,
        }
    }
}
