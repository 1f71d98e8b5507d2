#![forbid(unsafe_code)]

//! Growth-triggered follow engine.
//!
//! Mutation batches are reduced to one comparison: did `scrollHeight` grow
//! since the last batch? Growth while near the bottom and not paused requests
//! one animation frame; further growth before that frame runs coalesces into
//! it. The baseline is updated on every batch, so growth observed while
//! paused or scrolled away is never replayed later, and shrinking content
//! simply becomes the new baseline.

use crate::error::HostError;
use crate::pause::{IndicatorState, PauseControl, Toggle};
use crate::probe::ScrollMetrics;
use crate::tracker::ScrollTracker;

/// Snapshot of the engine's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowState {
    pub near_bottom: bool,
    pub paused: bool,
    pub last_known_scroll_height: f64,
}

/// Why a follow scroll was withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppressed {
    Paused,
    NotNearBottom,
}

impl Suppressed {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paused => "paused",
            Self::NotNearBottom => "not_near_bottom",
        }
    }
}

/// Result of one mutation batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Growth {
    /// Content did not grow.
    None { scroll_height: f64 },
    /// Grew; caller must request an animation frame.
    Follow { from: f64, to: f64 },
    /// Grew while a frame is already pending.
    Coalesced { to: f64 },
    /// Grew, but following is withheld.
    Suppressed { to: f64, reason: Suppressed },
}

/// What to do when the requested frame runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Re-read `scrollHeight` and scroll to it.
    ScrollToBottom,
    Skip(Suppressed),
    /// No frame was pending.
    Stale,
}

/// Per-container follow state.
#[derive(Debug, Clone)]
pub struct FollowEngine {
    tracker: ScrollTracker,
    pause: PauseControl,
    last_known_scroll_height: f64,
    frame_pending: bool,
}

impl FollowEngine {
    #[must_use]
    pub fn new(baseline_scroll_height: f64, threshold: f64) -> Self {
        Self {
            tracker: ScrollTracker::new(threshold),
            pause: PauseControl::new(),
            last_known_scroll_height: baseline_scroll_height,
            frame_pending: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> FollowState {
        FollowState {
            near_bottom: self.tracker.near_bottom(),
            paused: self.pause.is_paused(),
            last_known_scroll_height: self.last_known_scroll_height,
        }
    }

    #[must_use]
    pub const fn indicator(&self) -> IndicatorState {
        self.pause.indicator()
    }

    #[must_use]
    pub const fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Scroll event on the container.
    pub fn on_scroll(&mut self, metrics: Result<ScrollMetrics, HostError>) -> bool {
        self.tracker.on_scroll(metrics)
    }

    /// One mutation batch with the freshly read `scrollHeight`.
    pub fn on_mutations(&mut self, scroll_height: f64) -> Growth {
        let previous = self.last_known_scroll_height;
        self.last_known_scroll_height = scroll_height;

        if scroll_height <= previous {
            return Growth::None { scroll_height };
        }
        if let Some(reason) = self.suppression() {
            return Growth::Suppressed {
                to: scroll_height,
                reason,
            };
        }
        if self.frame_pending {
            return Growth::Coalesced { to: scroll_height };
        }
        self.frame_pending = true;
        Growth::Follow {
            from: previous,
            to: scroll_height,
        }
    }

    /// The host refused the frame request; allow the next batch to retry.
    pub fn cancel_frame(&mut self) {
        self.frame_pending = false;
    }

    /// The requested animation frame is running.
    ///
    /// Pause and near-bottom are re-checked: either may have changed since
    /// the frame was requested.
    pub fn on_frame(&mut self) -> FrameAction {
        if !std::mem::take(&mut self.frame_pending) {
            return FrameAction::Stale;
        }
        match self.suppression() {
            Some(reason) => FrameAction::Skip(reason),
            None => FrameAction::ScrollToBottom,
        }
    }

    /// Flip the pause flag. The boolean is `true` when the caller should
    /// scroll to the bottom immediately (resumed while near the bottom).
    pub fn toggle(&mut self) -> (Toggle, bool) {
        let toggle = self.pause.toggle();
        let catch_up = toggle == Toggle::Resumed && self.tracker.near_bottom();
        (toggle, catch_up)
    }

    fn suppression(&self) -> Option<Suppressed> {
        if self.pause.is_paused() {
            Some(Suppressed::Paused)
        } else if !self.tracker.near_bottom() {
            Some(Suppressed::NotNearBottom)
        } else {
            None
        }
    }
}
