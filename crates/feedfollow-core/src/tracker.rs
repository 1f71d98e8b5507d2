#![forbid(unsafe_code)]

//! Near-bottom tracking for manual scrolling.

use crate::error::HostError;
use crate::probe::ScrollMetrics;

/// `true` when the viewport ends less than `threshold` px above the content end.
#[must_use]
pub fn is_near_bottom(metrics: &ScrollMetrics, threshold: f64) -> bool {
    metrics.distance_from_bottom() < threshold
}

/// Recomputes the near-bottom flag on every scroll event.
///
/// Never scrolls. Starts out near the bottom so content that streams in
/// before the first scroll event is followed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollTracker {
    threshold: f64,
    near_bottom: bool,
}

impl ScrollTracker {
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            near_bottom: true,
        }
    }

    #[must_use]
    pub const fn near_bottom(&self) -> bool {
        self.near_bottom
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Apply one scroll event. An unreadable container counts as near the
    /// bottom. Returns the new flag.
    pub fn on_scroll(&mut self, metrics: Result<ScrollMetrics, HostError>) -> bool {
        self.near_bottom = match metrics {
            Ok(metrics) => is_near_bottom(&metrics, self.threshold),
            Err(err) => {
                tracing::trace!(target: "feedfollow.follow", error = %err, "scroll metrics unreadable");
                true
            }
        };
        self.near_bottom
    }
}
