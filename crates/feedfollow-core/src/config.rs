#![forbid(unsafe_code)]

//! Tuning knobs for the follow controller.
//!
//! [`FollowConfig::default`] is the aggressive profile: short delays, a
//! selector pass before the heuristic scan, a 1 s retry. The conservative
//! profile waits longer, retries every 5 s, skips the selector pass and only
//! accepts tall, rendered containers.

use std::time::Duration;

use crate::error::ConfigError;
use crate::keys::KeyChord;

/// Selectors tried by the selector pass, most specific first.
pub const DEFAULT_SELECTORS: &[&str] = &[
    ".message-list-container",
    ".conversation-container",
    ".chat-messages",
    "main",
    "[role=\"main\"]",
    "div[style*=\"overflow\"][style*=\"scroll\"]",
    "div[style*=\"overflow: auto\"]",
    "div[style*=\"overflow-y: auto\"]",
];

/// Distance from the bottom (px) still counted as "near bottom".
pub const DEFAULT_NEAR_BOTTOM_THRESHOLD_PX: f64 = 100.0;

/// Controller configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FollowConfig {
    pub near_bottom_threshold_px: f64,

    /// Ordered selector list for the selector pass. Empty skips the pass.
    pub selectors: Vec<String>,
    /// Minimum `clientHeight` for a selector match.
    pub selector_min_client_height_px: f64,

    /// Elements scanned by the heuristic pass (`*` = every element).
    pub heuristic_scan_selector: String,
    /// Minimum `clientHeight` for a heuristic match.
    pub heuristic_min_client_height_px: f64,
    /// Reject `display: none` / `visibility: hidden` candidates in the heuristic pass.
    pub require_visible: bool,

    /// Delay after document-ready before an init attempt.
    pub ready_delay_ms: u64,
    /// Delay after window-load before an init attempt.
    pub load_delay_ms: u64,
    /// Unconditional init attempt this long after boot.
    pub fallback_delay_ms: u64,
    /// Delay between a successful init and the first locate pass.
    pub initial_delay_ms: u64,
    /// Backoff between failed locate passes. Retries never stop.
    pub retry_interval_ms: u64,

    pub toggle_chord: KeyChord,
    pub indicator: IndicatorConfig,
    /// Maximum log level installed by the web binding (`error`..`trace`).
    pub log_level: String,
}

/// Settings for the status indicator overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IndicatorConfig {
    pub enabled: bool,
    /// The indicator dims after this long.
    pub fade_after_ms: u64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fade_after_ms: 5_000,
        }
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self::aggressive()
    }
}

impl FollowConfig {
    /// Short delays, selector pass first, 1 s retry.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            near_bottom_threshold_px: DEFAULT_NEAR_BOTTOM_THRESHOLD_PX,
            selectors: DEFAULT_SELECTORS.iter().map(|s| (*s).to_owned()).collect(),
            selector_min_client_height_px: 100.0,
            heuristic_scan_selector: "*".to_owned(),
            heuristic_min_client_height_px: 100.0,
            require_visible: false,
            ready_delay_ms: 1_000,
            load_delay_ms: 2_000,
            fallback_delay_ms: 5_000,
            initial_delay_ms: 2_500,
            retry_interval_ms: 1_000,
            toggle_chord: KeyChord::default(),
            indicator: IndicatorConfig::default(),
            log_level: "info".to_owned(),
        }
    }

    /// Long settle delay, heuristic scan only, 300 px floor, 5 s retry.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            selectors: Vec::new(),
            heuristic_scan_selector: "div".to_owned(),
            heuristic_min_client_height_px: 300.0,
            require_visible: true,
            initial_delay_ms: 10_000,
            retry_interval_ms: 5_000,
            ..Self::aggressive()
        }
    }

    #[must_use]
    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }

    #[must_use]
    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    #[must_use]
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Check every field for values the controller cannot act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.near_bottom_threshold_px;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Threshold(threshold));
        }
        for (field, value) in [
            (
                "selector_min_client_height_px",
                self.selector_min_client_height_px,
            ),
            (
                "heuristic_min_client_height_px",
                self.heuristic_min_client_height_px,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Height { field, value });
            }
        }
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::ZeroRetryInterval);
        }
        if let Some(idx) = self.selectors.iter().position(|s| s.trim().is_empty()) {
            return Err(ConfigError::EmptySelector(idx));
        }
        if self.heuristic_scan_selector.trim().is_empty() {
            return Err(ConfigError::EmptyScanSelector);
        }
        if self.toggle_chord.code.is_empty() {
            return Err(ConfigError::EmptyChord);
        }
        Ok(())
    }
}
