#![forbid(unsafe_code)]

//! Error types for host access and configuration.
//!
//! Host errors never escape the controller: each one is folded into a
//! rejected candidate, a scheduled retry, or a degraded capability.

use thiserror::Error;

/// Failure reported by a host operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// No document or window context is reachable.
    #[error("host document context is unavailable")]
    Unavailable,
    /// A selector query threw (usually invalid selector syntax).
    #[error("query `{selector}` failed: {reason}")]
    Query { selector: String, reason: String },
    /// Computed style or layout read for one element failed.
    #[error("element probe failed: {0}")]
    Probe(String),
    /// Scroll metrics could not be read.
    #[error("scroll metrics unavailable: {0}")]
    Metrics(String),
    /// Writing the scroll position failed.
    #[error("scroll write failed: {0}")]
    Write(String),
    /// Reading or writing a marker flag failed.
    #[error("marker access failed: {0}")]
    Marker(String),
    /// Registering a listener or observer failed.
    #[error("{what} registration failed: {reason}")]
    Registration { what: &'static str, reason: String },
    /// Scheduling a timer or animation frame failed.
    #[error("scheduling failed: {0}")]
    Schedule(String),
}

/// Invalid [`FollowConfig`](crate::config::FollowConfig) value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("near-bottom threshold must be finite and non-negative, got {0}")]
    Threshold(f64),
    #[error("{field} must be finite and non-negative, got {value}")]
    Height { field: &'static str, value: f64 },
    #[error("retry interval must be greater than zero")]
    ZeroRetryInterval,
    #[error("selector at index {0} is empty")]
    EmptySelector(usize),
    #[error("heuristic scan selector is empty")]
    EmptyScanSelector,
    #[error("toggle chord key code is empty")]
    EmptyChord,
}
