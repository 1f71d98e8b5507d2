#![forbid(unsafe_code)]

//! Host traits: the boundary between the controller and a document runtime.
//!
//! Implementations exist for the browser (`feedfollow-web`) and for the
//! deterministic simulator (`feedfollow-harness`). Every call may fail; the
//! controller folds failures into rejection, retry or degraded setup instead
//! of propagating them.
//!
//! Callbacks flow the other way as [`Signal`](crate::controller::Signal)
//! values: a timer scheduled with [`FeedScheduler::set_timeout`] comes back
//! as `Signal::Timer(wake)`, an animation frame as `Signal::AnimationFrame`.

use core::fmt::Debug;
use core::time::Duration;

use crate::error::HostError;
use crate::probe::{ElementProbe, ScrollMetrics};

/// What a delayed callback should do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wake {
    /// Attempt initialization (delayed document-ready or window-load).
    Init(InitTrigger),
    /// Run a locate pass.
    Locate,
}

/// Independent paths that may start the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitTrigger {
    DocumentReady,
    WindowLoad,
    Fallback,
}

impl InitTrigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DocumentReady => "document_ready",
            Self::WindowLoad => "window_load",
            Self::Fallback => "fallback",
        }
    }
}

/// Process-wide flags published on the host global so that a second
/// injection of the script can detect the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionMarker {
    /// Initialization has started.
    Started,
    /// A container has been bound.
    Bound,
}

impl InjectionMarker {
    /// Property name used on the host global.
    #[must_use]
    pub const fn property(self) -> &'static str {
        match self {
            Self::Started => "__feedfollow_started",
            Self::Bound => "__feedfollow_bound",
        }
    }
}

/// Document reads and writes.
pub trait FeedDocument {
    /// Handle to one host element.
    type Node: Clone + PartialEq + Debug;

    /// Whether a window/document context is reachable at all.
    fn is_available(&self) -> bool;

    /// All elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Node>, HostError>;

    /// Computed style and layout snapshot used by the locator.
    fn probe(&self, node: &Self::Node) -> Result<ElementProbe, HostError>;

    fn scroll_metrics(&self, node: &Self::Node) -> Result<ScrollMetrics, HostError>;

    fn set_scroll_top(&mut self, node: &Self::Node, scroll_top: f64) -> Result<(), HostError>;

    /// Whether `node` already carries the bound marker.
    fn is_bound(&self, node: &Self::Node) -> bool;

    fn mark_bound(&mut self, node: &Self::Node) -> Result<(), HostError>;

    fn marker(&self, marker: InjectionMarker) -> Result<bool, HostError>;

    fn set_marker(&mut self, marker: InjectionMarker) -> Result<(), HostError>;

    /// Short label for logs: class name, else id, else `"unnamed element"`.
    fn describe(&self, node: &Self::Node) -> String;
}

/// Deferred callbacks.
pub trait FeedScheduler {
    fn set_timeout(&mut self, delay: Duration, wake: Wake) -> Result<(), HostError>;

    /// Deliver `Signal::AnimationFrame` before the next paint.
    fn request_animation_frame(&mut self) -> Result<(), HostError>;
}

/// Change notifications on the bound container.
pub trait FeedObservers: FeedDocument {
    /// Deliver `Signal::Mutated` batches for child-list, subtree and
    /// character-data changes under `node`.
    fn observe_mutations(&mut self, node: &Self::Node) -> Result<(), HostError>;

    /// Deliver `Signal::Scrolled` for scroll events on `node`.
    fn listen_scroll(&mut self, node: &Self::Node) -> Result<(), HostError>;
}

/// Everything the controller needs from a host.
pub trait FeedHost: FeedDocument + FeedScheduler + FeedObservers {}

impl<T: FeedDocument + FeedScheduler + FeedObservers> FeedHost for T {}
