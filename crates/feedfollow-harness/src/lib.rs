#![forbid(unsafe_code)]

//! Deterministic simulator for `feedfollow-core`.
//!
//! [`SimHost`] is an in-memory document: elements with layout metrics and a
//! tiny selector engine, injection markers, a virtual clock with a timer
//! queue, and fault switches for every host call. [`Driver`] owns a
//! controller and a host and replays the event loop, so end-to-end
//! scenarios run without a browser.
//!
//! ```ignore
//! let mut host = SimHost::new();
//! let feed = host.insert(ElementSpec::scroll_box(500.0).class("chat-messages"));
//! let mut driver = Driver::boot(FollowConfig::default(), host);
//! driver.document_ready();
//! driver.run_until_bound(Duration::from_secs(5));
//! driver.append_content(feed, 300.0);
//! ```

pub mod document;
pub mod driver;
pub mod selector;

pub use document::{ElementSpec, Faults, PendingTimer, SimHost, SimNodeId};
pub use driver::Driver;
