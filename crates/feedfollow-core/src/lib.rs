#![forbid(unsafe_code)]

//! `feedfollow-core` keeps an unknown, streaming scrollable region pinned to
//! its newest content.
//!
//! Design goals:
//! - **Host-agnostic**: the document is reached only through the
//!   [`host::FeedHost`] traits; the browser binding and the test simulator
//!   implement them.
//! - **Host-driven**: timers, animation frames, scroll events and mutation
//!   batches come back as [`controller::Signal`] values fed to one
//!   [`controller::Controller`].
//! - **Failure-tolerant**: every host call returns a `Result`; a failure
//!   rejects one candidate or degrades one capability, never the controller.
//!
//! ```ignore
//! let (mut controller, _) = Controller::boot(FollowConfig::default(), &mut host);
//! // ...later, from the host's callback queue:
//! let dispatch = controller.handle(&mut host, Signal::Mutated);
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod follow;
pub mod guard;
pub mod host;
pub mod keys;
pub mod locator;
pub mod pause;
pub mod probe;
pub mod tracker;

pub use config::FollowConfig;
pub use controller::{Controller, ControllerState, Dispatch, Outcome, Signal};
pub use error::{ConfigError, HostError};
pub use host::{FeedDocument, FeedHost, FeedObservers, FeedScheduler, InitTrigger, InjectionMarker, Wake};
pub use probe::{ElementProbe, Overflow, ScrollMetrics};
