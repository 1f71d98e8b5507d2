#![forbid(unsafe_code)]

//! Environment and initialization guards.
//!
//! [`check_environment`] runs once at boot and decides whether the controller
//! does anything at all. [`InitGuard`] makes the setup body run at most once
//! per document, no matter how many triggers fire.

use crate::host::{FeedDocument, InjectionMarker};

/// Boot verdict from the environment guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Usable,
    /// No window/document context.
    Unavailable,
    /// A previous injection already started a controller in this document.
    AlreadyInjected,
}

/// Decide whether the controller may run in this host.
///
/// Has no side effects. A marker that cannot be read is treated as unset:
/// the in-process [`InitGuard`] still prevents double setup.
pub fn check_environment<D: FeedDocument>(doc: &D) -> Environment {
    if !doc.is_available() {
        return Environment::Unavailable;
    }
    match doc.marker(InjectionMarker::Started) {
        Ok(true) => Environment::AlreadyInjected,
        Ok(false) => Environment::Usable,
        Err(err) => {
            tracing::debug!(
                target: "feedfollow.guard",
                error = %err,
                "injection marker unreadable, assuming first injection"
            );
            Environment::Usable
        }
    }
}

/// Once-per-document initialization state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitGuard {
    started: bool,
    completed: bool,
}

impl InitGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            started: false,
            completed: false,
        }
    }

    /// Check-and-set. Returns `true` for exactly the first caller.
    ///
    /// Must be called before the caller schedules any deferred work.
    pub fn try_start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        true
    }

    /// Record that a container was bound.
    pub fn complete(&mut self) {
        debug_assert!(self.started, "complete() before try_start()");
        self.completed = true;
    }

    #[must_use]
    pub const fn started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_start_passes() {
        let mut guard = InitGuard::new();
        assert!(guard.try_start());
        assert!(!guard.try_start());
        assert!(!guard.try_start());
        assert!(guard.started());
        assert!(!guard.completed());
        guard.complete();
        assert!(guard.completed());
        assert!(!guard.try_start());
    }
}
