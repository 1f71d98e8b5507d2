#![forbid(unsafe_code)]

//! Scenario driver: owns one controller and one [`SimHost`] and plays the
//! event loop forward on a virtual clock.
//!
//! Ordering within one turn of the loop mirrors the browser closely enough
//! for the controller's purposes: a timer callback runs, then queued
//! mutation batches, then scroll events, then the animation frame.

use std::time::Duration;

use feedfollow_core::FollowConfig;
use feedfollow_core::controller::{Controller, ControllerState, Dispatch, Outcome, Signal};

use crate::document::{SimHost, SimNodeId};

/// Upper bound on signals released by one [`Driver::settle`] call.
const MAX_SETTLE_STEPS: usize = 1_000;

/// Controller plus simulated host plus dispatch history.
#[derive(Debug)]
pub struct Driver {
    host: SimHost,
    controller: Controller<SimNodeId>,
    history: Vec<Dispatch>,
}

impl Driver {
    /// Boot a controller against `host`.
    pub fn boot(config: FollowConfig, mut host: SimHost) -> Self {
        let (controller, dispatch) = Controller::boot(config, &mut host);
        Self {
            host,
            controller,
            history: vec![dispatch],
        }
    }

    #[must_use]
    pub fn host(&self) -> &SimHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut SimHost {
        &mut self.host
    }

    #[must_use]
    pub fn controller(&self) -> &Controller<SimNodeId> {
        &self.controller
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }

    /// Every dispatch so far, boot first.
    #[must_use]
    pub fn history(&self) -> &[Dispatch] {
        &self.history
    }

    /// Outcomes in order, without signals.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.history.iter().map(|d| d.outcome.clone()).collect()
    }

    /// Deliver one signal now, without settling.
    pub fn send(&mut self, signal: Signal) -> Dispatch {
        let dispatch = self.controller.handle(&mut self.host, signal);
        self.history.push(dispatch.clone());
        dispatch
    }

    /// Fire the document-ready event and settle.
    pub fn document_ready(&mut self) -> Vec<Dispatch> {
        self.send_and_settle(Signal::DocumentReady)
    }

    /// Fire the window-load event and settle.
    pub fn window_loaded(&mut self) -> Vec<Dispatch> {
        self.send_and_settle(Signal::WindowLoaded)
    }

    /// Chord press or indicator click.
    pub fn toggle(&mut self) -> Vec<Dispatch> {
        self.send_and_settle(Signal::TogglePressed)
    }

    /// Move the clock forward by `dt`, firing due timers in order.
    pub fn advance(&mut self, dt: Duration) -> Vec<Dispatch> {
        let deadline = self.host.now() + dt;
        let mut out = Vec::new();
        while let Some(timer) = self.host.pop_due_timer(deadline) {
            self.host.set_now(timer.due);
            out.push(self.send(Signal::Timer(timer.wake)));
            out.extend(self.settle());
        }
        self.host.set_now(deadline);
        out
    }

    /// Advance until the controller is bound or `limit` elapses.
    pub fn run_until_bound(&mut self, limit: Duration) -> Option<SimNodeId> {
        let step = Duration::from_millis(100);
        let deadline = self.host.now() + limit;
        while self.controller.bound_node().is_none() && self.host.now() < deadline {
            self.advance(step);
        }
        self.controller.bound_node().copied()
    }

    /// Release queued mutation batches, scroll events and animation frames
    /// until the host is quiet.
    pub fn settle(&mut self) -> Vec<Dispatch> {
        let mut out = Vec::new();
        for _ in 0..MAX_SETTLE_STEPS {
            let signal = if self.host.take_mutation() {
                Signal::Mutated
            } else if self.host.take_scroll() {
                Signal::Scrolled
            } else if self.host.take_frame() {
                Signal::AnimationFrame
            } else {
                return out;
            };
            out.push(self.send(signal));
        }
        tracing::warn!(target: "feedfollow.harness", "settle did not quiesce");
        out
    }

    /// Deliver a queued mutation batch, if any, and nothing else. Lets a
    /// test interleave signals before the animation frame runs.
    pub fn flush_mutations(&mut self) -> Option<Dispatch> {
        self.host
            .take_mutation()
            .then(|| self.send(Signal::Mutated))
    }

    /// Grow `node` by `px` and let the loop run.
    pub fn append_content(&mut self, node: SimNodeId, px: f64) -> Vec<Dispatch> {
        self.host.append_content(node, px);
        self.settle()
    }

    /// User scroll gesture followed by a settle.
    pub fn user_scroll_to(&mut self, node: SimNodeId, scroll_top: f64) -> Vec<Dispatch> {
        self.host.user_scroll_to(node, scroll_top);
        self.settle()
    }

    /// One JSON object per dispatch, for failure diagnostics.
    #[must_use]
    pub fn transcript_jsonl(&self) -> String {
        self.history
            .iter()
            .enumerate()
            .map(|(seq, d)| {
                serde_json::json!({
                    "seq": seq,
                    "signal": d.signal.map(|s| format!("{s:?}")),
                    "outcome": format!("{:?}", d.outcome),
                })
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn send_and_settle(&mut self, signal: Signal) -> Vec<Dispatch> {
        let mut out = vec![self.send(signal)];
        out.extend(self.settle());
        out
    }
}
