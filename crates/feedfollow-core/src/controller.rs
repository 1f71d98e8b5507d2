#![forbid(unsafe_code)]

//! The follow controller: one owner for every signal the host delivers.
//!
//! # State Machine
//!
//! ```text
//!            boot (usable)                 Init timer (first only)
//!  ┌─────────┐ ──────────▶ ┌─────────┐ ──────────────────────────▶ ┌──────────┐
//!  │ (boot)  │             │ Unbound │                             │ Locating │◀─┐
//!  └─────────┘             └─────────┘                             └──────────┘  │ NotFound:
//!       │ unavailable /                                     Locate   │    └──────┘ retry
//!       │ already injected                                  found    ▼
//!       ▼                                                   ┌───────────┐ toggle ┌────────┐
//!  ┌──────────┐                                             │ Following │◀──────▶│ Paused │
//!  │ Disabled │                                             └───────────┘        └────────┘
//!  └──────────┘
//! ```
//!
//! Every [`Controller::handle`] call returns a [`Dispatch`] naming what
//! happened. Host failures are folded into outcomes; nothing propagates.

use core::fmt::Debug;
use core::time::Duration;

use crate::config::FollowConfig;
use crate::error::HostError;
use crate::follow::{FollowEngine, FollowState, FrameAction, Growth, Suppressed};
use crate::guard::{Environment, InitGuard, check_environment};
use crate::host::{FeedHost, InitTrigger, InjectionMarker, Wake};
use crate::keys::KeyPress;
use crate::locator::{LocateOutcome, LocatePass, locate};
use crate::pause::{IndicatorState, Toggle};

/// Callback delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    DocumentReady,
    WindowLoaded,
    Timer(Wake),
    AnimationFrame,
    /// Scroll event on the bound container.
    Scrolled,
    /// One mutation-observer batch on the bound container.
    Mutated,
    /// Key chord or indicator click.
    TogglePressed,
}

/// Why the controller stays inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    EnvironmentUnavailable,
    AlreadyInjected,
}

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Disabled(DisabledReason),
    Unbound,
    Locating { attempt: u32 },
    Following,
    Paused,
}

/// Which parts of observation were wired successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub scroll_tracking: bool,
    pub growth_following: bool,
}

/// Why a signal had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    Disabled,
    NotBound,
    NotLocating,
    /// Animation frame with nothing pending.
    StaleFrame,
    /// The located container already belongs to another controller.
    AlreadyBound,
}

/// Result of handling one signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Disabled(DisabledReason),
    FallbackScheduled { delay: Duration },
    InitScheduled { trigger: InitTrigger, delay: Duration },
    InitStarted { trigger: InitTrigger },
    InitSkipped { trigger: InitTrigger },
    LocateRetryScheduled { attempt: u32, delay: Duration },
    Bound {
        pass: LocatePass,
        client_height: f64,
        capabilities: Capabilities,
    },
    NearBottomUpdated(bool),
    NoGrowth,
    FollowScheduled { from: f64, to: f64 },
    FollowCoalesced,
    FollowSuppressed(Suppressed),
    FollowApplied { scroll_top: f64 },
    Paused,
    Resumed { caught_up: bool },
    Ignored(IgnoredReason),
    /// A host call failed; the controller carries on.
    Degraded(HostError),
}

/// One handled signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub signal: Option<Signal>,
    pub outcome: Outcome,
}

#[derive(Debug)]
struct Binding<N> {
    node: N,
    label: String,
    engine: FollowEngine,
    capabilities: Capabilities,
}

#[derive(Debug)]
enum Phase<N> {
    Disabled(DisabledReason),
    Unbound,
    Locating { attempt: u32 },
    Bound(Box<Binding<N>>),
}

/// Adaptive follow controller bound to at most one container.
#[derive(Debug)]
pub struct Controller<N> {
    config: FollowConfig,
    guard: InitGuard,
    phase: Phase<N>,
    /// Locating with no locate timer pending.
    locate_stalled: bool,
}

impl<N: Clone + PartialEq + Debug> Controller<N> {
    /// Run the environment guard and arm the fallback trigger.
    ///
    /// An invalid configuration is replaced by the defaults.
    pub fn boot<H>(config: FollowConfig, host: &mut H) -> (Self, Dispatch)
    where
        H: FeedHost<Node = N>,
    {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                tracing::warn!(target: "feedfollow.guard", error = %err, "invalid config, using defaults");
                FollowConfig::default()
            }
        };
        let mut controller = Self {
            config,
            guard: InitGuard::new(),
            phase: Phase::Unbound,
            locate_stalled: false,
        };
        let outcome = match check_environment(&*host) {
            Environment::Usable => {
                // Claim the document before any deferred work so a repeated
                // injection during the trigger delays sees the marker.
                if let Err(err) = host.set_marker(InjectionMarker::Started) {
                    tracing::debug!(target: "feedfollow.guard", error = %err, "started marker not published");
                }
                controller.arm_fallback(host)
            }
            Environment::Unavailable => {
                tracing::info!(target: "feedfollow.guard", "no document context, controller disabled");
                controller.disable(DisabledReason::EnvironmentUnavailable)
            }
            Environment::AlreadyInjected => {
                tracing::info!(target: "feedfollow.guard", "controller already injected in this document");
                controller.disable(DisabledReason::AlreadyInjected)
            }
        };
        let dispatch = Dispatch {
            signal: None,
            outcome,
        };
        tracing::debug!(target: "feedfollow.guard", outcome = ?dispatch.outcome, "boot");
        (controller, dispatch)
    }

    #[must_use]
    pub fn config(&self) -> &FollowConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        match &self.phase {
            Phase::Disabled(reason) => ControllerState::Disabled(*reason),
            Phase::Unbound => ControllerState::Unbound,
            Phase::Locating { attempt } => ControllerState::Locating { attempt: *attempt },
            Phase::Bound(binding) if binding.engine.state().paused => ControllerState::Paused,
            Phase::Bound(_) => ControllerState::Following,
        }
    }

    #[must_use]
    pub const fn init_guard(&self) -> InitGuard {
        self.guard
    }

    #[must_use]
    pub fn bound_node(&self) -> Option<&N> {
        self.binding().map(|b| &b.node)
    }

    #[must_use]
    pub fn follow_state(&self) -> Option<FollowState> {
        self.binding().map(|b| b.engine.state())
    }

    #[must_use]
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.binding().map(|b| b.capabilities)
    }

    /// Read model for the status indicator; `None` until bound.
    #[must_use]
    pub fn indicator(&self) -> Option<IndicatorState> {
        self.binding().map(|b| b.engine.indicator())
    }

    /// Whether `press` is the configured toggle chord.
    #[must_use]
    pub fn is_toggle_key(&self, press: &KeyPress) -> bool {
        self.config.toggle_chord.matches(press)
    }

    /// Handle one host signal.
    pub fn handle<H>(&mut self, host: &mut H, signal: Signal) -> Dispatch
    where
        H: FeedHost<Node = N>,
    {
        let outcome = if matches!(self.phase, Phase::Disabled(_)) {
            Outcome::Ignored(IgnoredReason::Disabled)
        } else if let Some(outcome) = self.rearm_locate(host, signal) {
            outcome
        } else {
            match signal {
                Signal::DocumentReady => self.on_trigger(host, InitTrigger::DocumentReady),
                Signal::WindowLoaded => self.on_trigger(host, InitTrigger::WindowLoad),
                Signal::Timer(Wake::Init(trigger)) => self.on_init(host, trigger),
                Signal::Timer(Wake::Locate) => self.on_locate(host),
                Signal::AnimationFrame => self.on_frame(host),
                Signal::Scrolled => self.on_scroll(host),
                Signal::Mutated => self.on_mutations(host),
                Signal::TogglePressed => self.on_toggle(host),
            }
        };
        let dispatch = Dispatch {
            signal: Some(signal),
            outcome,
        };
        tracing::debug!(
            target: "feedfollow.controller",
            signal = ?signal,
            outcome = ?dispatch.outcome,
            "dispatch"
        );
        dispatch
    }

    fn binding(&self) -> Option<&Binding<N>> {
        match &self.phase {
            Phase::Bound(binding) => Some(binding),
            _ => None,
        }
    }

    fn disable(&mut self, reason: DisabledReason) -> Outcome {
        self.phase = Phase::Disabled(reason);
        Outcome::Disabled(reason)
    }

    fn arm_fallback<H: FeedHost<Node = N>>(&mut self, host: &mut H) -> Outcome {
        let delay = self.config.fallback_delay();
        match host.set_timeout(delay, Wake::Init(InitTrigger::Fallback)) {
            Ok(()) => Outcome::FallbackScheduled { delay },
            Err(err) => {
                tracing::warn!(target: "feedfollow.guard", error = %err, "fallback trigger not scheduled");
                Outcome::Degraded(err)
            }
        }
    }

    fn on_trigger<H: FeedHost<Node = N>>(&mut self, host: &mut H, trigger: InitTrigger) -> Outcome {
        if self.guard.started() {
            return Outcome::InitSkipped { trigger };
        }
        let delay = match trigger {
            InitTrigger::DocumentReady => self.config.ready_delay(),
            InitTrigger::WindowLoad => self.config.load_delay(),
            InitTrigger::Fallback => Duration::ZERO,
        };
        match host.set_timeout(delay, Wake::Init(trigger)) {
            Ok(()) => Outcome::InitScheduled { trigger, delay },
            Err(err) => {
                tracing::warn!(
                    target: "feedfollow.guard",
                    trigger = trigger.as_str(),
                    error = %err,
                    "init trigger not scheduled"
                );
                Outcome::Degraded(err)
            }
        }
    }

    fn on_init<H: FeedHost<Node = N>>(&mut self, host: &mut H, trigger: InitTrigger) -> Outcome {
        // The flag flips before anything is scheduled, so a second trigger
        // firing during the initial delay sees it.
        if !self.guard.try_start() {
            return Outcome::InitSkipped { trigger };
        }
        tracing::info!(
            target: "feedfollow.guard",
            trigger = trigger.as_str(),
            "initialization started"
        );
        self.phase = Phase::Locating { attempt: 1 };
        match host.set_timeout(self.config.initial_delay(), Wake::Locate) {
            Ok(()) => Outcome::InitStarted { trigger },
            Err(err) => {
                tracing::warn!(target: "feedfollow.locate", error = %err, "first locate pass not scheduled");
                self.locate_stalled = true;
                Outcome::Degraded(err)
            }
        }
    }

    /// Retry scheduling a locate pass that the host refused earlier.
    ///
    /// Any signal will do: while locating, every signal other than the
    /// locate timer is a no-op.
    fn rearm_locate<H: FeedHost<Node = N>>(
        &mut self,
        host: &mut H,
        signal: Signal,
    ) -> Option<Outcome> {
        let Phase::Locating { attempt } = self.phase else {
            return None;
        };
        if !self.locate_stalled || signal == Signal::Timer(Wake::Locate) {
            return None;
        }
        let delay = self.config.retry_interval();
        match host.set_timeout(delay, Wake::Locate) {
            Ok(()) => {
                self.locate_stalled = false;
                tracing::info!(target: "feedfollow.locate", attempt, retry_in = ?delay, "locate timer re-armed");
                Some(Outcome::LocateRetryScheduled { attempt, delay })
            }
            Err(err) => {
                tracing::debug!(target: "feedfollow.locate", error = %err, "locate timer still refused");
                None
            }
        }
    }

    fn on_locate<H: FeedHost<Node = N>>(&mut self, host: &mut H) -> Outcome {
        let Phase::Locating { attempt } = self.phase else {
            return Outcome::Ignored(IgnoredReason::NotLocating);
        };
        self.locate_stalled = false;
        match locate(&*host, &self.config) {
            LocateOutcome::Found(located) => {
                self.bind(host, located.node, located.pass, located.client_height)
            }
            LocateOutcome::NotFound(report) => {
                let next = attempt.saturating_add(1);
                let delay = self.config.retry_interval();
                tracing::debug!(
                    target: "feedfollow.locate",
                    attempt,
                    scanned = report.scanned,
                    selector_matches = report.selector_matches,
                    rejected = report.selector_rejections.total() + report.heuristic_rejections.total(),
                    retry_in = ?delay,
                    "no feed container found"
                );
                self.phase = Phase::Locating { attempt: next };
                match host.set_timeout(delay, Wake::Locate) {
                    Ok(()) => Outcome::LocateRetryScheduled {
                        attempt: next,
                        delay,
                    },
                    Err(err) => {
                        tracing::warn!(target: "feedfollow.locate", error = %err, "locate retry not scheduled");
                        self.locate_stalled = true;
                        Outcome::Degraded(err)
                    }
                }
            }
        }
    }

    fn bind<H: FeedHost<Node = N>>(
        &mut self,
        host: &mut H,
        node: N,
        pass: LocatePass,
        client_height: f64,
    ) -> Outcome {
        if host.is_bound(&node) {
            tracing::info!(target: "feedfollow.locate", "feed container already bound elsewhere");
            self.phase = Phase::Disabled(DisabledReason::AlreadyInjected);
            return Outcome::Ignored(IgnoredReason::AlreadyBound);
        }
        if let Err(err) = host.mark_bound(&node) {
            tracing::debug!(target: "feedfollow.locate", error = %err, "bound marker not set");
        }
        self.guard.complete();
        if let Err(err) = host.set_marker(InjectionMarker::Bound) {
            tracing::debug!(target: "feedfollow.locate", error = %err, "bound marker not published");
        }

        let baseline = match host.scroll_metrics(&node) {
            Ok(metrics) => metrics.scroll_height,
            Err(err) => {
                tracing::debug!(target: "feedfollow.follow", error = %err, "baseline unreadable, starting at zero");
                0.0
            }
        };

        let scroll_tracking = match host.listen_scroll(&node) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "feedfollow.follow", error = %err, "scroll tracking unavailable");
                false
            }
        };
        let growth_following = match host.observe_mutations(&node) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "feedfollow.follow", error = %err, "growth following unavailable");
                false
            }
        };
        let capabilities = Capabilities {
            scroll_tracking,
            growth_following,
        };

        let label = host.describe(&node);
        tracing::info!(
            target: "feedfollow.locate",
            container = %label,
            pass = ?pass,
            client_height,
            baseline,
            scroll_tracking,
            growth_following,
            "feed container bound, toggle with {}",
            self.config.toggle_chord
        );
        self.phase = Phase::Bound(Box::new(Binding {
            node,
            label,
            engine: FollowEngine::new(baseline, self.config.near_bottom_threshold_px),
            capabilities,
        }));
        Outcome::Bound {
            pass,
            client_height,
            capabilities,
        }
    }

    fn on_scroll<H: FeedHost<Node = N>>(&mut self, host: &mut H) -> Outcome {
        let Phase::Bound(binding) = &mut self.phase else {
            return Outcome::Ignored(IgnoredReason::NotBound);
        };
        let metrics = host.scroll_metrics(&binding.node);
        Outcome::NearBottomUpdated(binding.engine.on_scroll(metrics))
    }

    fn on_mutations<H: FeedHost<Node = N>>(&mut self, host: &mut H) -> Outcome {
        let Phase::Bound(binding) = &mut self.phase else {
            return Outcome::Ignored(IgnoredReason::NotBound);
        };
        let scroll_height = match host.scroll_metrics(&binding.node) {
            Ok(metrics) => metrics.scroll_height,
            Err(err) => return Outcome::Degraded(err),
        };
        match binding.engine.on_mutations(scroll_height) {
            Growth::None { .. } => Outcome::NoGrowth,
            Growth::Coalesced { .. } => Outcome::FollowCoalesced,
            Growth::Suppressed { reason, .. } => Outcome::FollowSuppressed(reason),
            Growth::Follow { from, to } => match host.request_animation_frame() {
                Ok(()) => Outcome::FollowScheduled { from, to },
                Err(err) => {
                    binding.engine.cancel_frame();
                    tracing::debug!(target: "feedfollow.follow", error = %err, "animation frame not requested");
                    Outcome::Degraded(err)
                }
            },
        }
    }

    fn on_frame<H: FeedHost<Node = N>>(&mut self, host: &mut H) -> Outcome {
        let Phase::Bound(binding) = &mut self.phase else {
            return Outcome::Ignored(IgnoredReason::NotBound);
        };
        match binding.engine.on_frame() {
            FrameAction::Stale => Outcome::Ignored(IgnoredReason::StaleFrame),
            FrameAction::Skip(reason) => Outcome::FollowSuppressed(reason),
            FrameAction::ScrollToBottom => scroll_to_bottom(host, &binding.node),
        }
    }

    fn on_toggle<H: FeedHost<Node = N>>(&mut self, host: &mut H) -> Outcome {
        let Phase::Bound(binding) = &mut self.phase else {
            return Outcome::Ignored(IgnoredReason::NotBound);
        };
        match binding.engine.toggle() {
            (Toggle::Paused, _) => {
                tracing::info!(target: "feedfollow.pause", container = %binding.label, "auto-scroll paused");
                Outcome::Paused
            }
            (Toggle::Resumed, catch_up) => {
                tracing::info!(target: "feedfollow.pause", container = %binding.label, "auto-scroll enabled");
                let caught_up = catch_up
                    && matches!(
                        scroll_to_bottom(host, &binding.node),
                        Outcome::FollowApplied { .. }
                    );
                Outcome::Resumed { caught_up }
            }
        }
    }
}

/// Re-read `scrollHeight` and write it to `scrollTop`.
fn scroll_to_bottom<H: FeedHost>(host: &mut H, node: &H::Node) -> Outcome {
    let scroll_top = match host.scroll_metrics(node) {
        Ok(metrics) => metrics.scroll_height,
        Err(err) => return Outcome::Degraded(err),
    };
    match host.set_scroll_top(node, scroll_top) {
        Ok(()) => Outcome::FollowApplied { scroll_top },
        Err(err) => {
            tracing::debug!(target: "feedfollow.follow", error = %err, "scroll write failed");
            Outcome::Degraded(err)
        }
    }
}
