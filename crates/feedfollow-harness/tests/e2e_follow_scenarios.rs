#![forbid(unsafe_code)]

//! End-to-end follow scenarios against the simulated document.
//!
//! Each test boots a controller with [`Driver`], plays lifecycle events and
//! content growth on the virtual clock, and checks what was written to the
//! container and which outcomes were dispatched.
//!
//! 1. Initialization runs once no matter how many triggers fire
//! 2. Growth near the bottom is followed on the next animation frame
//! 3. Pause suppresses following but keeps the baseline current
//! 4. Container discovery: selector priority, tallest wins, retries
//! 5. Degraded hosts: failed probes, registrations and metric reads
//! 6. Disabled controllers: no document, re-injection
//!
//! # Running
//!
//! ```sh
//! cargo test -p feedfollow-harness --test e2e_follow_scenarios
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use feedfollow_core::{Controller, FollowConfig};
use feedfollow_core::controller::{
    Capabilities, ControllerState, DisabledReason, IgnoredReason, Outcome, Signal,
};
use feedfollow_core::follow::Suppressed;
use feedfollow_core::host::{InitTrigger, InjectionMarker};
use feedfollow_core::locator::LocatePass;
use feedfollow_core::probe::Overflow;
use feedfollow_harness::{Driver, ElementSpec, SimHost, SimNodeId};
use pretty_assertions::assert_eq;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ===========================================================================
// Fixtures
// ===========================================================================

/// Feed box 400 px tall holding 500 px of content.
fn feed_spec() -> ElementSpec {
    ElementSpec::div()
        .class("chat-messages")
        .size(400.0, 500.0)
        .overflow(Overflow::Auto)
        .with_children()
}

fn bound_driver(config: FollowConfig, host: SimHost) -> (Driver, SimNodeId) {
    let mut driver = Driver::boot(config, host);
    driver.document_ready();
    let node = driver
        .run_until_bound(Duration::from_secs(30))
        .unwrap_or_else(|| panic!("never bound:\n{}", driver.transcript_jsonl()));
    (driver, node)
}

fn bound_feed() -> (Driver, SimNodeId) {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    let (driver, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, feed);
    (driver, feed)
}

/// Reach the bottom, then scroll back to the top of the feed.
fn scroll_away(driver: &mut Driver, feed: SimNodeId) -> Vec<Outcome> {
    driver.host_mut().user_scroll_to_bottom(feed);
    driver.settle();
    outcomes_of(driver.user_scroll_to(feed, 0.0))
}

fn count(outcomes: &[Outcome], pred: impl Fn(&Outcome) -> bool) -> usize {
    outcomes.iter().filter(|o| pred(o)).count()
}

fn outcomes_of(dispatches: Vec<feedfollow_core::Dispatch>) -> Vec<Outcome> {
    dispatches.into_iter().map(|d| d.outcome).collect()
}

// ===========================================================================
// Log capture
// ===========================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_events<T>(f: impl FnOnce() -> T) -> (T, Vec<CapturedEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: events.clone(),
    });
    let out = tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    (out, captured)
}

// ===========================================================================
// 1. Idempotent initialization
// ===========================================================================

#[test]
fn init_runs_once_across_all_triggers() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    let mut driver = Driver::boot(FollowConfig::default(), host);
    driver.document_ready();
    driver.window_loaded();
    driver.advance(Duration::from_secs(20));

    let outcomes = driver.outcomes();
    assert_eq!(
        count(&outcomes, |o| matches!(o, Outcome::InitStarted { .. })),
        1
    );
    assert_eq!(count(&outcomes, |o| matches!(o, Outcome::Bound { .. })), 1);
    assert!(outcomes.contains(&Outcome::InitStarted {
        trigger: InitTrigger::DocumentReady
    }));
    assert!(outcomes.contains(&Outcome::InitSkipped {
        trigger: InitTrigger::WindowLoad
    }));
    assert!(outcomes.contains(&Outcome::InitSkipped {
        trigger: InitTrigger::Fallback
    }));
    assert!(driver.host().is_observed(feed));
    assert_eq!(driver.host().observer_registrations(), 1);
    assert_eq!(driver.host().listener_registrations(), 1);
    assert!(driver.host().has_marker(InjectionMarker::Started));
    assert!(driver.host().has_marker(InjectionMarker::Bound));
    assert!(driver.controller().init_guard().completed());
}

#[test]
fn trigger_after_start_is_skipped_immediately() {
    let (mut driver, _) = bound_feed();
    let dispatch = driver.send(Signal::DocumentReady);
    assert_eq!(
        dispatch.outcome,
        Outcome::InitSkipped {
            trigger: InitTrigger::DocumentReady
        }
    );
    assert!(driver.host().pending_timers().iter().all(|t| !matches!(
        t.wake,
        feedfollow_core::Wake::Init(InitTrigger::DocumentReady)
    )));
}

#[test]
fn load_trigger_schedules_two_second_delay() {
    let mut driver = Driver::boot(FollowConfig::default(), SimHost::new());
    let dispatch = driver.send(Signal::WindowLoaded);
    assert_eq!(
        dispatch.outcome,
        Outcome::InitScheduled {
            trigger: InitTrigger::WindowLoad,
            delay: Duration::from_secs(2),
        }
    );
}

// ===========================================================================
// 2. Growth following
// ===========================================================================

#[test]
fn growth_near_bottom_scrolls_on_next_frame() {
    let (mut driver, feed) = bound_feed();
    assert_eq!(driver.controller().follow_state().map(|s| s.last_known_scroll_height), Some(500.0));

    driver.host_mut().append_content(feed, 300.0);
    let scheduled = driver.flush_mutations().map(|d| d.outcome);
    assert_eq!(
        scheduled,
        Some(Outcome::FollowScheduled {
            from: 500.0,
            to: 800.0
        })
    );
    // Nothing written until the frame runs.
    assert!(driver.host().scroll_writes().is_empty());

    let rest = outcomes_of(driver.settle());
    assert_eq!(
        rest,
        vec![
            Outcome::FollowApplied { scroll_top: 800.0 },
            Outcome::NearBottomUpdated(true),
        ]
    );
    assert_eq!(driver.host().scroll_writes(), &[(feed, 800.0)]);
    assert_eq!(driver.host().scroll_top(feed), Some(400.0));
}

#[test]
fn batches_before_the_frame_coalesce() {
    let (mut driver, feed) = bound_feed();
    driver.host_mut().append_content(feed, 100.0);
    driver.flush_mutations();
    driver.host_mut().append_content(feed, 200.0);
    let second = driver.flush_mutations().map(|d| d.outcome);
    assert_eq!(second, Some(Outcome::FollowCoalesced));

    driver.settle();
    assert_eq!(driver.host().frame_requests(), 1);
    assert_eq!(driver.host().scroll_writes(), &[(feed, 800.0)]);
}

#[test]
fn scrolled_away_user_is_not_pulled_down() {
    let (mut driver, feed) = bound_feed();
    let outcomes = scroll_away(&mut driver, feed);
    assert_eq!(outcomes, vec![Outcome::NearBottomUpdated(false)]);

    let outcomes = outcomes_of(driver.append_content(feed, 300.0));
    assert_eq!(
        outcomes,
        vec![Outcome::FollowSuppressed(Suppressed::NotNearBottom)]
    );
    assert!(driver.host().scroll_writes().is_empty());
    assert_eq!(driver.host().frame_requests(), 0);

    // Back at the bottom: following resumes from the updated baseline.
    driver.host_mut().user_scroll_to_bottom(feed);
    driver.settle();
    let outcomes = outcomes_of(driver.append_content(feed, 50.0));
    assert_eq!(
        outcomes.first(),
        Some(&Outcome::FollowScheduled {
            from: 800.0,
            to: 850.0
        })
    );
    assert_eq!(driver.host().scroll_writes(), &[(feed, 850.0)]);
}

#[test]
fn shrinking_content_only_moves_the_baseline() {
    let (mut driver, feed) = bound_feed();
    driver.host_mut().set_content_height(feed, 450.0);
    assert_eq!(outcomes_of(driver.settle()), vec![Outcome::NoGrowth]);
    assert_eq!(
        driver.controller().follow_state().map(|s| s.last_known_scroll_height),
        Some(450.0)
    );

    driver.host_mut().set_content_height(feed, 480.0);
    let first = driver.flush_mutations().map(|d| d.outcome);
    assert_eq!(
        first,
        Some(Outcome::FollowScheduled {
            from: 450.0,
            to: 480.0
        })
    );
}

#[test]
fn frame_without_request_is_stale() {
    let (mut driver, _) = bound_feed();
    assert_eq!(
        driver.send(Signal::AnimationFrame).outcome,
        Outcome::Ignored(IgnoredReason::StaleFrame)
    );
}

#[test]
fn growth_is_followed_repeatedly() {
    let (mut driver, feed) = bound_feed();
    for _ in 0..5 {
        driver.append_content(feed, 120.0);
    }
    let writes: Vec<f64> = driver.host().scroll_writes().iter().map(|(_, v)| *v).collect();
    assert_eq!(writes, vec![620.0, 740.0, 860.0, 980.0, 1100.0]);
    assert_eq!(driver.state(), ControllerState::Following);
}

// ===========================================================================
// 3. Pause / resume
// ===========================================================================

#[test]
fn pause_suppresses_growth_and_tracks_baseline() {
    let (mut driver, feed) = bound_feed();
    assert_eq!(outcomes_of(driver.toggle()), vec![Outcome::Paused]);
    assert_eq!(driver.state(), ControllerState::Paused);
    assert_eq!(driver.controller().indicator().map(|i| i.paused), Some(true));

    let outcomes = outcomes_of(driver.append_content(feed, 300.0));
    assert_eq!(outcomes, vec![Outcome::FollowSuppressed(Suppressed::Paused)]);
    assert!(driver.host().scroll_writes().is_empty());
    assert_eq!(
        driver.controller().follow_state().map(|s| s.last_known_scroll_height),
        Some(800.0)
    );
}

#[test]
fn resume_near_bottom_catches_up_immediately() {
    let (mut driver, feed) = bound_feed();
    driver.toggle();
    driver.append_content(feed, 300.0);

    let outcomes = outcomes_of(driver.toggle());
    assert_eq!(outcomes.first(), Some(&Outcome::Resumed { caught_up: true }));
    assert_eq!(driver.host().scroll_writes(), &[(feed, 800.0)]);
    assert_eq!(driver.host().frame_requests(), 0);
    assert_eq!(driver.state(), ControllerState::Following);

    // The next batch grows from the baseline recorded while paused.
    let outcomes = outcomes_of(driver.append_content(feed, 100.0));
    assert_eq!(
        outcomes.first(),
        Some(&Outcome::FollowScheduled {
            from: 800.0,
            to: 900.0
        })
    );
}

#[test]
fn resume_away_from_bottom_does_not_scroll() {
    let (mut driver, feed) = bound_feed();
    scroll_away(&mut driver, feed);
    driver.toggle();
    let outcomes = outcomes_of(driver.toggle());
    assert_eq!(outcomes, vec![Outcome::Resumed { caught_up: false }]);
    assert!(driver.host().scroll_writes().is_empty());
}

#[test]
fn pause_between_request_and_frame_skips_the_write() {
    let (mut driver, feed) = bound_feed();
    driver.host_mut().append_content(feed, 300.0);
    driver.flush_mutations();
    assert_eq!(driver.send(Signal::TogglePressed).outcome, Outcome::Paused);

    let outcomes = outcomes_of(driver.settle());
    assert_eq!(outcomes, vec![Outcome::FollowSuppressed(Suppressed::Paused)]);
    assert!(driver.host().scroll_writes().is_empty());
}

#[test]
fn toggle_before_bind_is_ignored() {
    let mut driver = Driver::boot(FollowConfig::default(), SimHost::new());
    assert_eq!(
        driver.send(Signal::TogglePressed).outcome,
        Outcome::Ignored(IgnoredReason::NotBound)
    );
    assert_eq!(driver.controller().indicator(), None);
}

// ===========================================================================
// 4. Container discovery
// ===========================================================================

#[test]
fn heuristic_picks_the_tallest() {
    let mut host = SimHost::new();
    let _short = host.insert(ElementSpec::scroll_box(400.0));
    let tall = host.insert(ElementSpec::scroll_box(600.0));
    let (driver, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, tall);
    assert!(driver.outcomes().contains(&Outcome::Bound {
        pass: LocatePass::Heuristic,
        client_height: 600.0,
        capabilities: Capabilities {
            scroll_tracking: true,
            growth_following: true,
        },
    }));
}

#[test]
fn heuristic_tie_goes_to_document_order() {
    let mut host = SimHost::new();
    let first = host.insert(ElementSpec::scroll_box(500.0).id("first"));
    let _second = host.insert(ElementSpec::scroll_box(500.0).id("second"));
    let (_, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, first);
}

#[test]
fn selector_pass_wins_over_taller_heuristic_match() {
    let mut host = SimHost::new();
    let _tall = host.insert(ElementSpec::scroll_box(900.0));
    let feed = host.insert(
        ElementSpec::div()
            .class("chat-messages")
            .size(150.0, 600.0)
            .with_children(),
    );
    let (driver, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, feed);
    assert!(driver.outcomes().iter().any(|o| matches!(
        o,
        Outcome::Bound {
            pass: LocatePass::Selector { index: 2, .. },
            ..
        }
    )));
}

#[test]
fn earlier_selector_beats_earlier_element() {
    let mut host = SimHost::new();
    let _main = host.insert(ElementSpec::tag("main").size(500.0, 900.0).with_children());
    let convo = host.insert(
        ElementSpec::div()
            .class("conversation-container")
            .size(300.0, 900.0)
            .with_children(),
    );
    let (_, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, convo);
}

#[test]
fn selector_match_without_children_falls_through() {
    let mut host = SimHost::new();
    let _shell = host.insert(ElementSpec::div().class("chat-messages").size(400.0, 900.0));
    let fallback = host.insert(ElementSpec::scroll_box(300.0));
    let (_, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, fallback);
}

#[test]
fn invalid_selector_is_skipped() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    let config = FollowConfig {
        selectors: vec!["div[".to_owned(), ".chat-messages".to_owned()],
        ..FollowConfig::default()
    };
    let (driver, node) = bound_driver(config, host);
    assert_eq!(node, feed);
    assert!(driver.outcomes().iter().any(|o| matches!(
        o,
        Outcome::Bound {
            pass: LocatePass::Selector { index: 1, .. },
            ..
        }
    )));
}

#[test]
fn locate_retries_until_the_feed_appears() {
    let mut driver = Driver::boot(FollowConfig::default(), SimHost::new());
    driver.document_ready();
    driver.advance(Duration::from_millis(3_500));
    assert_eq!(driver.state(), ControllerState::Locating { attempt: 2 });
    assert_eq!(
        driver.history().last().map(|d| d.outcome.clone()),
        Some(Outcome::LocateRetryScheduled {
            attempt: 2,
            delay: Duration::from_secs(1),
        })
    );

    let feed = driver.host_mut().insert(feed_spec());
    driver.advance(Duration::from_secs(1));
    assert_eq!(driver.controller().bound_node(), Some(&feed));
    assert_eq!(driver.host().now(), Duration::from_millis(4_500));
}

#[test]
fn locating_never_gives_up() {
    let mut driver = Driver::boot(FollowConfig::default(), SimHost::new());
    driver.document_ready();
    driver.advance(Duration::from_secs(120));
    let retries = count(&driver.outcomes(), |o| {
        matches!(o, Outcome::LocateRetryScheduled { .. })
    });
    assert!(retries >= 100, "only {retries} retries");
    assert!(matches!(driver.state(), ControllerState::Locating { .. }));
}

#[test]
fn refused_first_locate_timer_is_rearmed_by_the_next_signal() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    let mut driver = Driver::boot(FollowConfig::default(), host);
    driver.document_ready();
    driver.host_mut().faults_mut().timers = true;
    driver.advance(Duration::from_secs(1));
    assert!(matches!(
        driver.history().last().map(|d| &d.outcome),
        Some(Outcome::Degraded(_))
    ));
    assert_eq!(driver.state(), ControllerState::Locating { attempt: 1 });
    assert!(driver.host().pending_timers().iter().all(|t| t.wake != feedfollow_core::Wake::Locate));

    driver.host_mut().faults_mut().timers = false;
    let dispatch = driver.send(Signal::WindowLoaded);
    assert_eq!(
        dispatch.outcome,
        Outcome::LocateRetryScheduled {
            attempt: 1,
            delay: Duration::from_secs(1),
        }
    );
    assert_eq!(driver.run_until_bound(Duration::from_secs(5)), Some(feed));
    assert_eq!(driver.host().now(), Duration::from_secs(2));
}

#[test]
fn refused_retry_timer_is_rearmed_by_the_fallback_trigger() {
    let mut driver = Driver::boot(FollowConfig::default(), SimHost::new());
    driver.document_ready();
    driver.advance(Duration::from_secs(1));
    driver.host_mut().faults_mut().timers = true;
    // First pass at 3.5 s finds nothing and cannot schedule its retry.
    driver.advance(Duration::from_millis(2_500));
    assert_eq!(driver.state(), ControllerState::Locating { attempt: 2 });
    assert!(matches!(
        driver.history().last().map(|d| &d.outcome),
        Some(Outcome::Degraded(_))
    ));

    driver.host_mut().faults_mut().timers = false;
    let feed = driver.host_mut().insert(feed_spec());
    // The fallback trigger armed at boot fires at 5 s.
    let outcomes = outcomes_of(driver.advance(Duration::from_millis(1_500)));
    assert_eq!(
        outcomes,
        vec![Outcome::LocateRetryScheduled {
            attempt: 2,
            delay: Duration::from_secs(1),
        }]
    );
    driver.advance(Duration::from_secs(1));
    assert_eq!(driver.controller().bound_node(), Some(&feed));
    assert_eq!(driver.host().now(), Duration::from_secs(6));
}

#[test]
fn conservative_profile_scans_tall_visible_divs() {
    let mut host = SimHost::new();
    // Would satisfy the aggressive selector pass.
    let _chat = host.insert(
        ElementSpec::div()
            .class("chat-messages")
            .size(200.0, 900.0)
            .overflow(Overflow::Auto)
            .with_children(),
    );
    let _hidden = host.insert(ElementSpec::scroll_box(800.0).hidden());
    let _section = host.insert(
        ElementSpec::tag("section")
            .size(700.0, 2_000.0)
            .overflow(Overflow::Scroll),
    );
    let feed = host.insert(ElementSpec::scroll_box(350.0));

    let mut driver = Driver::boot(FollowConfig::conservative(), host);
    driver.document_ready();
    driver.advance(Duration::from_millis(10_999));
    assert_eq!(driver.controller().bound_node(), None);
    driver.advance(Duration::from_millis(1));
    assert_eq!(driver.controller().bound_node(), Some(&feed));
}

// ===========================================================================
// 5. Degraded hosts
// ===========================================================================

#[test]
fn throwing_probe_excludes_only_that_candidate() {
    let mut host = SimHost::new();
    let broken = host.insert(ElementSpec::scroll_box(900.0));
    let healthy = host.insert(ElementSpec::scroll_box(300.0));
    host.fail_probe(broken);
    let (_, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, healthy);
}

#[test]
fn scroll_listener_failure_still_follows_growth() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    host.faults_mut().listen_scroll = true;
    let (mut driver, _) = bound_driver(FollowConfig::default(), host);
    assert_eq!(
        driver.controller().capabilities(),
        Some(Capabilities {
            scroll_tracking: false,
            growth_following: true,
        })
    );
    driver.append_content(feed, 300.0);
    assert_eq!(driver.host().scroll_writes(), &[(feed, 800.0)]);
}

#[test]
fn observer_failure_leaves_toggle_working() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    host.faults_mut().observe_mutations = true;
    let (mut driver, _) = bound_driver(FollowConfig::default(), host);
    assert_eq!(
        driver.controller().capabilities(),
        Some(Capabilities {
            scroll_tracking: true,
            growth_following: false,
        })
    );
    assert!(driver.append_content(feed, 300.0).is_empty());
    assert_eq!(outcomes_of(driver.toggle()), vec![Outcome::Paused]);
}

#[test]
fn unreadable_metrics_count_as_near_bottom() {
    let (mut driver, feed) = bound_feed();
    scroll_away(&mut driver, feed);
    assert_eq!(
        driver.controller().follow_state().map(|s| s.near_bottom),
        Some(false)
    );
    driver.host_mut().faults_mut().scroll_metrics = true;
    assert_eq!(
        driver.send(Signal::Scrolled).outcome,
        Outcome::NearBottomUpdated(true)
    );
}

#[test]
fn refused_frame_request_lets_the_next_batch_retry() {
    let (mut driver, feed) = bound_feed();
    driver.host_mut().faults_mut().animation_frame = true;
    let outcomes = outcomes_of(driver.append_content(feed, 100.0));
    assert!(matches!(outcomes.as_slice(), [Outcome::Degraded(_)]));

    driver.host_mut().faults_mut().animation_frame = false;
    let outcomes = outcomes_of(driver.append_content(feed, 100.0));
    assert_eq!(
        outcomes.first(),
        Some(&Outcome::FollowScheduled {
            from: 600.0,
            to: 700.0
        })
    );
}

#[test]
fn frozen_markers_do_not_block_startup() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    host.faults_mut().markers = true;
    let (_, node) = bound_driver(FollowConfig::default(), host);
    assert_eq!(node, feed);
}

#[test]
fn invalid_config_falls_back_to_defaults() {
    let config = FollowConfig {
        near_bottom_threshold_px: -1.0,
        ..FollowConfig::conservative()
    };
    let driver = Driver::boot(config, SimHost::new());
    assert_eq!(driver.controller().config(), &FollowConfig::default());
}

// ===========================================================================
// 6. Disabled controllers
// ===========================================================================

#[test]
fn no_document_logs_once_and_schedules_nothing() {
    let (driver, events) =
        with_captured_events(|| Driver::boot(FollowConfig::default(), SimHost::unavailable()));

    assert_eq!(
        driver.state(),
        ControllerState::Disabled(DisabledReason::EnvironmentUnavailable)
    );
    assert!(driver.host().pending_timers().is_empty());

    let infos: Vec<_> = events
        .iter()
        .filter(|e| e.level <= tracing::Level::INFO)
        .collect();
    assert_eq!(infos.len(), 1, "{events:?}");
    assert_eq!(infos[0].target, "feedfollow.guard");
    assert!(infos[0].fields.contains_key("message"));
}

#[test]
fn disabled_controller_ignores_every_signal() {
    let mut driver = Driver::boot(FollowConfig::default(), SimHost::unavailable());
    for signal in [
        Signal::DocumentReady,
        Signal::WindowLoaded,
        Signal::TogglePressed,
        Signal::Mutated,
    ] {
        assert_eq!(
            driver.send(signal).outcome,
            Outcome::Ignored(IgnoredReason::Disabled)
        );
    }
    assert!(driver.host().pending_timers().is_empty());
}

#[test]
fn second_injection_is_disabled() {
    let (first, feed) = bound_feed();
    let host = first.host().clone();

    let second = Driver::boot(FollowConfig::default(), host);
    assert_eq!(
        second.state(),
        ControllerState::Disabled(DisabledReason::AlreadyInjected)
    );
    assert_eq!(
        second.outcomes(),
        vec![Outcome::Disabled(DisabledReason::AlreadyInjected)]
    );
    // Only the first controller's observers exist.
    assert!(second.host().is_observed(feed));
    assert_eq!(second.host().observer_registrations(), 1);
    assert_eq!(second.host().pending_timers(), first.host().pending_timers());
}

#[test]
fn injection_during_trigger_delay_is_disabled() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    host.insert(ElementSpec::scroll_box(300.0).class("messages"));
    let mut first = Driver::boot(FollowConfig::default(), host);
    first.document_ready();
    assert_eq!(first.state(), ControllerState::Unbound);
    assert!(first.host().has_marker(InjectionMarker::Started));

    let timers_before = first.host().pending_timers().len();
    let (second, dispatch) = Controller::boot(FollowConfig::conservative(), first.host_mut());
    assert_eq!(
        dispatch.outcome,
        Outcome::Disabled(DisabledReason::AlreadyInjected)
    );
    assert_eq!(
        second.state(),
        ControllerState::Disabled(DisabledReason::AlreadyInjected)
    );
    assert_eq!(first.host().pending_timers().len(), timers_before);

    assert_eq!(first.run_until_bound(Duration::from_secs(30)), Some(feed));
    assert!(second.bound_node().is_none());
    assert_eq!(first.host().observer_registrations(), 1);
    assert_eq!(first.host().listener_registrations(), 1);
}

#[test]
fn container_claimed_by_another_controller_is_left_alone() {
    let mut host = SimHost::new();
    let feed = host.insert(feed_spec());
    host.pre_bind(feed);
    let mut driver = Driver::boot(FollowConfig::default(), host);
    driver.document_ready();
    driver.advance(Duration::from_secs(10));

    assert!(driver
        .outcomes()
        .contains(&Outcome::Ignored(IgnoredReason::AlreadyBound)));
    assert_eq!(
        driver.state(),
        ControllerState::Disabled(DisabledReason::AlreadyInjected)
    );
    assert!(!driver.host().is_observed(feed));
}
