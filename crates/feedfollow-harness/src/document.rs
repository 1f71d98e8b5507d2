#![forbid(unsafe_code)]

//! In-memory document with a virtual clock.
//!
//! [`SimHost`] implements every host trait the controller needs. Elements are
//! described with [`ElementSpec`]; callbacks the host owes the controller
//! (timers, animation frames, scroll events, mutation batches) are queued and
//! released by the [`Driver`](crate::driver::Driver).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use feedfollow_core::error::HostError;
use feedfollow_core::host::{FeedDocument, FeedObservers, FeedScheduler, InjectionMarker, Wake};
use feedfollow_core::probe::{ElementProbe, Overflow, ScrollMetrics};

use crate::selector::{Attributes, Selector};

/// Handle to a simulated element. Ids follow document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimNodeId(pub usize);

/// Static description of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub client_height: f64,
    pub scroll_height: f64,
    pub overflow_y: Overflow,
    pub has_block_children: bool,
    pub visible: bool,
}

impl ElementSpec {
    /// A `div` with no content.
    #[must_use]
    pub fn div() -> Self {
        Self::tag("div")
    }

    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            client_height: 0.0,
            scroll_height: 0.0,
            overflow_y: Overflow::Visible,
            has_block_children: false,
            visible: true,
        }
    }

    /// A visible `overflow-y: auto` box with block children whose content
    /// is three times its height.
    #[must_use]
    pub fn scroll_box(client_height: f64) -> Self {
        Self::div()
            .size(client_height, client_height * 3.0)
            .overflow(Overflow::Auto)
            .with_children()
    }

    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_owned());
        self
    }

    #[must_use]
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_owned());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub fn size(mut self, client_height: f64, scroll_height: f64) -> Self {
        self.client_height = client_height;
        self.scroll_height = scroll_height;
        self
    }

    #[must_use]
    pub fn overflow(mut self, overflow_y: Overflow) -> Self {
        self.overflow_y = overflow_y;
        self
    }

    #[must_use]
    pub fn with_children(mut self) -> Self {
        self.has_block_children = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[derive(Debug, Clone)]
struct SimElement {
    spec: ElementSpec,
    attrs: BTreeMap<String, String>,
    scroll_top: f64,
    bound: bool,
    probe_fails: bool,
}

impl SimElement {
    fn new(spec: ElementSpec) -> Self {
        let mut attrs = spec.attrs.clone();
        if let Some(id) = &spec.id {
            attrs.insert("id".to_owned(), id.clone());
        }
        if !spec.classes.is_empty() {
            attrs.insert("class".to_owned(), spec.classes.join(" "));
        }
        Self {
            spec,
            attrs,
            scroll_top: 0.0,
            bound: false,
            probe_fails: false,
        }
    }

    fn max_scroll_top(&self) -> f64 {
        (self.spec.scroll_height - self.spec.client_height).max(0.0)
    }
}

/// Host calls that should fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    pub listen_scroll: bool,
    pub observe_mutations: bool,
    pub animation_frame: bool,
    pub scroll_metrics: bool,
    pub scroll_write: bool,
    pub markers: bool,
    pub timers: bool,
}

/// A scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub due: Duration,
    pub seq: u64,
    pub wake: Wake,
}

/// Simulated browser document plus event loop bookkeeping.
#[derive(Debug, Clone)]
pub struct SimHost {
    available: bool,
    elements: Vec<SimElement>,
    markers: BTreeSet<&'static str>,
    now: Duration,
    next_seq: u64,
    timers: Vec<PendingTimer>,
    frame_requested: bool,
    frame_requests: u32,
    scroll_listeners: BTreeSet<SimNodeId>,
    mutation_observers: BTreeSet<SimNodeId>,
    pending_mutation: bool,
    pending_scroll: bool,
    scroll_writes: Vec<(SimNodeId, f64)>,
    observer_registrations: u32,
    listener_registrations: u32,
    faults: Faults,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// An empty, available document at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: true,
            elements: Vec::new(),
            markers: BTreeSet::new(),
            now: Duration::ZERO,
            next_seq: 0,
            timers: Vec::new(),
            frame_requested: false,
            frame_requests: 0,
            scroll_listeners: BTreeSet::new(),
            mutation_observers: BTreeSet::new(),
            pending_mutation: false,
            pending_scroll: false,
            scroll_writes: Vec::new(),
            observer_registrations: 0,
            listener_registrations: 0,
            faults: Faults::default(),
        }
    }

    /// A context with no document at all.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Append an element in document order.
    pub fn insert(&mut self, spec: ElementSpec) -> SimNodeId {
        self.elements.push(SimElement::new(spec));
        SimNodeId(self.elements.len() - 1)
    }

    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// Make reading `node`'s style throw.
    pub fn fail_probe(&mut self, node: SimNodeId) {
        if let Some(el) = self.elements.get_mut(node.0) {
            el.probe_fails = true;
        }
    }

    /// Pretend another controller already claimed `node`.
    pub fn pre_bind(&mut self, node: SimNodeId) {
        if let Some(el) = self.elements.get_mut(node.0) {
            el.bound = true;
        }
    }

    /// Publish a marker as an earlier injection would have.
    pub fn preset_marker(&mut self, marker: InjectionMarker) {
        self.markers.insert(marker.property());
    }

    #[must_use]
    pub fn has_marker(&self, marker: InjectionMarker) -> bool {
        self.markers.contains(marker.property())
    }

    /// Grow `node`'s content by `px`. Queues a mutation batch when observed.
    pub fn append_content(&mut self, node: SimNodeId, px: f64) {
        if let Some(el) = self.elements.get_mut(node.0) {
            el.spec.scroll_height += px;
            if self.mutation_observers.contains(&node) {
                self.pending_mutation = true;
            }
        }
    }

    /// Change `node`'s content to exactly `scroll_height`.
    pub fn set_content_height(&mut self, node: SimNodeId, scroll_height: f64) {
        if let Some(el) = self.elements.get_mut(node.0) {
            el.spec.scroll_height = scroll_height;
            el.scroll_top = el.scroll_top.min(el.max_scroll_top());
            if self.mutation_observers.contains(&node) {
                self.pending_mutation = true;
            }
        }
    }

    /// A user scroll gesture.
    pub fn user_scroll_to(&mut self, node: SimNodeId, scroll_top: f64) {
        self.write_scroll_top(node, scroll_top);
    }

    /// Scroll `node` to its very bottom as a user would.
    pub fn user_scroll_to_bottom(&mut self, node: SimNodeId) {
        let top = self.element(node).map_or(0.0, SimElement::max_scroll_top);
        self.write_scroll_top(node, top);
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn scroll_top(&self, node: SimNodeId) -> Option<f64> {
        self.element(node).map(|el| el.scroll_top)
    }

    #[must_use]
    pub fn scroll_height(&self, node: SimNodeId) -> Option<f64> {
        self.element(node).map(|el| el.spec.scroll_height)
    }

    /// Raw values the controller wrote to `scrollTop`, in order.
    #[must_use]
    pub fn scroll_writes(&self) -> &[(SimNodeId, f64)] {
        &self.scroll_writes
    }

    #[must_use]
    pub fn pending_timers(&self) -> &[PendingTimer] {
        &self.timers
    }

    /// Total animation frames requested so far.
    #[must_use]
    pub fn frame_requests(&self) -> u32 {
        self.frame_requests
    }

    /// Successful `observe_mutations` calls, duplicates included.
    #[must_use]
    pub fn observer_registrations(&self) -> u32 {
        self.observer_registrations
    }

    /// Successful `listen_scroll` calls, duplicates included.
    #[must_use]
    pub fn listener_registrations(&self) -> u32 {
        self.listener_registrations
    }

    #[must_use]
    pub fn is_listening(&self, node: SimNodeId) -> bool {
        self.scroll_listeners.contains(&node)
    }

    #[must_use]
    pub fn is_observed(&self, node: SimNodeId) -> bool {
        self.mutation_observers.contains(&node)
    }

    #[must_use]
    pub fn is_marked_bound(&self, node: SimNodeId) -> bool {
        self.element(node).is_some_and(|el| el.bound)
    }

    pub(crate) fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Remove and return the earliest timer due at or before `deadline`.
    /// Timers with the same due time fire in scheduling order.
    pub(crate) fn pop_due_timer(&mut self, deadline: Duration) -> Option<PendingTimer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= deadline)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(index))
    }

    pub(crate) fn take_mutation(&mut self) -> bool {
        std::mem::take(&mut self.pending_mutation)
    }

    pub(crate) fn take_scroll(&mut self) -> bool {
        std::mem::take(&mut self.pending_scroll)
    }

    pub(crate) fn take_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    fn element(&self, node: SimNodeId) -> Option<&SimElement> {
        self.elements.get(node.0)
    }

    fn element_or_err(&self, node: SimNodeId) -> Result<&SimElement, HostError> {
        self.element(node)
            .ok_or_else(|| HostError::Probe(format!("node {} detached", node.0)))
    }

    fn write_scroll_top(&mut self, node: SimNodeId, scroll_top: f64) {
        let listening = self.scroll_listeners.contains(&node);
        if let Some(el) = self.elements.get_mut(node.0) {
            let clamped = scroll_top.clamp(0.0, el.max_scroll_top());
            if clamped != el.scroll_top {
                el.scroll_top = clamped;
                if listening {
                    self.pending_scroll = true;
                }
            }
        }
    }
}

impl FeedDocument for SimHost {
    type Node = SimNodeId;

    fn is_available(&self) -> bool {
        self.available
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<SimNodeId>, HostError> {
        if !self.available {
            return Err(HostError::Unavailable);
        }
        let parsed = Selector::parse(selector).map_err(|reason| HostError::Query {
            selector: selector.to_owned(),
            reason,
        })?;
        Ok(self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| {
                parsed.matches(&Attributes {
                    tag: &el.spec.tag,
                    classes: &el.spec.classes,
                    attrs: &el.attrs,
                })
            })
            .map(|(i, _)| SimNodeId(i))
            .collect())
    }

    fn probe(&self, node: &SimNodeId) -> Result<ElementProbe, HostError> {
        let el = self.element_or_err(*node)?;
        if el.probe_fails {
            return Err(HostError::Probe("getComputedStyle threw".into()));
        }
        Ok(ElementProbe {
            client_height: el.spec.client_height,
            scroll_height: el.spec.scroll_height,
            overflow_y: el.spec.overflow_y,
            has_block_children: el.spec.has_block_children,
            visible: el.spec.visible,
        })
    }

    fn scroll_metrics(&self, node: &SimNodeId) -> Result<ScrollMetrics, HostError> {
        if self.faults.scroll_metrics {
            return Err(HostError::Metrics("layout unavailable".into()));
        }
        let el = self.element_or_err(*node)?;
        Ok(ScrollMetrics {
            scroll_height: el.spec.scroll_height,
            scroll_top: el.scroll_top,
            client_height: el.spec.client_height,
        })
    }

    fn set_scroll_top(&mut self, node: &SimNodeId, scroll_top: f64) -> Result<(), HostError> {
        if self.faults.scroll_write {
            return Err(HostError::Write("scrollTop is read-only".into()));
        }
        self.element_or_err(*node)?;
        self.scroll_writes.push((*node, scroll_top));
        self.write_scroll_top(*node, scroll_top);
        Ok(())
    }

    fn is_bound(&self, node: &SimNodeId) -> bool {
        self.is_marked_bound(*node)
    }

    fn mark_bound(&mut self, node: &SimNodeId) -> Result<(), HostError> {
        match self.elements.get_mut(node.0) {
            Some(el) => {
                el.bound = true;
                Ok(())
            }
            None => Err(HostError::Marker(format!("node {} detached", node.0))),
        }
    }

    fn marker(&self, marker: InjectionMarker) -> Result<bool, HostError> {
        if self.faults.markers {
            return Err(HostError::Marker("global is frozen".into()));
        }
        Ok(self.has_marker(marker))
    }

    fn set_marker(&mut self, marker: InjectionMarker) -> Result<(), HostError> {
        if self.faults.markers {
            return Err(HostError::Marker("global is frozen".into()));
        }
        self.markers.insert(marker.property());
        Ok(())
    }

    fn describe(&self, node: &SimNodeId) -> String {
        match self.element(*node) {
            Some(el) if !el.spec.classes.is_empty() => el.spec.classes.join(" "),
            Some(SimElement {
                spec: ElementSpec { id: Some(id), .. },
                ..
            }) if !id.is_empty() => id.clone(),
            _ => "unnamed element".to_owned(),
        }
    }
}

impl FeedScheduler for SimHost {
    fn set_timeout(&mut self, delay: Duration, wake: Wake) -> Result<(), HostError> {
        if !self.available {
            return Err(HostError::Schedule("no event loop".into()));
        }
        if self.faults.timers {
            return Err(HostError::Schedule("setTimeout refused".into()));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(PendingTimer {
            due: self.now + delay,
            seq,
            wake,
        });
        Ok(())
    }

    fn request_animation_frame(&mut self) -> Result<(), HostError> {
        if self.faults.animation_frame {
            return Err(HostError::Schedule("requestAnimationFrame missing".into()));
        }
        self.frame_requested = true;
        self.frame_requests += 1;
        Ok(())
    }
}

impl FeedObservers for SimHost {
    fn observe_mutations(&mut self, node: &SimNodeId) -> Result<(), HostError> {
        if self.faults.observe_mutations {
            return Err(HostError::Registration {
                what: "mutation observer",
                reason: "MutationObserver is not defined".into(),
            });
        }
        self.element_or_err(*node)?;
        self.mutation_observers.insert(*node);
        self.observer_registrations += 1;
        Ok(())
    }

    fn listen_scroll(&mut self, node: &SimNodeId) -> Result<(), HostError> {
        if self.faults.listen_scroll {
            return Err(HostError::Registration {
                what: "scroll listener",
                reason: "addEventListener threw".into(),
            });
        }
        self.element_or_err(*node)?;
        self.scroll_listeners.insert(*node);
        self.listener_registrations += 1;
        Ok(())
    }
}
