#![forbid(unsafe_code)]

//! `wasm-bindgen` exports and the DOM host.
//!
//! Every browser callback (timers, animation frames, scroll events, mutation
//! batches, lifecycle events, the toggle chord, indicator clicks) pushes a
//! [`Signal`] onto one FIFO queue and then pumps it. The pump is the only
//! place that touches the controller; a callback that arrives while the pump
//! is running just leaves its signal for the running pump to pick up.
//!
//! Only compiled on `wasm32` targets.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

use feedfollow_core::controller::{Controller, ControllerState, Outcome, Signal};
use feedfollow_core::error::HostError;
use feedfollow_core::host::{FeedDocument, FeedObservers, FeedScheduler, InjectionMarker, Wake};
use feedfollow_core::keys::KeyChord;
use feedfollow_core::probe::{ElementProbe, Overflow, ScrollMetrics};
use js_sys::Reflect;
use tracing::Level;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, HtmlElement, KeyboardEvent, MutationObserver, MutationObserverInit,
    Window,
};

use crate::boot_config;
use crate::console_log::{self, ConsoleSink};
use crate::indicator::{INDICATOR_CSS, INDICATOR_ELEMENT_ID, IndicatorModel};
use crate::keys::DomKey;
use crate::state_label;

/// Property set on a bound container element.
const BOUND_ELEMENT_PROPERTY: &str = "__feedfollowBound";

thread_local! {
    /// Keeps the running instance alive for the lifetime of the page.
    static ACTIVE: RefCell<Option<Rc<Shared>>> = const { RefCell::new(None) };
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct BrowserConsole;

impl ConsoleSink for BrowserConsole {
    fn emit(&self, level: Level, line: &str) {
        let line = JsValue::from_str(line);
        match level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            _ => web_sys::console::debug_1(&line),
        }
    }
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "{} panic at {}:{}:{}: {info}",
                    console_log::LOG_PREFIX,
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("{} panic: {info}", console_log::LOG_PREFIX)
            };
            web_sys::console::error_1(&JsValue::from_str(&msg));
        }));
    });
}

fn install_subscriber(directive: &str) {
    // A second boot in the same instance keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(console_log::subscriber(BrowserConsole, directive));
}

fn js_reason(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

// ---------------------------------------------------------------------------
// Signal queue
// ---------------------------------------------------------------------------

struct Runtime {
    controller: Controller<Element>,
    host: DomHost,
}

struct IndicatorView {
    element: HtmlElement,
    model: IndicatorModel,
}

impl IndicatorView {
    fn render(&self) {
        self.element.set_text_content(Some(self.model.label()));
        self.element.set_title(self.model.title());
        if let Err(err) = self
            .element
            .style()
            .set_property("opacity", &self.model.opacity().to_string())
        {
            tracing::debug!(target: "feedfollow.web", error = %js_reason(&err), "indicator opacity not set");
        }
    }
}

struct Shared {
    queue: RefCell<VecDeque<Signal>>,
    runtime: RefCell<Option<Runtime>>,
    indicator: RefCell<Option<IndicatorView>>,
    chord_installed: Cell<bool>,
}

impl Shared {
    fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            runtime: RefCell::new(None),
            indicator: RefCell::new(None),
            chord_installed: Cell::new(false),
        }
    }

    fn next_signal(&self) -> Option<Signal> {
        self.queue.borrow_mut().pop_front()
    }

    /// Drain the queue through the controller.
    fn pump(self: &Rc<Self>) {
        let Ok(mut slot) = self.runtime.try_borrow_mut() else {
            return;
        };
        let Some(runtime) = slot.as_mut() else {
            return;
        };
        while let Some(signal) = self.next_signal() {
            let dispatch = runtime.controller.handle(&mut runtime.host, signal);
            if matches!(dispatch.outcome, Outcome::Bound { .. }) {
                self.on_bound(runtime);
            }
            self.sync_indicator(runtime);
        }
    }

    fn on_bound(self: &Rc<Self>, runtime: &Runtime) {
        let config = runtime.controller.config();
        let Some(document) = runtime.host.document.as_ref() else {
            return;
        };
        if !self.chord_installed.replace(true) {
            install_chord_listener(document, Rc::downgrade(self), config.toggle_chord.clone());
        }
        if config.indicator.enabled && self.indicator.borrow().is_none() {
            match create_indicator(document, Rc::downgrade(self), &config.toggle_chord) {
                Ok(view) => {
                    view.render();
                    *self.indicator.borrow_mut() = Some(view);
                    if let Some(window) = runtime.host.window.as_ref() {
                        schedule_fade(window, Rc::downgrade(self), config.indicator.fade_after_ms);
                    }
                }
                Err(err) => {
                    tracing::warn!(target: "feedfollow.web", error = %err, "status indicator unavailable");
                }
            }
        }
    }

    fn sync_indicator(&self, runtime: &Runtime) {
        let Some(state) = runtime.controller.indicator() else {
            return;
        };
        let Ok(mut slot) = self.indicator.try_borrow_mut() else {
            return;
        };
        if let Some(view) = slot.as_mut()
            && view.model.set_paused(state.paused)
        {
            view.render();
        }
    }

    fn with_indicator(&self, f: impl FnOnce(&mut IndicatorView)) {
        if let Ok(mut slot) = self.indicator.try_borrow_mut()
            && let Some(view) = slot.as_mut()
        {
            f(view);
            view.render();
        }
    }
}

/// Queue `signal` and pump. A dropped instance swallows the signal.
fn deliver(shared: &Weak<Shared>, signal: Signal) {
    if let Some(shared) = shared.upgrade() {
        shared.queue.borrow_mut().push_back(signal);
        shared.pump();
    }
}

// ---------------------------------------------------------------------------
// DOM host
// ---------------------------------------------------------------------------

struct DomHost {
    window: Option<Window>,
    document: Option<Document>,
    shared: Weak<Shared>,
    observers: Vec<MutationObserver>,
}

impl DomHost {
    fn new(shared: Weak<Shared>) -> Self {
        let window = web_sys::window();
        let document = window.as_ref().and_then(Window::document);
        Self {
            window,
            document,
            shared,
            observers: Vec::new(),
        }
    }

    fn window(&self) -> Result<&Window, HostError> {
        self.window.as_ref().ok_or(HostError::Unavailable)
    }
}

impl FeedDocument for DomHost {
    type Node = Element;

    fn is_available(&self) -> bool {
        self.window.is_some() && self.document.is_some()
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, HostError> {
        let document = self.document.as_ref().ok_or(HostError::Unavailable)?;
        let list = document
            .query_selector_all(selector)
            .map_err(|err| HostError::Query {
                selector: selector.to_owned(),
                reason: js_reason(&err),
            })?;
        Ok((0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }

    fn probe(&self, node: &Element) -> Result<ElementProbe, HostError> {
        let style = self
            .window()?
            .get_computed_style(node)
            .map_err(|err| HostError::Probe(js_reason(&err)))?
            .ok_or_else(|| HostError::Probe("no computed style".into()))?;
        let property = |name: &str| {
            style
                .get_property_value(name)
                .map_err(|err| HostError::Probe(js_reason(&err)))
        };
        let overflow_y = Overflow::from_css(&property("overflow-y")?);
        let visible = property("display")? != "none" && property("visibility")? != "hidden";
        let has_block_children = node
            .query_selector("div, p")
            .map_err(|err| HostError::Probe(js_reason(&err)))?
            .is_some();
        Ok(ElementProbe {
            client_height: f64::from(node.client_height()),
            scroll_height: f64::from(node.scroll_height()),
            overflow_y,
            has_block_children,
            visible,
        })
    }

    fn scroll_metrics(&self, node: &Element) -> Result<ScrollMetrics, HostError> {
        if !node.is_connected() {
            return Err(HostError::Metrics("container detached".into()));
        }
        Ok(ScrollMetrics {
            scroll_height: f64::from(node.scroll_height()),
            scroll_top: f64::from(node.scroll_top()),
            client_height: f64::from(node.client_height()),
        })
    }

    fn set_scroll_top(&mut self, node: &Element, scroll_top: f64) -> Result<(), HostError> {
        if !scroll_top.is_finite() {
            return Err(HostError::Write(format!("non-finite scrollTop {scroll_top}")));
        }
        // The browser clamps to the scrollable range.
        node.set_scroll_top(scroll_top.round().clamp(0.0, f64::from(i32::MAX)) as i32);
        Ok(())
    }

    fn is_bound(&self, node: &Element) -> bool {
        Reflect::get(node, &JsValue::from_str(BOUND_ELEMENT_PROPERTY))
            .map(|v| v.is_truthy())
            .unwrap_or(false)
    }

    fn mark_bound(&mut self, node: &Element) -> Result<(), HostError> {
        Reflect::set(node, &JsValue::from_str(BOUND_ELEMENT_PROPERTY), &JsValue::TRUE)
            .map(drop)
            .map_err(|err| HostError::Marker(js_reason(&err)))
    }

    fn marker(&self, marker: InjectionMarker) -> Result<bool, HostError> {
        Reflect::get(self.window()?, &JsValue::from_str(marker.property()))
            .map(|v| v.is_truthy())
            .map_err(|err| HostError::Marker(js_reason(&err)))
    }

    fn set_marker(&mut self, marker: InjectionMarker) -> Result<(), HostError> {
        Reflect::set(self.window()?, &JsValue::from_str(marker.property()), &JsValue::TRUE)
            .map(drop)
            .map_err(|err| HostError::Marker(js_reason(&err)))
    }

    fn describe(&self, node: &Element) -> String {
        let class = node.class_name();
        if !class.trim().is_empty() {
            return class;
        }
        let id = node.id();
        if !id.is_empty() {
            return id;
        }
        "unnamed element".to_owned()
    }
}

impl FeedScheduler for DomHost {
    fn set_timeout(&mut self, delay: Duration, wake: Wake) -> Result<(), HostError> {
        let shared = self.shared.clone();
        let callback = Closure::once_into_js(move || deliver(&shared, Signal::Timer(wake)));
        let ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        self.window()?
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), ms)
            .map(drop)
            .map_err(|err| HostError::Schedule(js_reason(&err)))
    }

    fn request_animation_frame(&mut self) -> Result<(), HostError> {
        let shared = self.shared.clone();
        let callback = Closure::once_into_js(move |_ts: f64| deliver(&shared, Signal::AnimationFrame));
        self.window()?
            .request_animation_frame(callback.unchecked_ref())
            .map(drop)
            .map_err(|err| HostError::Schedule(js_reason(&err)))
    }
}

impl FeedObservers for DomHost {
    fn observe_mutations(&mut self, node: &Element) -> Result<(), HostError> {
        let registration = |err: JsValue| HostError::Registration {
            what: "mutation observer",
            reason: js_reason(&err),
        };
        let shared = self.shared.clone();
        let callback = Closure::wrap(Box::new(move |_records: js_sys::Array, _observer: MutationObserver| {
            deliver(&shared, Signal::Mutated);
        }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(registration)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_character_data(true);
        observer
            .observe_with_options(node, &init)
            .map_err(registration)?;
        callback.forget();
        self.observers.push(observer);
        Ok(())
    }

    fn listen_scroll(&mut self, node: &Element) -> Result<(), HostError> {
        let shared = self.shared.clone();
        let callback = Closure::wrap(Box::new(move |_event: Event| {
            deliver(&shared, Signal::Scrolled);
        }) as Box<dyn FnMut(Event)>);
        node.add_event_listener_with_callback("scroll", callback.as_ref().unchecked_ref())
            .map_err(|err| HostError::Registration {
                what: "scroll listener",
                reason: js_reason(&err),
            })?;
        callback.forget();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Page wiring
// ---------------------------------------------------------------------------

fn listen(
    target: &web_sys::EventTarget,
    event: &str,
    shared: Weak<Shared>,
    signal: Signal,
) -> Result<(), JsValue> {
    let callback = Closure::wrap(Box::new(move |_event: Event| {
        deliver(&shared, signal);
    }) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

/// Feed the document-ready and window-load triggers, either now (already
/// past that point) or from the corresponding event.
fn wire_lifecycle(window: &Window, document: &Document, shared: &Rc<Shared>) {
    let ready_state = document.ready_state();
    if ready_state == "loading" {
        if let Err(err) = listen(document, "DOMContentLoaded", Rc::downgrade(shared), Signal::DocumentReady) {
            tracing::warn!(target: "feedfollow.web", error = %js_reason(&err), "DOMContentLoaded listener failed");
        }
    } else {
        shared.queue.borrow_mut().push_back(Signal::DocumentReady);
    }
    if ready_state == "complete" {
        shared.queue.borrow_mut().push_back(Signal::WindowLoaded);
    } else if let Err(err) = listen(window, "load", Rc::downgrade(shared), Signal::WindowLoaded) {
        tracing::warn!(target: "feedfollow.web", error = %js_reason(&err), "load listener failed");
    }
}

fn install_chord_listener(document: &Document, shared: Weak<Shared>, chord: KeyChord) {
    let callback = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        let key = DomKey {
            code: event.code(),
            key: event.key(),
            ctrl: event.ctrl_key(),
            shift: event.shift_key(),
            alt: event.alt_key(),
            meta: event.meta_key(),
            repeat: event.repeat(),
        };
        if chord.matches(&key.to_press()) {
            event.prevent_default();
            deliver(&shared, Signal::TogglePressed);
        }
    }) as Box<dyn FnMut(KeyboardEvent)>);
    match document.add_event_listener_with_callback("keydown", callback.as_ref().unchecked_ref()) {
        Ok(()) => callback.forget(),
        Err(err) => {
            tracing::warn!(target: "feedfollow.web", error = %js_reason(&err), "toggle key unavailable");
        }
    }
}

fn create_indicator(
    document: &Document,
    shared: Weak<Shared>,
    chord: &KeyChord,
) -> Result<IndicatorView, String> {
    let element = document
        .create_element("div")
        .map_err(|err| js_reason(&err))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| "created element is not an HtmlElement".to_owned())?;
    element.set_id(INDICATOR_ELEMENT_ID);
    element.style().set_css_text(INDICATOR_CSS);

    listen(&element, "click", shared.clone(), Signal::TogglePressed).map_err(|err| js_reason(&err))?;
    for (event, inside) in [("mouseover", true), ("mouseout", false)] {
        let shared = shared.clone();
        let callback = Closure::wrap(Box::new(move |_event: Event| {
            if let Some(shared) = shared.upgrade() {
                shared.with_indicator(|view| view.model.hover(inside));
            }
        }) as Box<dyn FnMut(Event)>);
        element
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|err| js_reason(&err))?;
        callback.forget();
    }

    document
        .body()
        .ok_or_else(|| "document has no body".to_owned())?
        .append_child(&element)
        .map_err(|err| js_reason(&err))?;

    Ok(IndicatorView {
        element,
        model: IndicatorModel::new(chord),
    })
}

fn schedule_fade(window: &Window, shared: Weak<Shared>, after_ms: u64) {
    let callback = Closure::once_into_js(move || {
        if let Some(shared) = shared.upgrade() {
            shared.with_indicator(|view| view.model.fade());
        }
    });
    let ms = i32::try_from(after_ms).unwrap_or(i32::MAX);
    if let Err(err) =
        window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), ms)
    {
        tracing::debug!(target: "feedfollow.web", error = %js_reason(&err), "indicator fade not scheduled");
    }
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

/// Handle to the running controller.
#[wasm_bindgen]
pub struct FeedFollow {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl FeedFollow {
    /// Same as pressing the toggle chord.
    pub fn toggle(&self) {
        deliver(&Rc::downgrade(&self.shared), Signal::TogglePressed);
    }

    #[wasm_bindgen(js_name = isPaused)]
    pub fn is_paused(&self) -> bool {
        self.controller_state() == Some(ControllerState::Paused)
    }

    /// `"disabled"`, `"unbound"`, `"locating"`, `"following"` or `"paused"`.
    pub fn state(&self) -> String {
        self.controller_state()
            .map_or("busy", state_label)
            .to_owned()
    }
}

impl FeedFollow {
    fn controller_state(&self) -> Option<ControllerState> {
        let slot = self.shared.runtime.try_borrow().ok()?;
        slot.as_ref().map(|runtime| runtime.controller.state())
    }
}

/// Start following the page's feed container.
///
/// `config_json` is optional; see [`crate::boot_config`]. Calling `boot`
/// again in the same page returns a handle to the first instance.
#[wasm_bindgen]
pub fn boot(config_json: Option<String>) -> FeedFollow {
    install_panic_hook();

    if let Some(shared) = ACTIVE.with(|active| active.borrow().clone()) {
        tracing::info!(target: "feedfollow.web", "already running, returning existing handle");
        return FeedFollow { shared };
    }

    let (config, config_err) = boot_config::load(config_json.as_deref());
    install_subscriber(&config.log_level);
    if let Some(err) = config_err {
        tracing::warn!(target: "feedfollow.web", error = %err, "config rejected, using defaults");
    }

    let shared = Rc::new(Shared::new());
    let mut host = DomHost::new(Rc::downgrade(&shared));
    let (controller, _) = Controller::boot(config, &mut host);

    if !matches!(controller.state(), ControllerState::Disabled(_))
        && let (Some(window), Some(document)) = (host.window.clone(), host.document.clone())
    {
        wire_lifecycle(&window, &document, &shared);
    }

    *shared.runtime.borrow_mut() = Some(Runtime { controller, host });
    shared.pump();
    ACTIVE.with(|active| *active.borrow_mut() = Some(shared.clone()));
    FeedFollow { shared }
}
