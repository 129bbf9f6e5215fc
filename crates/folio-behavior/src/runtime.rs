//! Headless page runtime.
//!
//! [`Page`] plays the role of the browser window for the behaviour
//! components: it owns the document and viewport, keeps the listener
//! registry, dispatches events along the ancestor chain, runs timers on a
//! virtual clock and evaluates intersection observers whenever layout or
//! scroll position may have changed.
//!
//! Handlers receive `&mut Page`, so a handler may mutate the document,
//! register further listeners or schedule timers. Listeners removed while an
//! event is being dispatched are not invoked for the remainder of that
//! dispatch.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use folio_dom::{parse_html, Document, HtmlError, NodeId, Rect};

use crate::observer::{IntersectionEntry, ObserverId, ObserverOptions, Observers};

/// Something that can receive events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Document,
    Node(NodeId),
}

/// Kinds of events the runtime dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyDown,
    Scroll,
    Resize,
    Load,
    DomContentLoaded,
}

impl EventKind {
    /// Whether the event propagates from its target up to the window.
    pub fn bubbles(self) -> bool {
        matches!(
            self,
            EventKind::Click | EventKind::KeyDown | EventKind::DomContentLoaded
        )
    }
}

/// An event being dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    target: EventTarget,
    current_target: EventTarget,
    key: Option<String>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(kind: EventKind, target: EventTarget) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            key: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// A key press delivered to the document.
    pub fn key_down(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::new(EventKind::KeyDown, EventTarget::Document)
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> EventTarget {
        self.target
    }

    /// The target whose listeners are currently running.
    pub fn current_target(&self) -> EventTarget {
        self.current_target
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Suppress the default action, such as following a link.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

/// Handle to a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

type Handler = Rc<dyn Fn(&mut Page, &mut Event)>;

struct Listener {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    handler: Handler,
}

struct Timer {
    id: TimerId,
    due: Duration,
    callback: Box<dyn FnOnce(&mut Page)>,
}

/// Loading phase of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

/// Visible area of the page in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            scroll_y: 0.0,
            width,
            height,
        }
    }

    /// The viewport in client coordinates.
    pub fn client_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Capabilities of the simulated browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub intersection_observer: bool,
    pub touch_events: bool,
    pub max_touch_points: u32,
}

impl Environment {
    pub fn supports_touch(&self) -> bool {
        self.touch_events || self.max_touch_points > 0
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            intersection_observer: true,
            touch_events: false,
            max_touch_points: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

/// A programmatic window scroll request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollToOptions {
    pub top: f64,
    pub behavior: ScrollBehavior,
}

/// A loaded page: document, viewport, listeners, timers and observers.
pub struct Page {
    document: Document,
    viewport: Viewport,
    environment: Environment,
    ready_state: ReadyState,
    listeners: Vec<Listener>,
    timers: Vec<Timer>,
    observers: Observers,
    scroll_requests: Vec<ScrollToOptions>,
    state: HashMap<TypeId, Box<dyn Any>>,
    now: Duration,
    next_id: u64,
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            viewport: Viewport::default(),
            environment: Environment::default(),
            ready_state: ReadyState::default(),
            listeners: Vec::new(),
            timers: Vec::new(),
            observers: Observers::default(),
            scroll_requests: Vec::new(),
            state: HashMap::new(),
            now: Duration::ZERO,
            next_id: 0,
        }
    }

    /// Parse `source` into a page that is still loading.
    pub fn from_html(source: &str) -> Result<Self, HtmlError> {
        Ok(Self::new(parse_html(source)?))
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_ready_state(mut self, ready_state: ReadyState) -> Self {
        self.ready_state = ready_state;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_y(&self) -> f64 {
        self.viewport.scroll_y
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn supports_intersection(&self) -> bool {
        self.environment.intersection_observer
    }

    /// Current time on the virtual clock.
    pub fn now(&self) -> Duration {
        self.now
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ------------------------------------------------------------------
    // Listeners and dispatch
    // ------------------------------------------------------------------

    /// Register `handler` for `kind` events reaching `target`.
    pub fn listen<F>(&mut self, target: EventTarget, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&mut Page, &mut Event) + 'static,
    {
        let id = ListenerId(self.next_id());
        self.listeners.push(Listener {
            id,
            target,
            kind,
            handler: Rc::new(handler),
        });
        id
    }

    /// Remove a listener. Returns false if it was already removed.
    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of listeners for `kind` registered directly on `target`.
    pub fn listeners_on(&self, target: EventTarget, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|listener| listener.target == target && listener.kind == kind)
            .count()
    }

    /// Dispatch an event and deliver any intersection changes it caused.
    pub fn dispatch(&mut self, mut event: Event) -> Event {
        for current in self.propagation_path(event.target, event.kind) {
            event.current_target = current;

            let handlers: Vec<(ListenerId, Handler)> = self
                .listeners
                .iter()
                .filter(|listener| listener.target == current && listener.kind == event.kind)
                .map(|listener| (listener.id, Rc::clone(&listener.handler)))
                .collect();

            for (id, handler) in handlers {
                if self.listeners.iter().any(|listener| listener.id == id) {
                    handler(self, &mut event);
                }
            }

            if event.propagation_stopped {
                break;
            }
        }

        self.flush();
        event
    }

    fn propagation_path(&self, target: EventTarget, kind: EventKind) -> Vec<EventTarget> {
        let mut path = vec![target];
        if !kind.bubbles() {
            return path;
        }

        if let EventTarget::Node(node) = target {
            path.extend(
                self.document
                    .ancestors(node)
                    .filter(|&ancestor| self.document.is_element(ancestor))
                    .map(EventTarget::Node),
            );
            if self.document.is_connected(node) {
                path.push(EventTarget::Document);
            }
        }
        if matches!(path.last(), Some(EventTarget::Document)) {
            path.push(EventTarget::Window);
        }
        path
    }

    /// Click an element.
    pub fn click(&mut self, node: NodeId) -> Event {
        self.dispatch(Event::new(EventKind::Click, EventTarget::Node(node)))
    }

    /// Press a key while the document has focus.
    pub fn key_down(&mut self, key: &str) -> Event {
        self.dispatch(Event::key_down(key))
    }

    /// Scroll the window to `y` and fire a scroll event.
    pub fn scroll_to_y(&mut self, y: f64) {
        self.viewport.scroll_y = y.max(0.0);
        self.dispatch(Event::new(EventKind::Scroll, EventTarget::Window));
    }

    /// Resize the viewport and fire a resize event.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.dispatch(Event::new(EventKind::Resize, EventTarget::Window));
    }

    /// Finish parsing: the document becomes interactive.
    pub fn dom_content_loaded(&mut self) {
        self.ready_state = ReadyState::Interactive;
        self.dispatch(Event::new(
            EventKind::DomContentLoaded,
            EventTarget::Document,
        ));
    }

    /// Finish loading every resource.
    pub fn load(&mut self) {
        if self.ready_state == ReadyState::Loading {
            self.dom_content_loaded();
        }
        self.ready_state = ReadyState::Complete;
        self.dispatch(Event::new(EventKind::Load, EventTarget::Window));
    }

    // ------------------------------------------------------------------
    // Scrolling and geometry
    // ------------------------------------------------------------------

    /// Scroll the window as `window.scrollTo` would.
    ///
    /// Smooth scrolling completes immediately; the request is recorded so
    /// callers can inspect what was asked for.
    pub fn window_scroll_to(&mut self, options: ScrollToOptions) {
        self.scroll_requests.push(options);
        self.scroll_to_y(options.top);
    }

    /// Scroll requests made through [`Page::window_scroll_to`], oldest first.
    pub fn scroll_requests(&self) -> &[ScrollToOptions] {
        &self.scroll_requests
    }

    /// Layout box of `node` relative to the viewport.
    ///
    /// Elements without layout report an empty box at the viewport origin.
    pub fn bounding_client_rect(&self, node: NodeId) -> Rect {
        self.document
            .rect(node)
            .map(|rect| rect.translate(0.0, -self.viewport.scroll_y))
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Run `callback` once `delay` has elapsed on the virtual clock.
    pub fn set_timeout<F>(&mut self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce(&mut Page) + 'static,
    {
        let id = TimerId(self.next_id());
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            callback: Box::new(callback),
        });
        id
    }

    /// Cancel a pending timer. Returns false if it already ran or was cancelled.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Move the clock forward, running due timers in order.
    pub fn advance(&mut self, duration: Duration) {
        let deadline = self.now + duration;
        while let Some(index) = self.next_due(deadline) {
            let timer = self.timers.remove(index);
            self.now = timer.due;
            (timer.callback)(self);
        }
        self.now = deadline;
        self.flush();
    }

    fn next_due(&self, deadline: Duration) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)
    }

    // ------------------------------------------------------------------
    // Intersection observers
    // ------------------------------------------------------------------

    /// Create an intersection observer.
    ///
    /// The callback receives only the entries whose intersecting state
    /// changed since the previous evaluation. A newly observed target always
    /// reports its initial state.
    pub fn create_observer<F>(&mut self, options: ObserverOptions, callback: F) -> ObserverId
    where
        F: Fn(&mut Page, &[IntersectionEntry], ObserverId) + 'static,
    {
        self.observers.create(options, Rc::new(callback))
    }

    /// Watch `target`, delivering its initial state before returning.
    pub fn observe(&mut self, observer: ObserverId, target: NodeId) -> bool {
        if !self.observers.observe(observer, target) {
            return false;
        }
        self.deliver(observer);
        true
    }

    pub fn unobserve(&mut self, observer: ObserverId, target: NodeId) -> bool {
        self.observers.unobserve(observer, target)
    }

    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        self.observers.disconnect(observer)
    }

    /// Targets still watched by `observer`.
    pub fn observed_targets(&self, observer: ObserverId) -> Vec<NodeId> {
        self.observers.targets(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Evaluate every observer and deliver changed entries.
    pub fn flush(&mut self) {
        for id in self.observers.ids() {
            self.deliver(id);
        }
    }

    fn deliver(&mut self, id: ObserverId) {
        let collected = self
            .observers
            .collect(id, &self.document, &self.viewport);
        if let Some((callback, entries)) = collected {
            callback(self, &entries, id);
        }
    }

    /// Signal that element boxes moved; observers are re-evaluated.
    pub fn layout_changed(&mut self) {
        self.flush();
    }

    // ------------------------------------------------------------------
    // Shared state
    // ------------------------------------------------------------------

    /// Page-wide state slot for `T`, created on first use.
    pub fn state<T: Default + 'static>(&mut self) -> &mut T {
        self.state
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("state slot holds the type it is keyed by")
    }

    /// The state slot for `T` together with the document.
    pub fn state_and_document<T: Default + 'static>(&mut self) -> (&mut T, &mut Document) {
        let slot = self
            .state
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("state slot holds the type it is keyed by");
        (slot, &mut self.document)
    }

    pub fn peek_state<T: 'static>(&self) -> Option<&T> {
        self.state
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<T>())
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("viewport", &self.viewport)
            .field("environment", &self.environment)
            .field("ready_state", &self.ready_state)
            .field("listeners", &self.listeners.len())
            .field("timers", &self.timers.len())
            .field("observers", &self.observers.len())
            .field("now", &self.now)
            .finish()
    }
}

/// Listener and observer registrations owned by one component.
#[derive(Debug, Default)]
pub struct Subscriptions {
    listeners: Vec<ListenerId>,
    observers: Vec<ObserverId>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and remember it for release.
    pub fn listen<F>(
        &mut self,
        page: &mut Page,
        target: EventTarget,
        kind: EventKind,
        handler: F,
    ) -> ListenerId
    where
        F: Fn(&mut Page, &mut Event) + 'static,
    {
        let id = page.listen(target, kind, handler);
        self.listeners.push(id);
        id
    }

    pub fn track_observer(&mut self, observer: ObserverId) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.listeners.len() + self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every tracked listener and disconnect every tracked observer.
    pub fn release(&mut self, page: &mut Page) {
        for id in self.listeners.drain(..) {
            page.unlisten(id);
        }
        for id in self.observers.drain(..) {
            page.disconnect(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn page() -> Page {
        Page::from_html(r#"<div id="outer"><p id="inner"><a id="link" href="/">x</a></p></div>"#)
            .unwrap()
    }

    fn node(page: &Page, id: &str) -> NodeId {
        page.document().element_by_id(id).unwrap()
    }

    #[test]
    fn click_bubbles_to_ancestors_document_and_window() {
        let mut page = page();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (name, target) in [
            ("link", EventTarget::Node(node(&page, "link"))),
            ("outer", EventTarget::Node(node(&page, "outer"))),
            ("document", EventTarget::Document),
            ("window", EventTarget::Window),
        ] {
            let log = Rc::clone(&log);
            page.listen(target, EventKind::Click, move |_, event| {
                assert_eq!(event.current_target(), target);
                log.borrow_mut().push(name);
            });
        }

        let link = node(&page, "link");
        let event = page.click(link);

        assert_eq!(event.target(), EventTarget::Node(link));
        assert_eq!(*log.borrow(), vec!["link", "outer", "document", "window"]);
    }

    #[test]
    fn non_bubbling_events_stay_on_target() {
        let mut page = page();
        let count = Rc::new(RefCell::new(0));

        let seen = Rc::clone(&count);
        page.listen(EventTarget::Document, EventKind::Scroll, move |_, _| {
            *seen.borrow_mut() += 1;
        });

        page.scroll_to_y(200.0);
        assert_eq!(*count.borrow(), 0);
        assert_eq!(page.scroll_y(), 200.0);
    }

    #[test]
    fn stop_propagation_halts_bubbling() {
        let mut page = page();
        let reached = Rc::new(RefCell::new(false));
        let inner = node(&page, "inner");

        page.listen(EventTarget::Node(inner), EventKind::Click, |_, event| {
            event.stop_propagation();
        });
        let flag = Rc::clone(&reached);
        page.listen(EventTarget::Document, EventKind::Click, move |_, _| {
            *flag.borrow_mut() = true;
        });

        let link = node(&page, "link");
        page.click(link);
        assert!(!*reached.borrow());
    }

    #[test]
    fn listeners_removed_during_dispatch_do_not_run() {
        let mut page = page();
        let ran = Rc::new(RefCell::new(false));
        let second: Rc<RefCell<Option<ListenerId>>> = Rc::new(RefCell::new(None));

        let victim = Rc::clone(&second);
        page.listen(EventTarget::Window, EventKind::Resize, move |page, _| {
            if let Some(id) = *victim.borrow() {
                page.unlisten(id);
            }
        });
        let flag = Rc::clone(&ran);
        let id = page.listen(EventTarget::Window, EventKind::Resize, move |_, _| {
            *flag.borrow_mut() = true;
        });
        *second.borrow_mut() = Some(id);

        page.resize(800.0, 600.0);
        assert!(!*ran.borrow());
        assert_eq!(page.listener_count(), 1);
    }

    #[test]
    fn prevent_default_is_reported() {
        let mut page = page();
        let link = node(&page, "link");
        page.listen(EventTarget::Node(link), EventKind::Click, |_, event| {
            event.prevent_default();
        });

        assert!(page.click(link).default_prevented());
        let outer = node(&page, "outer");
        assert!(!page.click(outer).default_prevented());
    }

    #[test]
    fn timers_run_in_due_order() {
        let mut page = page();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let log = Rc::clone(&log);
            page.set_timeout(Duration::from_millis(delay), move |page| {
                log.borrow_mut().push((label, page.now().as_millis()));
            });
        }

        page.advance(Duration::from_millis(25));
        assert_eq!(*log.borrow(), vec![("a", 10), ("a2", 10), ("b", 20)]);
        assert_eq!(page.now(), Duration::from_millis(25));
        assert_eq!(page.pending_timers(), 1);

        page.advance(Duration::from_millis(5));
        assert_eq!(log.borrow().len(), 4);
    }

    #[test]
    fn cleared_timers_never_fire() {
        let mut page = page();
        let fired = Rc::new(RefCell::new(false));

        let flag = Rc::clone(&fired);
        let id = page.set_timeout(Duration::from_millis(5), move |_| {
            *flag.borrow_mut() = true;
        });

        assert!(page.clear_timeout(id));
        assert!(!page.clear_timeout(id));
        page.advance(Duration::from_secs(1));
        assert!(!*fired.borrow());
    }

    #[test]
    fn timers_scheduled_by_timers_run_in_the_same_advance() {
        let mut page = page();
        let fired = Rc::new(RefCell::new(false));

        let flag = Rc::clone(&fired);
        page.set_timeout(Duration::from_millis(10), move |page| {
            page.set_timeout(Duration::from_millis(10), move |_| {
                *flag.borrow_mut() = true;
            });
        });

        page.advance(Duration::from_millis(20));
        assert!(*fired.borrow());
    }

    #[test]
    fn load_passes_through_interactive() {
        let mut page = page();
        let log = Rc::new(RefCell::new(Vec::new()));

        let seen = Rc::clone(&log);
        page.listen(
            EventTarget::Document,
            EventKind::DomContentLoaded,
            move |page, _| seen.borrow_mut().push(page.ready_state()),
        );
        let seen = Rc::clone(&log);
        page.listen(EventTarget::Window, EventKind::Load, move |page, _| {
            seen.borrow_mut().push(page.ready_state())
        });

        page.load();
        assert_eq!(
            *log.borrow(),
            vec![ReadyState::Interactive, ReadyState::Complete]
        );
    }

    #[test]
    fn window_scroll_to_records_request_and_clamps_position() {
        let mut page = page();
        page.window_scroll_to(ScrollToOptions {
            top: -40.0,
            behavior: ScrollBehavior::Smooth,
        });

        assert_eq!(page.scroll_y(), 0.0);
        assert_eq!(page.scroll_requests()[0].top, -40.0);
    }

    #[test]
    fn bounding_client_rect_follows_scroll() {
        let mut page = page();
        let inner = node(&page, "inner");
        page.document_mut()
            .set_rect(inner, Rect::new(0.0, 500.0, 100.0, 20.0));

        page.scroll_to_y(120.0);
        assert_eq!(page.bounding_client_rect(inner).top(), 380.0);

        let outer = node(&page, "outer");
        assert_eq!(page.bounding_client_rect(outer), Rect::default());
    }

    #[test]
    fn state_slots_are_per_type() {
        #[derive(Default)]
        struct Counter(u32);

        let mut page = page();
        assert!(page.peek_state::<Counter>().is_none());

        page.state::<Counter>().0 += 2;
        page.state::<Counter>().0 += 1;
        *page.state::<String>() = "x".to_string();

        assert_eq!(page.peek_state::<Counter>().map(|c| c.0), Some(3));
        assert_eq!(page.peek_state::<String>().map(String::as_str), Some("x"));
    }

    #[test]
    fn subscriptions_release_everything_they_track() {
        let mut page = page();
        let mut subscriptions = Subscriptions::new();

        subscriptions.listen(&mut page, EventTarget::Window, EventKind::Scroll, |_, _| {});
        subscriptions.listen(&mut page, EventTarget::Document, EventKind::Click, |_, _| {});
        let observer = page.create_observer(ObserverOptions::default(), |_, _, _| {});
        subscriptions.track_observer(observer);
        page.listen(EventTarget::Window, EventKind::Resize, |_, _| {});

        assert_eq!(subscriptions.len(), 3);
        subscriptions.release(&mut page);

        assert!(subscriptions.is_empty());
        assert_eq!(page.listener_count(), 1);
        assert_eq!(page.observer_count(), 0);
    }
}
