//! Modal popups and the body scroll lock.
//!
//! A popup is a `.popup-container` element shown by a `[data-popup]` trigger
//! naming its id. While popups are open the body carries `overflow: hidden`;
//! the lock records which popups hold it and the overflow value it replaced,
//! and the configured [`ScrollLockPolicy`] decides when closing releases it.
//!
//! [`open_popup`] and [`close_popup`] serve markup that opens popups by id
//! without a mounted [`Popup`]; they take the same path as the component.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use folio_dom::{Document, NodeId};
use tracing::debug;

use crate::error::{compile, BehaviorError};
use crate::runtime::{Event, EventKind, EventTarget, Page, Subscriptions};
use crate::settings::{ScrollLockPolicy, Settings};
use crate::traits::Component;

const POPUP_CONTAINERS: &str = ".popup-container";
const POPUP_TRIGGERS: &str = "[data-popup]";
const CLOSE_BUTTONS: &str = ".close-button";
const VISIBLE_CLASS: &str = "is-visible";

/// Body scroll lock shared by every popup on a page.
///
/// Lives in the page's state slots so the component and the free functions
/// see the same lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollLock {
    policy: ScrollLockPolicy,
    open: BTreeSet<NodeId>,
    /// Body overflow replaced by the lock, present while engaged
    saved: Option<Option<String>>,
}

impl ScrollLock {
    pub fn policy(&self) -> ScrollLockPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ScrollLockPolicy) {
        self.policy = policy;
    }

    /// Whether the lock currently owns the body overflow.
    pub fn is_engaged(&self) -> bool {
        self.saved.is_some()
    }

    /// Popups opened and not yet closed.
    pub fn open_popups(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.open.iter().copied()
    }

    fn acquire(&mut self, doc: &mut Document, popup: NodeId) {
        let body = doc.body();
        if self.saved.is_none() {
            self.saved = Some(doc.style(body, "overflow").map(str::to_string));
        }
        self.open.insert(popup);
        doc.set_style(body, "overflow", "hidden");
    }

    fn release(&mut self, doc: &mut Document, popup: NodeId) {
        self.open.remove(&popup);
        if self.policy == ScrollLockPolicy::LastOpen && !self.open.is_empty() {
            return;
        }

        if let Some(previous) = self.saved.take() {
            let body = doc.body();
            doc.set_style(body, "overflow", previous.as_deref().unwrap_or(""));
        }
    }
}

/// Whether a popup is currently shown.
fn is_showing(doc: &Document, popup: NodeId) -> bool {
    doc.style(popup, "display") == Some("block") || doc.has_class(popup, VISIBLE_CLASS)
}

/// Show a popup container and take the scroll lock.
pub fn open_container(page: &mut Page, popup: NodeId) {
    let (lock, doc) = page.state_and_document::<ScrollLock>();
    doc.set_style(popup, "display", "block");
    doc.add_class(popup, VISIBLE_CLASS);
    lock.acquire(doc, popup);
}

/// Hide a popup container and release the scroll lock per policy.
pub fn close_container(page: &mut Page, popup: NodeId) {
    let (lock, doc) = page.state_and_document::<ScrollLock>();
    doc.set_style(popup, "display", "none");
    doc.remove_class(popup, VISIBLE_CLASS);
    lock.release(doc, popup);
}

/// Open the popup with `container_id`, suppressing the event's default.
///
/// Returns false when no element has that id.
pub fn open_popup(page: &mut Page, event: &mut Event, container_id: &str) -> bool {
    event.prevent_default();
    Popup::open(page, container_id)
}

/// Close the popup with `container_id`. Returns false when no element has that id.
pub fn close_popup(page: &mut Page, container_id: &str) -> bool {
    Popup::close(page, container_id)
}

#[derive(Debug, Clone, Default)]
pub struct Popup {
    popups: Vec<NodeId>,
    triggers: Vec<NodeId>,
    subscriptions: Rc<RefCell<Subscriptions>>,
}

impl Popup {
    pub fn mount(page: &mut Page, settings: &Settings) -> Result<Self, BehaviorError> {
        let containers = compile(POPUP_CONTAINERS)?;
        let trigger_selector = compile(POPUP_TRIGGERS)?;
        let close_selector = compile(CLOSE_BUTTONS)?;

        page.state::<ScrollLock>().set_policy(settings.scroll_lock);

        let doc = page.document();
        let root = doc.root();
        let popups = doc.query_all(root, &containers);
        let triggers = doc.query_all(root, &trigger_selector);
        let close_buttons = doc.query_all(root, &close_selector);

        let mut subscriptions = Subscriptions::new();

        for &trigger in &triggers {
            subscriptions.listen(page, EventTarget::Node(trigger), EventKind::Click, move |page, event| {
                let id = page
                    .document()
                    .attribute(trigger, "data-popup")
                    .unwrap_or_default()
                    .to_string();
                open_popup(page, event, &id);
            });
        }

        for &button in &close_buttons {
            let containers = containers.clone();
            subscriptions.listen(page, EventTarget::Node(button), EventKind::Click, move |page, _| {
                if let Some(popup) = page.document().closest(button, &containers) {
                    close_container(page, popup);
                }
            });
        }

        for &popup in &popups {
            subscriptions.listen(page, EventTarget::Node(popup), EventKind::Click, move |page, event| {
                if event.target() == EventTarget::Node(popup) {
                    close_container(page, popup);
                }
            });
        }

        let escapable = popups.clone();
        subscriptions.listen(page, EventTarget::Document, EventKind::KeyDown, move |page, event| {
            if event.key() != Some("Escape") {
                return;
            }
            for &popup in &escapable {
                if is_showing(page.document(), popup) {
                    close_container(page, popup);
                }
            }
        });

        debug!(
            popups = popups.len(),
            triggers = triggers.len(),
            close_buttons = close_buttons.len(),
            "Mounted popups"
        );

        Ok(Self {
            popups,
            triggers,
            subscriptions: Rc::new(RefCell::new(subscriptions)),
        })
    }

    /// Open the popup with id `id`. Returns false when there is none.
    pub fn open(page: &mut Page, id: &str) -> bool {
        match page.document().element_by_id(id) {
            Some(popup) => {
                open_container(page, popup);
                true
            }
            None => false,
        }
    }

    /// Close the popup with id `id`. Returns false when there is none.
    pub fn close(page: &mut Page, id: &str) -> bool {
        match page.document().element_by_id(id) {
            Some(popup) => {
                close_container(page, popup);
                true
            }
            None => false,
        }
    }

    pub fn is_open(page: &Page, id: &str) -> bool {
        page.document()
            .element_by_id(id)
            .is_some_and(|popup| is_showing(page.document(), popup))
    }

    pub fn popups(&self) -> &[NodeId] {
        &self.popups
    }

    /// Triggers whose `data-popup` names no element on the page.
    pub fn broken_triggers(&self, page: &Page) -> Vec<NodeId> {
        let doc = page.document();
        self.triggers
            .iter()
            .copied()
            .filter(|&trigger| {
                doc.attribute(trigger, "data-popup")
                    .and_then(|id| doc.element_by_id(id))
                    .is_none()
            })
            .collect()
    }
}

impl Component for Popup {
    fn name(&self) -> &'static str {
        "popup"
    }

    fn unmount(&self, page: &mut Page) {
        self.subscriptions.borrow_mut().release(page);
    }
}
