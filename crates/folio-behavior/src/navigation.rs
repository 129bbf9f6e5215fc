//! Mobile navigation panel and header scroll state.
//!
//! Mounting builds the overlay, the mobile panel (cloned from the desktop
//! menu unless the page already has one) and the mobile title bar, then binds
//! the toggles, the overlay, `Escape`, and debounced scroll and resize
//! handlers. Open and closed states are carried entirely by classes on the
//! panel, the overlay and the body, mirrored into `aria-expanded` on every
//! toggle.

use std::cell::RefCell;
use std::rc::Rc;

use folio_dom::{Document, NodeId};
use tracing::debug;

use crate::debounce::Debounce;
use crate::error::{compile, BehaviorError};
use crate::menu::{build_mobile_menu, read_menu, MobileEntry, MobileList};
use crate::runtime::{EventKind, EventTarget, Page, Subscriptions};
use crate::settings::Settings;
use crate::traits::Component;

const HEADER_ID: &str = "header";
const PANEL_ID: &str = "navPanel";
const TITLE_BAR_ID: &str = "titleBar";
const NAV_TOGGLE: &str = ".nav-toggle";
const NAV_LIST: &str = "#nav ul";

const VISIBLE_CLASS: &str = "is-visible";
const BODY_OPEN_CLASS: &str = "navPanel-visible";
const SCROLLED_CLASS: &str = "scrolled";

/// Elements the navigation drives once mounted.
#[derive(Debug, Clone)]
struct Elements {
    header: NodeId,
    panel: NodeId,
    overlay: NodeId,
    toggles: Vec<NodeId>,
}

impl Elements {
    fn is_open(&self, doc: &Document) -> bool {
        doc.has_class(self.panel, VISIBLE_CLASS)
    }

    fn set_open(&self, doc: &mut Document, open: bool) {
        doc.set_class(self.panel, VISIBLE_CLASS, open);
        doc.set_class(self.overlay, VISIBLE_CLASS, open);
        let body = doc.body();
        doc.set_class(body, BODY_OPEN_CLASS, open);

        let expanded = if open { "true" } else { "false" };
        for &toggle in &self.toggles {
            doc.set_attribute(toggle, "aria-expanded", expanded);
        }
    }

    fn toggle(&self, doc: &mut Document) {
        let open = !self.is_open(doc);
        self.set_open(doc, open);
    }

    fn apply_scroll(&self, page: &mut Page, threshold: f64) {
        let scrolled = page.scroll_y() > threshold;
        page.document_mut()
            .set_class(self.header, SCROLLED_CLASS, scrolled);
    }
}

/// The site navigation. Inert on pages without a `#header`.
#[derive(Debug, Clone, Default)]
pub struct Navigation {
    elements: Option<Elements>,
    scrolled_threshold: f64,
    debounces: Vec<Debounce>,
    subscriptions: Rc<RefCell<Subscriptions>>,
}

impl Navigation {
    pub fn mount(page: &mut Page, settings: &Settings) -> Result<Self, BehaviorError> {
        let nav_toggle = compile(NAV_TOGGLE)?;
        let nav_list = compile(NAV_LIST)?;

        let doc = page.document();
        let Some(header) = doc.element_by_id(HEADER_ID) else {
            debug!("No #{} on page, navigation inert", HEADER_ID);
            return Ok(Self::default());
        };

        let existing_toggle = doc.query(doc.root(), &nav_toggle);
        let existing_panel = doc.element_by_id(PANEL_ID);
        let has_title_bar = doc.element_by_id(TITLE_BAR_ID).is_some();
        let menu = match existing_panel {
            Some(_) => None,
            None => match doc.query(doc.root(), &nav_list) {
                Some(list) => Some(build_mobile_menu(&read_menu(doc, list)?)),
                None => None,
            },
        };

        let doc = page.document_mut();
        let body = doc.body();

        let overlay = doc.create_element("div");
        doc.set_attribute(overlay, "class", "nav-overlay");
        doc.append_child(body, overlay);

        let panel = match existing_panel {
            Some(panel) => panel,
            None => {
                let panel = doc.create_element("nav");
                doc.set_attribute(panel, "id", PANEL_ID);
                if let Some(menu) = &menu {
                    let list = render_list(doc, menu);
                    doc.append_child(panel, list);
                }
                doc.append_child(body, panel);
                panel
            }
        };

        let mut toggles = Vec::new();
        if !has_title_bar {
            toggles.push(render_title_bar(doc, settings));
        }
        toggles.extend(existing_toggle);

        let elements = Elements {
            header,
            panel,
            overlay,
            toggles,
        };
        let threshold = settings.scrolled_threshold;
        let breakpoint = settings.desktop_breakpoint;
        let mut subscriptions = Subscriptions::new();

        for &toggle in &elements.toggles {
            let els = elements.clone();
            subscriptions.listen(page, EventTarget::Node(toggle), EventKind::Click, move |page, _| {
                els.toggle(page.document_mut())
            });
        }

        let els = elements.clone();
        subscriptions.listen(page, EventTarget::Node(overlay), EventKind::Click, move |page, _| {
            els.set_open(page.document_mut(), false)
        });

        let els = elements.clone();
        subscriptions.listen(page, EventTarget::Document, EventKind::KeyDown, move |page, event| {
            if event.key() == Some("Escape") {
                els.set_open(page.document_mut(), false);
            }
        });

        let els = elements.clone();
        let scroll = Debounce::new(settings.scroll_debounce(), move |page| {
            els.apply_scroll(page, threshold)
        });
        let handler = scroll.clone();
        subscriptions.listen(page, EventTarget::Window, EventKind::Scroll, move |page, _| {
            handler.call(page)
        });

        let els = elements.clone();
        let resize = Debounce::new(settings.resize_debounce(), move |page| {
            if page.viewport().width > breakpoint {
                els.set_open(page.document_mut(), false);
            }
        });
        let handler = resize.clone();
        subscriptions.listen(page, EventTarget::Window, EventKind::Resize, move |page, _| {
            handler.call(page)
        });

        elements.apply_scroll(page, threshold);

        debug!(
            links = menu.as_ref().map_or(0, |m| m.links().len()),
            toggles = elements.toggles.len(),
            "Mounted navigation"
        );

        Ok(Self {
            elements: Some(elements),
            scrolled_threshold: threshold,
            debounces: vec![scroll, resize],
            subscriptions: Rc::new(RefCell::new(subscriptions)),
        })
    }

    /// Whether the page had no header to attach to.
    pub fn is_inert(&self) -> bool {
        self.elements.is_none()
    }

    pub fn panel(&self) -> Option<NodeId> {
        self.elements.as_ref().map(|els| els.panel)
    }

    pub fn overlay(&self) -> Option<NodeId> {
        self.elements.as_ref().map(|els| els.overlay)
    }

    /// Toggles bound by the navigation, title bar toggle first.
    pub fn toggles(&self) -> &[NodeId] {
        match &self.elements {
            Some(els) => &els.toggles,
            None => &[],
        }
    }

    pub fn is_open(&self, page: &Page) -> bool {
        self.elements
            .as_ref()
            .is_some_and(|els| els.is_open(page.document()))
    }

    pub fn open(&self, page: &mut Page) {
        if let Some(els) = &self.elements {
            els.set_open(page.document_mut(), true);
        }
    }

    pub fn close(&self, page: &mut Page) {
        if let Some(els) = &self.elements {
            els.set_open(page.document_mut(), false);
        }
    }

    pub fn toggle(&self, page: &mut Page) {
        if let Some(els) = &self.elements {
            els.toggle(page.document_mut());
        }
    }

    /// Mark the header scrolled according to the current scroll offset.
    pub fn handle_scroll(&self, page: &mut Page) {
        if let Some(els) = &self.elements {
            els.apply_scroll(page, self.scrolled_threshold);
        }
    }
}

impl Component for Navigation {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn unmount(&self, page: &mut Page) {
        for debounce in &self.debounces {
            debounce.cancel(page);
        }
        self.subscriptions.borrow_mut().release(page);
    }
}

fn render_list(doc: &mut Document, list: &MobileList) -> NodeId {
    let ul = doc.create_element("ul");
    for entry in &list.entries {
        match entry {
            MobileEntry::Link(link) => {
                let li = doc.create_element("li");
                let a = doc.create_element("a");
                doc.set_attribute(a, "href", &link.href);
                doc.set_attribute(a, "class", &link.class_name());
                for class in link.indent_classes() {
                    let indent = doc.create_element("span");
                    doc.set_attribute(indent, "class", &class);
                    doc.append_child(a, indent);
                }
                doc.append_text(a, &link.label);
                doc.append_child(li, a);
                doc.append_child(ul, li);
            }
            MobileEntry::Nested(nested) => {
                let sub = render_list(doc, nested);
                doc.append_child(ul, sub);
            }
        }
    }
    ul
}

/// Insert the mobile title bar at the top of the body, returning its toggle.
fn render_title_bar(doc: &mut Document, settings: &Settings) -> NodeId {
    let bar = doc.create_element("div");
    doc.set_attribute(bar, "id", TITLE_BAR_ID);

    let toggle = doc.create_element("button");
    doc.set_attribute(toggle, "class", "toggle");
    doc.set_attribute(toggle, "aria-label", "Toggle menu");

    let icon = doc.create_element("svg");
    for (name, value) in [
        ("width", "24"),
        ("height", "24"),
        ("viewBox", "0 0 24 24"),
        ("fill", "none"),
        ("stroke", "currentColor"),
        ("stroke-width", "2"),
    ] {
        doc.set_attribute(icon, name, value);
    }
    for y in ["6", "12", "18"] {
        let line = doc.create_element("line");
        for (name, value) in [("x1", "3"), ("y1", y), ("x2", "21"), ("y2", y)] {
            doc.set_attribute(line, name, value);
        }
        doc.append_child(icon, line);
    }
    doc.append_child(toggle, icon);
    doc.append_child(bar, toggle);

    let title = doc.create_element("span");
    doc.set_attribute(title, "class", "title");
    let home = doc.create_element("a");
    doc.set_attribute(home, "href", &settings.home);
    doc.append_text(home, &settings.site_title);
    doc.append_child(title, home);
    doc.append_child(bar, title);

    let body = doc.body();
    doc.prepend_child(body, bar);
    toggle
}
