//! Reveal-on-scroll for `[data-animate]` elements.

use std::cell::RefCell;
use std::rc::Rc;

use folio_dom::NodeId;
use tracing::debug;

use crate::error::{compile, BehaviorError};
use crate::observer::ObserverOptions;
use crate::runtime::{Page, Subscriptions};
use crate::traits::Component;

const ANIMATED: &str = "[data-animate]";
const ROOT_MARGIN: &str = "0px 0px -10% 0px";
const THRESHOLD: f64 = 0.1;
const VISIBLE_CLASS: &str = "is-visible";

#[derive(Debug, Clone, Default)]
pub struct ScrollAnimations {
    elements: Vec<NodeId>,
    subscriptions: Rc<RefCell<Subscriptions>>,
}

impl ScrollAnimations {
    pub fn mount(page: &mut Page) -> Result<Self, BehaviorError> {
        let selector = compile(ANIMATED)?;
        let options = ObserverOptions::new(ROOT_MARGIN, THRESHOLD)?;
        let doc = page.document();
        let elements = doc.query_all(doc.root(), &selector);

        let mut subscriptions = Subscriptions::new();
        if page.supports_intersection() && !elements.is_empty() {
            let observer = page.create_observer(options, |page, entries, observer| {
                for entry in entries.iter().filter(|entry| entry.is_intersecting) {
                    page.document_mut().add_class(entry.target, VISIBLE_CLASS);
                    page.unobserve(observer, entry.target);
                }
            });
            for &element in &elements {
                page.observe(observer, element);
            }
            subscriptions.track_observer(observer);
            debug!(elements = elements.len(), "Mounted scroll animations");
        }

        Ok(Self {
            elements,
            subscriptions: Rc::new(RefCell::new(subscriptions)),
        })
    }

    /// Elements that have been revealed.
    pub fn revealed(&self, page: &Page) -> usize {
        self.elements
            .iter()
            .filter(|&&element| page.document().has_class(element, VISIBLE_CLASS))
            .count()
    }

    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }
}

impl Component for ScrollAnimations {
    fn name(&self) -> &'static str {
        "scroll-animations"
    }

    fn unmount(&self, page: &mut Page) {
        self.subscriptions.borrow_mut().release(page);
    }
}
