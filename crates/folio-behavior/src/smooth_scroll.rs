//! Smooth scrolling for in-page anchors.

use std::cell::RefCell;
use std::rc::Rc;

use folio_dom::NodeId;
use tracing::debug;

use crate::error::{compile, BehaviorError};
use crate::runtime::{EventKind, EventTarget, Page, ScrollBehavior, ScrollToOptions, Subscriptions};
use crate::settings::Settings;
use crate::traits::Component;

const IN_PAGE_ANCHORS: &str = r##"a[href^="#"]"##;

/// Hrefs that only act as placeholders for script-driven links.
const PLACEHOLDER_HREFS: &[&str] = &["#", "#!"];

#[derive(Debug, Clone, Default)]
pub struct SmoothScroll {
    anchors: Vec<NodeId>,
    subscriptions: Rc<RefCell<Subscriptions>>,
}

impl SmoothScroll {
    pub fn mount(page: &mut Page, settings: &Settings) -> Result<Self, BehaviorError> {
        let selector = compile(IN_PAGE_ANCHORS)?;
        let doc = page.document();
        let anchors = doc.query_all(doc.root(), &selector);
        let offset = settings.scroll_offset;

        let mut subscriptions = Subscriptions::new();
        for &anchor in &anchors {
            subscriptions.listen(page, EventTarget::Node(anchor), EventKind::Click, move |page, event| {
                // The href is read at click time, like the browser would
                let Some(href) = page.document().attribute(anchor, "href") else {
                    return;
                };
                if PLACEHOLDER_HREFS.contains(&href) {
                    return;
                }
                let Some(target) = href
                    .strip_prefix('#')
                    .and_then(|id| page.document().element_by_id(id))
                else {
                    return;
                };

                event.prevent_default();
                Self::scroll_to(page, target, offset);
            });
        }

        debug!(anchors = anchors.len(), "Mounted smooth scrolling");

        Ok(Self {
            anchors,
            subscriptions: Rc::new(RefCell::new(subscriptions)),
        })
    }

    /// Smoothly scroll so `element` sits `offset` pixels below the viewport top.
    pub fn scroll_to(page: &mut Page, element: NodeId, offset: f64) {
        let top = page.bounding_client_rect(element).top() + page.scroll_y() - offset;
        page.window_scroll_to(ScrollToOptions {
            top,
            behavior: ScrollBehavior::Smooth,
        });
    }

    /// Anchors bound at mount time.
    pub fn anchors(&self) -> &[NodeId] {
        &self.anchors
    }

    /// Anchors whose fragment names no element on the page.
    pub fn broken_anchors(&self, page: &Page) -> Vec<NodeId> {
        let doc = page.document();
        self.anchors
            .iter()
            .copied()
            .filter(|&anchor| match doc.attribute(anchor, "href") {
                Some(href) if !PLACEHOLDER_HREFS.contains(&href) => href
                    .strip_prefix('#')
                    .and_then(|id| doc.element_by_id(id))
                    .is_none(),
                _ => false,
            })
            .collect()
    }
}

impl Component for SmoothScroll {
    fn name(&self) -> &'static str {
        "smooth-scroll"
    }

    fn unmount(&self, page: &mut Page) {
        self.subscriptions.borrow_mut().release(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::Rect;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r##"
<a id="to-section" href="#section1">Section 1</a>
<a id="to-missing" href="#nowhere">Missing</a>
<a id="placeholder" href="#">Top</a>
<a id="bang" href="#!">Bang</a>
<a id="external" href="/about">About</a>
<section id="section1"><h2>One</h2></section>"##;

    fn mounted() -> (Page, SmoothScroll) {
        let mut page = Page::from_html(PAGE).unwrap();
        let section = page.document().element_by_id("section1").unwrap();
        page.document_mut()
            .set_rect(section, Rect::new(0.0, 1500.0, 1280.0, 400.0));
        let smooth = SmoothScroll::mount(&mut page, &Settings::default()).unwrap();
        (page, smooth)
    }

    fn click(page: &mut Page, id: &str) -> bool {
        let node = page.document().element_by_id(id).unwrap();
        page.click(node).default_prevented()
    }

    #[test]
    fn binds_only_in_page_anchors() {
        let (_, smooth) = mounted();
        assert_eq!(smooth.anchors().len(), 4);
    }

    #[test]
    fn scrolls_to_target_minus_offset() {
        let (mut page, _) = mounted();
        page.scroll_to_y(200.0);

        assert!(click(&mut page, "to-section"));
        assert_eq!(
            page.scroll_requests(),
            &[ScrollToOptions {
                top: 1420.0,
                behavior: ScrollBehavior::Smooth,
            }]
        );
        assert_eq!(page.scroll_y(), 1420.0);
    }

    #[test]
    fn placeholders_keep_default_behaviour() {
        let (mut page, _) = mounted();

        assert!(!click(&mut page, "placeholder"));
        assert!(!click(&mut page, "bang"));
        assert!(page.scroll_requests().is_empty());
    }

    #[test]
    fn missing_target_keeps_default_behaviour() {
        let (mut page, _) = mounted();

        assert!(!click(&mut page, "to-missing"));
        assert!(page.scroll_requests().is_empty());
    }

    #[test]
    fn reports_anchors_without_targets() {
        let (page, smooth) = mounted();
        let missing = page.document().element_by_id("to-missing").unwrap();

        assert_eq!(smooth.broken_anchors(&page), vec![missing]);
    }

    #[test]
    fn unmount_unbinds_anchors() {
        let (mut page, smooth) = mounted();
        smooth.unmount(&mut page);

        assert!(!click(&mut page, "to-section"));
        assert_eq!(page.listener_count(), 0);
    }
}
