//! Deferred image loading.
//!
//! Images marked with `data-src` or `loading="lazy"` get their real source
//! once they come within 50px of the viewport. Pages without intersection
//! support load every image up front.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use folio_dom::NodeId;
use tracing::debug;

use crate::error::{compile, BehaviorError};
use crate::observer::{ObserverId, ObserverOptions};
use crate::runtime::{Page, Subscriptions};
use crate::traits::Component;

const LAZY_IMAGES: &str = r#"img[data-src], img[loading="lazy"]"#;
const ROOT_MARGIN: &str = "50px 0px";
const THRESHOLD: f64 = 0.01;
const LOADED_CLASS: &str = "loaded";

#[derive(Debug, Clone, Default)]
pub struct LazyLoad {
    images: Vec<NodeId>,
    loaded: Rc<RefCell<BTreeSet<NodeId>>>,
    observer: Option<ObserverId>,
    subscriptions: Rc<RefCell<Subscriptions>>,
}

impl LazyLoad {
    /// Collect the lazy images present now; images added later are ignored.
    pub fn mount(page: &mut Page) -> Result<Self, BehaviorError> {
        let selector = compile(LAZY_IMAGES)?;
        let options = ObserverOptions::new(ROOT_MARGIN, THRESHOLD)?;
        let doc = page.document();
        let images = doc.query_all(doc.root(), &selector);

        let mut lazy = Self {
            images,
            loaded: Rc::default(),
            observer: None,
            subscriptions: Rc::default(),
        };

        if !page.supports_intersection() {
            let loaded = lazy.load_all(page);
            debug!(loaded, "No intersection support, loaded images eagerly");
            return Ok(lazy);
        }

        let loaded = Rc::clone(&lazy.loaded);
        let observer = page.create_observer(options, move |page, entries, observer| {
            for entry in entries.iter().filter(|entry| entry.is_intersecting) {
                load(page, &loaded, entry.target);
                page.unobserve(observer, entry.target);
            }
        });
        for &image in &lazy.images {
            page.observe(observer, image);
        }
        lazy.subscriptions.borrow_mut().track_observer(observer);
        lazy.observer = Some(observer);

        debug!(images = lazy.images.len(), "Mounted lazy loading");
        Ok(lazy)
    }

    /// Swap in the deferred source of `image`.
    ///
    /// Falls back to the current `src` when there is no `data-src`. Returns
    /// false when this component already loaded the image or it has no
    /// source at all.
    pub fn load_image(&self, page: &mut Page, image: NodeId) -> bool {
        load(page, &self.loaded, image)
    }

    /// Load every collected image. Returns how many were loaded.
    pub fn load_all(&self, page: &mut Page) -> usize {
        self.images
            .iter()
            .filter(|&&image| self.load_image(page, image))
            .count()
    }

    /// Collected images that have not loaded yet.
    pub fn pending(&self) -> usize {
        let loaded = self.loaded.borrow();
        self.images
            .iter()
            .filter(|image| !loaded.contains(image))
            .count()
    }

    pub fn images(&self) -> &[NodeId] {
        &self.images
    }
}

/// Load `image` once; `loaded` records images already handled.
fn load(page: &mut Page, loaded: &RefCell<BTreeSet<NodeId>>, image: NodeId) -> bool {
    if loaded.borrow().contains(&image) {
        return false;
    }

    let doc = page.document_mut();
    let source = doc
        .attribute(image, "data-src")
        .filter(|src| !src.is_empty())
        .or_else(|| doc.attribute(image, "src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string);
    let Some(source) = source else {
        return false;
    };

    doc.set_attribute(image, "src", &source);
    doc.remove_attribute(image, "data-src");
    doc.add_class(image, LOADED_CLASS);
    loaded.borrow_mut().insert(image);
    true
}

impl Component for LazyLoad {
    fn name(&self) -> &'static str {
        "lazy-load"
    }

    fn unmount(&self, page: &mut Page) {
        self.subscriptions.borrow_mut().release(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Environment;
    use folio_dom::Rect;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"
<img id="hero" data-src="/images/hero.jpg" src="/images/placeholder.gif">
<img id="native" loading="lazy" src="/images/native.jpg">
<img id="plain" src="/images/plain.jpg">
<img id="far" data-src="/images/far.jpg">"#;

    fn page(environment: Environment) -> Page {
        let mut page = Page::from_html(PAGE).unwrap().with_environment(environment);
        for (id, y) in [("hero", 100.0), ("native", 300.0), ("plain", 500.0), ("far", 3000.0)] {
            let node = page.document().element_by_id(id).unwrap();
            page.document_mut()
                .set_rect(node, Rect::new(0.0, y, 400.0, 100.0));
        }
        page
    }

    fn node(page: &Page, id: &str) -> NodeId {
        page.document().element_by_id(id).unwrap()
    }

    #[test]
    fn collects_deferred_and_native_lazy_images() {
        let mut page = page(Environment::default());
        let lazy = LazyLoad::mount(&mut page).unwrap();

        let ids: Vec<&str> = lazy
            .images()
            .iter()
            .map(|&img| page.document().element_id(img).unwrap())
            .collect();
        assert_eq!(ids, vec!["hero", "native", "far"]);
    }

    #[test]
    fn loads_images_already_in_view_at_mount() {
        let mut page = page(Environment::default());
        let lazy = LazyLoad::mount(&mut page).unwrap();

        let hero = node(&page, "hero");
        let doc = page.document();
        assert_eq!(doc.attribute(hero, "src"), Some("/images/hero.jpg"));
        assert!(!doc.has_attribute(hero, "data-src"));
        assert!(doc.has_class(hero, "loaded"));
        assert_eq!(lazy.pending(), 1);

        // 50px margin below an 800px viewport
        page.scroll_to_y(2140.0);
        assert_eq!(lazy.pending(), 1);
        page.scroll_to_y(2260.0);
        assert_eq!(lazy.pending(), 0);

        let far = node(&page, "far");
        assert_eq!(page.document().attribute(far, "src"), Some("/images/far.jpg"));
    }

    #[test]
    fn loads_each_image_once() {
        let mut page = page(Environment::default());
        let lazy = LazyLoad::mount(&mut page).unwrap();

        let hero = node(&page, "hero");
        page.document_mut()
            .set_attribute(hero, "data-src", "/images/other.jpg");

        page.scroll_to_y(2000.0);
        page.scroll_to_y(0.0);
        assert!(!lazy.load_image(&mut page, hero));
        assert_eq!(page.document().attribute(hero, "src"), Some("/images/hero.jpg"));
    }

    #[test]
    fn stops_observing_loaded_images() {
        let mut page = page(Environment::default());
        let lazy = LazyLoad::mount(&mut page).unwrap();

        let far = node(&page, "far");
        assert_eq!(page.observed_targets(lazy.observer.unwrap()), vec![far]);
        assert_eq!(page.observer_count(), 1);
    }

    #[test]
    fn loads_everything_without_intersection_support() {
        let mut page = page(Environment {
            intersection_observer: false,
            ..Environment::default()
        });
        let lazy = LazyLoad::mount(&mut page).unwrap();

        assert_eq!(lazy.pending(), 0);
        assert_eq!(page.observer_count(), 0);
        let native = node(&page, "native");
        assert_eq!(
            page.document().attribute(native, "src"),
            Some("/images/native.jpg")
        );
        assert!(page.document().has_class(native, "loaded"));
    }

    #[test]
    fn unmount_disconnects_the_observer() {
        let mut page = page(Environment::default());
        let lazy = LazyLoad::mount(&mut page).unwrap();
        lazy.unmount(&mut page);

        page.scroll_to_y(2300.0);
        assert_eq!(page.observer_count(), 0);
        assert_eq!(lazy.pending(), 1);
        let far = node(&page, "far");
        assert!(page.document().has_attribute(far, "data-src"));
    }

    #[test]
    fn author_loaded_class_does_not_block_loading() {
        let mut page = Page::from_html(
            r#"<img id="styled" class="loaded" data-src="/images/styled.jpg">"#,
        )
        .unwrap();
        let styled = node(&page, "styled");
        page.document_mut()
            .set_rect(styled, Rect::new(0.0, 100.0, 400.0, 200.0));

        let lazy = LazyLoad::mount(&mut page).unwrap();

        assert_eq!(
            page.document().attribute(styled, "src"),
            Some("/images/styled.jpg")
        );
        assert!(!page.document().has_attribute(styled, "data-src"));
        assert_eq!(lazy.pending(), 0);
    }
}
