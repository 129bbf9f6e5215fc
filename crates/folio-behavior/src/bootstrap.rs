//! Page start-up.
//!
//! [`bootstrap`] mounts every component once the document is interactive,
//! in a fixed order, then marks touch-capable pages with `is-touch`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, error};

use crate::error::BehaviorError;
use crate::lazy_load::LazyLoad;
use crate::navigation::Navigation;
use crate::popup::Popup;
use crate::preload::PreloadHandler;
use crate::runtime::{EventKind, EventTarget, ListenerId, Page, ReadyState};
use crate::scroll_animations::ScrollAnimations;
use crate::settings::Settings;
use crate::smooth_scroll::SmoothScroll;
use crate::traits::Component;

const TOUCH_CLASS: &str = "is-touch";

/// Every component mounted on a page.
#[derive(Debug, Clone)]
pub struct Site {
    pub preload: PreloadHandler,
    pub navigation: Navigation,
    pub smooth_scroll: SmoothScroll,
    pub lazy_load: LazyLoad,
    pub popup: Popup,
    pub scroll_animations: ScrollAnimations,
}

impl Site {
    /// Mount all components in start-up order.
    pub fn mount(page: &mut Page, settings: &Settings) -> Result<Self, BehaviorError> {
        let site = Self {
            preload: PreloadHandler::mount(page, settings),
            navigation: Navigation::mount(page, settings)?,
            smooth_scroll: SmoothScroll::mount(page, settings)?,
            lazy_load: LazyLoad::mount(page)?,
            popup: Popup::mount(page, settings)?,
            scroll_animations: ScrollAnimations::mount(page)?,
        };

        if page.environment().supports_touch() {
            let body = page.document().body();
            page.document_mut().add_class(body, TOUCH_CLASS);
        }

        debug!(
            components = ?site.components().iter().map(|c| c.name()).collect::<Vec<_>>(),
            "Site mounted"
        );
        Ok(site)
    }

    /// Components in start-up order.
    pub fn components(&self) -> [&dyn Component; 6] {
        [
            &self.preload,
            &self.navigation,
            &self.smooth_scroll,
            &self.lazy_load,
            &self.popup,
            &self.scroll_animations,
        ]
    }

    /// Unmount every component, in reverse start-up order.
    pub fn teardown(&self, page: &mut Page) {
        for component in self.components().into_iter().rev() {
            component.unmount(page);
        }
    }
}

/// Handle to a site that may still be waiting for the document.
#[derive(Debug, Clone, Default)]
pub struct SiteHandle {
    site: Rc<RefCell<Option<Site>>>,
    waiting: Rc<Cell<Option<ListenerId>>>,
}

impl SiteHandle {
    pub fn is_mounted(&self) -> bool {
        self.site.borrow().is_some()
    }

    /// The mounted site, once the document became interactive.
    pub fn site(&self) -> Option<Site> {
        self.site.borrow().clone()
    }

    /// Unmount the site, or stop waiting to mount it.
    pub fn teardown(&self, page: &mut Page) {
        if let Some(listener) = self.waiting.take() {
            page.unlisten(listener);
        }
        let site = self.site.borrow_mut().take();
        if let Some(site) = site {
            site.teardown(page);
        }
    }
}

/// Mount the site now, or on `DOMContentLoaded` while the document is loading.
///
/// A deferred mount runs at most once. Its errors cannot reach the caller
/// and are logged instead.
pub fn bootstrap(page: &mut Page, settings: Settings) -> Result<SiteHandle, BehaviorError> {
    let handle = SiteHandle::default();

    if page.ready_state() != ReadyState::Loading {
        let site = Site::mount(page, &settings)?;
        *handle.site.borrow_mut() = Some(site);
        page.flush();
        return Ok(handle);
    }

    let deferred = handle.clone();
    let listener = page.listen(
        EventTarget::Document,
        EventKind::DomContentLoaded,
        move |page, _| {
            let Some(listener) = deferred.waiting.take() else {
                return;
            };
            page.unlisten(listener);

            match Site::mount(page, &settings) {
                Ok(site) => *deferred.site.borrow_mut() = Some(site),
                Err(err) => error!("Failed to mount site: {}", err),
            }
        },
    );
    handle.waiting.set(Some(listener));
    debug!("Document still loading, deferring site mount");

    Ok(handle)
}
