//! Removal of the `is-preload` body class once the page has loaded.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::runtime::{EventKind, EventTarget, Page, Subscriptions, TimerId};
use crate::settings::Settings;
use crate::traits::Component;

const PRELOAD_CLASS: &str = "is-preload";

#[derive(Debug, Clone, Default)]
pub struct PreloadHandler {
    pending: Rc<Cell<Option<TimerId>>>,
    subscriptions: Rc<RefCell<Subscriptions>>,
}

impl PreloadHandler {
    pub fn mount(page: &mut Page, settings: &Settings) -> Self {
        let delay = settings.preload_delay();
        let pending: Rc<Cell<Option<TimerId>>> = Rc::default();

        let mut subscriptions = Subscriptions::new();
        let timer = Rc::clone(&pending);
        subscriptions.listen(page, EventTarget::Window, EventKind::Load, move |page, _| {
            // A removal is already scheduled
            if timer.get().is_some() {
                return;
            }
            let done = Rc::clone(&timer);
            let id = page.set_timeout(delay, move |page| {
                done.set(None);
                let body = page.document().body();
                page.document_mut().remove_class(body, PRELOAD_CLASS);
                debug!("Removed preload class");
            });
            timer.set(Some(id));
        });

        Self {
            pending,
            subscriptions: Rc::new(RefCell::new(subscriptions)),
        }
    }
}

impl Component for PreloadHandler {
    fn name(&self) -> &'static str {
        "preload"
    }

    fn unmount(&self, page: &mut Page) {
        if let Some(id) = self.pending.take() {
            page.clear_timeout(id);
        }
        self.subscriptions.borrow_mut().release(page);
    }
}
