//! Trailing-edge debouncing on the page clock.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::runtime::{Page, TimerId};

/// Collapses bursts of calls into one, run `wait` after the last call.
///
/// Clones share the pending timer, so a clone captured by an event handler
/// and one kept by the owning component refer to the same debounced action.
#[derive(Clone)]
pub struct Debounce {
    wait: Duration,
    action: Rc<dyn Fn(&mut Page)>,
    pending: Rc<Cell<Option<TimerId>>>,
}

impl Debounce {
    pub fn new<F>(wait: Duration, action: F) -> Self
    where
        F: Fn(&mut Page) + 'static,
    {
        Self {
            wait,
            action: Rc::new(action),
            pending: Rc::new(Cell::new(None)),
        }
    }

    /// Restart the wait; the action runs once the page clock passes it.
    pub fn call(&self, page: &mut Page) {
        if let Some(timer) = self.pending.take() {
            page.clear_timeout(timer);
        }

        let action = Rc::clone(&self.action);
        let pending = Rc::clone(&self.pending);
        let timer = page.set_timeout(self.wait, move |page| {
            pending.set(None);
            action(page);
        });
        self.pending.set(Some(timer));
    }

    /// Drop a pending invocation.
    pub fn cancel(&self, page: &mut Page) {
        if let Some(timer) = self.pending.take() {
            page.clear_timeout(timer);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }
}

impl std::fmt::Debug for Debounce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounce")
            .field("wait", &self.wait)
            .field("pending", &self.pending.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn page() -> Page {
        Page::from_html("<p>debounce</p>").unwrap()
    }

    #[test]
    fn burst_runs_once_after_last_call() {
        let mut page = page();
        let runs = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&runs);
        let debounce = Debounce::new(Duration::from_millis(10), move |page| {
            log.borrow_mut().push(page.now().as_millis());
        });

        for _ in 0..5 {
            debounce.call(&mut page);
            page.advance(Duration::from_millis(4));
        }
        assert!(runs.borrow().is_empty());
        assert!(debounce.is_pending());

        page.advance(Duration::from_millis(20));
        assert_eq!(*runs.borrow(), vec![26]);
        assert!(!debounce.is_pending());
    }

    #[test]
    fn clones_share_the_pending_call() {
        let mut page = page();
        let runs = Rc::new(RefCell::new(0));

        let count = Rc::clone(&runs);
        let debounce = Debounce::new(Duration::from_millis(10), move |_| {
            *count.borrow_mut() += 1;
        });
        let handle = debounce.clone();

        debounce.call(&mut page);
        handle.call(&mut page);
        assert_eq!(page.pending_timers(), 1);

        page.advance(Duration::from_millis(10));
        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn cancel_drops_the_pending_call() {
        let mut page = page();
        let runs = Rc::new(RefCell::new(0));

        let count = Rc::clone(&runs);
        let debounce = Debounce::new(Duration::from_millis(10), move |_| {
            *count.borrow_mut() += 1;
        });

        debounce.call(&mut page);
        debounce.cancel(&mut page);
        page.advance(Duration::from_millis(50));

        assert_eq!(*runs.borrow(), 0);
        assert_eq!(page.pending_timers(), 0);
    }
}
