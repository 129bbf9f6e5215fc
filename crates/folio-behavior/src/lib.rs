//! Page behaviour for the folio site.
//!
//! The components in this crate wire page events to page mutations: the
//! mobile navigation panel, smooth in-page scrolling, lazy image loading,
//! modal popups, reveal-on-scroll animations and preload-class removal.
//! They run against [`Page`], a headless page runtime that owns the document,
//! dispatches events, runs timers on a virtual clock and evaluates
//! intersection observers.

pub mod bootstrap;
pub mod debounce;
pub mod error;
pub mod lazy_load;
pub mod menu;
pub mod navigation;
pub mod observer;
pub mod popup;
pub mod preload;
pub mod runtime;
pub mod scroll_animations;
pub mod settings;
pub mod smooth_scroll;
pub mod traits;

pub use bootstrap::{bootstrap, Site, SiteHandle};
pub use debounce::Debounce;
pub use error::BehaviorError;
pub use lazy_load::LazyLoad;
pub use menu::{build_mobile_menu, read_menu, MenuNode, MobileEntry, MobileLink, MobileList};
pub use navigation::Navigation;
pub use observer::{IntersectionEntry, ObserverId, ObserverOptions, RootMargin};
pub use popup::{close_container, close_popup, open_container, open_popup, Popup, ScrollLock};
pub use preload::PreloadHandler;
pub use runtime::{
    Environment, Event, EventKind, EventTarget, ListenerId, Page, ReadyState, ScrollBehavior,
    ScrollToOptions, Subscriptions, TimerId, Viewport,
};
pub use scroll_animations::ScrollAnimations;
pub use settings::{ScrollLockPolicy, Settings};
pub use smooth_scroll::SmoothScroll;
pub use traits::Component;
