//! Development server with live reload for the folio site.
//!
//! Watches the site sources, re-copies changed passthroughs and tells
//! connected browsers to reload, or to swap a stylesheet in place.

pub mod reload;
pub mod server;
pub mod watcher;

pub use reload::{inject_reload_script, reload_client_script, ReloadHub, ReloadMessage};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent, WatchRules};
