//! In-memory document model for the folio behaviour layer.
//!
//! This crate provides an arena-backed element tree, a small CSS selector
//! engine used for element lookup, layout rectangles, and a lenient HTML
//! loader for reading built pages.

pub mod document;
pub mod geometry;
pub mod html;
pub mod selector;

pub use document::{Document, NodeData, NodeId};
pub use geometry::Rect;
pub use html::{parse_html, HtmlError};
pub use selector::{select, select_all, Selector, SelectorError};
