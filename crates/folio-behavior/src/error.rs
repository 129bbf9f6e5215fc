//! Error type for component setup.

use folio_dom::{Selector, SelectorError};

/// Errors that can occur while mounting components.
///
/// Missing elements are never errors; they leave a component inert.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    #[error("Invalid selector '{selector}': {source}")]
    Selector {
        selector: String,
        source: SelectorError,
    },

    #[error("Invalid root margin '{0}'")]
    RootMargin(String),
}

/// Parse a selector, attaching the selector text to any error.
pub(crate) fn compile(selector: &str) -> Result<Selector, BehaviorError> {
    Selector::parse(selector).map_err(|source| BehaviorError::Selector {
        selector: selector.to_string(),
        source,
    })
}
