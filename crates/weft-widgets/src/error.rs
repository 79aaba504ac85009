//! Error types for the widget subsystem.
//!
//! Nothing here is fatal to the hosting document: callers log, notify, or
//! fall back to a placeholder.

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors surfaced by widget controllers and persisted sync.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[non_exhaustive]
pub enum WidgetError {
    /// An attribute key that would not survive an encode/decode round trip.
    #[error("invalid attribute key {0:?}")]
    #[diagnostic(
        code(weft::widget::attribute_key),
        help("keys may only contain ASCII letters, digits, '_', '-' and '.'")
    )]
    InvalidAttributeKey(SmolStr),

    /// A widget type identifier that cannot appear in a marker.
    #[error("invalid widget type {0:?}")]
    #[diagnostic(
        code(weft::widget::type_name),
        help("types may only contain ASCII letters, digits, '_', '-', '.' and '/'")
    )]
    InvalidWidgetType(SmolStr),

    /// Insert offset past the end of the document.
    #[error("offset {offset} is past the end of the document ({len} chars)")]
    #[diagnostic(code(weft::widget::offset))]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// The viewer may not edit or delete this widget.
    #[error("widget {0} cannot be configured by the current viewer")]
    #[diagnostic(code(weft::widget::not_configurable))]
    NotConfigurable(SmolStr),

    /// The persisted snapshot has not been loaded (or does not exist).
    #[error("widget {0} is not available")]
    #[diagnostic(code(weft::widget::unavailable))]
    Unavailable(SmolStr),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Failures reported by the remote widget store.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[non_exhaustive]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("widget store unreachable: {0}")]
    #[diagnostic(code(weft::store::offline))]
    Offline(String),

    #[error("widget {0} not found")]
    #[diagnostic(code(weft::store::not_found))]
    NotFound(SmolStr),

    #[error("not permitted to modify widget {0}")]
    #[diagnostic(code(weft::store::forbidden))]
    Forbidden(SmolStr),

    /// The backend answered but refused the request.
    #[error("request rejected: {0}")]
    #[diagnostic(code(weft::store::rejected))]
    Rejected(String),
}
