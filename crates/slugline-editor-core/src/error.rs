//! Error types for binder operations.

use thiserror::Error;

use crate::element::ElementId;

/// Conditions under which a binder operation cannot resolve what it addresses.
///
/// None of these are fatal. Public binder operations log them and return
/// without touching state; structural drift is repaired by resynchronizing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindError {
    /// Scene, document or format set is not attached.
    #[error("binder is not bound")]
    NotBound,

    /// Block number outside the document.
    #[error("block {index} out of range (document has {count} blocks)")]
    BlockOutOfRange { index: usize, count: usize },

    /// Block carries no linkage, or one that does not resolve in the bound scene.
    #[error("block {0} has no valid linkage")]
    MissingLinkage(usize),

    /// Element handle no longer resolves in the bound scene.
    #[error("element {0} is not in the scene")]
    ElementNotInScene(ElementId),

    /// Character offset outside the document.
    #[error("offset {offset} out of range (document has {len} chars)")]
    OffsetOutOfRange { offset: usize, len: usize },
}
