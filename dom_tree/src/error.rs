//! DOM-mutation error kinds (spec.md §7). Parser soft errors are a separate,
//! out-of-band channel (`TreeSink::parse_error`, collected on
//! [`crate::sink::DomSink`]) and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("not found: {reference} is not a child of {parent}")]
    NotFound { parent: String, reference: String },

    #[error("invalid character in name: {0:?}")]
    InvalidCharacter(String),

    #[error("namespace error: {0}")]
    Namespace(String),

    #[error("index size error: index {index} out of bounds (len {len})")]
    IndexSize { index: usize, len: usize },

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("invalid node type for this operation: {0}")]
    InvalidNodeType(String),
}

pub type DomResult<T> = Result<T, DomError>;
