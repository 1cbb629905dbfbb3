//! Error types for the CFI navigator

use thiserror::Error;

use crate::cfi::CfiParseError;
use crate::dom::MarkupError;
use crate::package::PackageError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Navigation error type
///
/// Lookups that can simply find nothing return `Option`; these variants
/// cover input that is malformed or cannot be loaded at all.
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Invalid CFI: {0}")]
    InvalidCfi(#[from] CfiParseError),

    #[error("CFI does not resolve in this document: {0}")]
    UnresolvedCfi(String),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
