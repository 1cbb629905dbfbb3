//! CFI Navigator Library
//!
//! Maps between a paginated e-book chapter's visual layout and EPUB
//! Canonical Fragment Identifiers: which node starts or ends the current
//! page, which page a CFI lands on, and what a bookmark for the page holds.
//!
//! # Modules
//!
//! - `navigation`: visibility classification, offset search, page index and bookmarks
//! - `layout`: the geometry oracle trait and a monospace reflow implementation
//! - `dom`: in-memory document tree, markup parser and scoped edits
//! - `cfi`: CFI parsing, generation and content-document resolution
//! - `package`: EPUB container and spine loading

pub mod cfi;
pub mod config;
pub mod dom;
pub mod error;
pub mod layout;
pub mod navigation;
pub mod package;

pub use config::{NavigatorOptions, PageIndexMethod, PaginationInfo, VisibleContentOffsets};
pub use error::{NavigationError, Result};
pub use navigation::{Bookmark, CfiNavigator, NavigationLogic, VisibleElement};
