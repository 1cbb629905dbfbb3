//! In-memory content document
//!
//! A small mutable node tree standing in for the rendered document:
//!
//! - `document`: arena tree with clone/replace/split/normalize
//! - `parser`: XHTML markup parser (quick-xml)
//! - `query`: namespace-aware tag lookup
//! - `scoped`: self-reverting temporary edits

mod document;
mod node;
pub mod parser;
pub mod query;
mod scoped;
pub mod text;

pub use document::{Descendants, Document};
pub use node::{Attribute, ElementData, NodeData, NodeId};
pub use parser::{parse_markup, try_parse_markup, MarkupError};
pub use scoped::ScopedEdit;
