//! CFI (Canonical Fragment Identifier) support
//!
//! ```text
//! epubcfi(/6/4[chapter1]!/4/2/1:42)
//!         │  │          │ │ │ │ └── character offset 42
//!         │  │          │ │ │ └──── text run (odd = text)
//!         │  │          │ │ └────── element step
//!         │  │          │ └──────── body
//!         │  │          └────────── indirection (into content doc)
//!         │  └───────────────────── spine item with ID
//!         └──────────────────────── spine element
//! ```
//!
//! The navigator works with the content-document part only (everything
//! after the `!`), which [`CfiCodec`] generates and resolves.

mod codec;
mod generator;
mod order;
mod parser;
mod terminus;
mod types;

pub use codec::{Blacklist, CfiCodec, ContentCfiCodec};
pub use generator::{package_cfi, CfiBuilder};
pub use order::{compare_cfi_strings, reading_order};
pub use parser::{parse, try_parse, CfiParseError};
pub use terminus::{split_cfi, CfiParts};
pub use types::{CharacterOffset, Cfi, CfiPath, CfiStep, SpatialOffset, StepType, TextAssertion};
