//! CFI (Canonical Fragment Identifier) types
//!
//! Format: epubcfi(/6/4[chap01ref]!/4/2/22/3:268)
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed CFI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cfi {
    pub path: CfiPath,
}

/// Sequence of steps with an optional terminus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfiPath {
    pub steps: Vec<CfiStep>,
    pub character_offset: Option<CharacterOffset>,
    pub spatial_offset: Option<SpatialOffset>,
}

/// A single step in a CFI path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfiStep {
    pub step_type: StepType,
    /// `[id]` assertion
    pub id_assertion: Option<String>,
    pub text_assertion: Option<TextAssertion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    /// Child index; even numbers are elements, odd numbers are text chunks
    Element(u32),
    /// `!` - steps into a referenced document
    Indirection,
}

/// Text location assertion `[prefix,suffix;key=value]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAssertion {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub parameters: Vec<(String, String)>,
}

/// `:n` terminus, in UTF-16 code units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterOffset {
    pub offset: u32,
    pub assertion: Option<TextAssertion>,
}

/// `@x:y` terminus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialOffset {
    pub x: f64,
    pub y: f64,
}

impl Eq for SpatialOffset {}

impl Cfi {
    pub fn new(path: CfiPath) -> Self {
        Self { path }
    }

    /// Get the spine index if this CFI references a spine item.
    ///
    /// `/6/N` addresses the spine; N is `2 * (index + 1)`.
    pub fn spine_index(&self) -> Option<u32> {
        match self.path.steps.as_slice() {
            [first, second, ..] if first.step_type == StepType::Element(6) => {
                second.element_index().map(|n| (n / 2).saturating_sub(1))
            }
            _ => None,
        }
    }
}

impl CfiPath {
    pub fn with_steps(steps: Vec<CfiStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    pub fn push(&mut self, step: CfiStep) {
        self.steps.push(step);
    }

    pub fn set_character_offset(&mut self, offset: u32) {
        self.character_offset = Some(CharacterOffset {
            offset,
            assertion: None,
        });
    }

    /// Steps inside the content document: everything after the last `!`
    pub fn content_steps(&self) -> &[CfiStep] {
        match self.steps.iter().rposition(CfiStep::is_indirection) {
            Some(idx) => &self.steps[idx + 1..],
            None => &self.steps,
        }
    }
}

impl CfiStep {
    pub fn element(index: u32) -> Self {
        Self {
            step_type: StepType::Element(index),
            id_assertion: None,
            text_assertion: None,
        }
    }

    pub fn element_with_id(index: u32, id: impl Into<String>) -> Self {
        Self {
            id_assertion: Some(id.into()),
            ..Self::element(index)
        }
    }

    pub fn indirection() -> Self {
        Self {
            step_type: StepType::Indirection,
            id_assertion: None,
            text_assertion: None,
        }
    }

    pub fn is_indirection(&self) -> bool {
        matches!(self.step_type, StepType::Indirection)
    }

    pub fn element_index(&self) -> Option<u32> {
        match self.step_type {
            StepType::Element(n) => Some(n),
            StepType::Indirection => None,
        }
    }

    /// Odd steps address text between elements
    pub fn is_text_step(&self) -> bool {
        self.element_index().map(|n| n % 2 == 1).unwrap_or(false)
    }
}

/// Escape CFI special characters inside an assertion
fn escape_assertion(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '^' | '[' | ']' | '(' | ')' | ',' | ';' | '=') {
            out.push('^');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epubcfi({})", self.path)
    }
}

impl fmt::Display for CfiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        if let Some(ref offset) = self.character_offset {
            write!(f, ":{}", offset.offset)?;
            if let Some(ref assertion) = offset.assertion {
                write!(f, "{}", assertion)?;
            }
        }
        if let Some(ref spatial) = self.spatial_offset {
            write!(f, "@{}:{}", spatial.x, spatial.y)?;
        }
        Ok(())
    }
}

impl fmt::Display for CfiStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step_type {
            StepType::Element(n) => write!(f, "/{}", n)?,
            StepType::Indirection => write!(f, "!")?,
        }
        if let Some(ref id) = self.id_assertion {
            write!(f, "[{}]", escape_assertion(id))?;
        }
        if let Some(ref assertion) = self.text_assertion {
            write!(f, "{}", assertion)?;
        }
        Ok(())
    }
}

impl fmt::Display for TextAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if let Some(ref prefix) = self.prefix {
            write!(f, "{}", escape_assertion(prefix))?;
        }
        if self.prefix.is_some() || self.suffix.is_some() {
            write!(f, ",")?;
        }
        if let Some(ref suffix) = self.suffix {
            write!(f, "{}", escape_assertion(suffix))?;
        }
        for (key, value) in &self.parameters {
            write!(f, ";{}={}", key, value)?;
        }
        write!(f, "]")
    }
}
