//! CFI builder
//!
//! Assembles CFI paths step by step. Indices passed to the builder are
//! 0-based positions; the builder converts them to CFI numbering (elements
//! are even, text chunks odd).

use super::parser;
use super::types::*;
use super::CfiParseError;

#[derive(Debug, Clone, Default)]
pub struct CfiBuilder {
    path: CfiPath,
}

impl CfiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Package document spine step (/6 in EPUB 3)
    pub fn package_step(mut self) -> Self {
        self.path.push(CfiStep::element(6));
        self
    }

    /// Spine item at a 0-based index: index 0 -> /2, index 1 -> /4
    pub fn spine_item(mut self, index: usize) -> Self {
        self.path.push(CfiStep::element(element_step(index)));
        self
    }

    pub fn spine_item_with_id(mut self, index: usize, id: impl Into<String>) -> Self {
        self.path
            .push(CfiStep::element_with_id(element_step(index), id));
        self
    }

    /// Step into the content document
    pub fn indirection(mut self) -> Self {
        self.path.push(CfiStep::indirection());
        self
    }

    /// Element child at a 0-based index, with an optional id assertion
    pub fn element(mut self, index: usize, id: Option<&str>) -> Self {
        let step = match id {
            Some(id) => CfiStep::element_with_id(element_step(index), id),
            None => CfiStep::element(element_step(index)),
        };
        self.path.push(step);
        self
    }

    /// Text chunk following the `index`-th element child: 0 -> /1, 1 -> /3
    pub fn text_chunk(mut self, index: usize) -> Self {
        self.path.push(CfiStep::element((index * 2 + 1) as u32));
        self
    }

    /// Append the steps of an already generated content path
    pub fn steps(mut self, steps: &[CfiStep]) -> Self {
        self.path.steps.extend_from_slice(steps);
        self
    }

    pub fn character_offset(mut self, offset: u32) -> Self {
        self.path.set_character_offset(offset);
        self
    }

    pub fn spatial_offset(mut self, x: f64, y: f64) -> Self {
        self.path.spatial_offset = Some(SpatialOffset { x, y });
        self
    }

    pub fn build(self) -> Cfi {
        Cfi::new(self.path)
    }

    pub fn path(&self) -> &CfiPath {
        &self.path
    }

    pub fn into_path(self) -> CfiPath {
        self.path
    }
}

fn element_step(index: usize) -> u32 {
    ((index + 1) * 2) as u32
}

/// Full publication CFI for a content-document CFI in a spine item.
///
/// `epubcfi(/6/N[idref]!<content>)`; the content part may carry its own
/// leading `!` or `epubcfi(...)` wrapper.
pub fn package_cfi(
    spine_index: usize,
    idref: Option<&str>,
    content_cfi: &str,
) -> Result<Cfi, CfiParseError> {
    let content = parser::parse(content_cfi.trim_start_matches('!'))?;
    let builder = CfiBuilder::new().package_step();
    let builder = match idref {
        Some(id) => builder.spine_item_with_id(spine_index, id),
        None => builder.spine_item(spine_index),
    };
    let mut path = builder
        .indirection()
        .steps(content.path.content_steps())
        .into_path();
    path.character_offset = content.path.character_offset;
    path.spatial_offset = content.path.spatial_offset;
    Ok(Cfi::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_numbering() {
        let cfi = CfiBuilder::new()
            .element(1, None)
            .element(0, Some("p1"))
            .text_chunk(0)
            .character_offset(42)
            .build();
        assert_eq!(cfi.to_string(), "epubcfi(/4/2[p1]/1:42)");
    }

    #[test]
    fn test_spine_index_conversion() {
        let cfi = CfiBuilder::new().package_step().spine_item(0).build();
        assert_eq!(cfi.to_string(), "epubcfi(/6/2)");

        let cfi = CfiBuilder::new().package_step().spine_item(4).build();
        assert_eq!(cfi.to_string(), "epubcfi(/6/10)");
    }

    #[test]
    fn test_package_cfi_wraps_content_path() {
        let cfi = package_cfi(1, Some("chap01"), "/4/2/1:15").unwrap();
        assert_eq!(cfi.to_string(), "epubcfi(/6/4[chap01]!/4/2/1:15)");
        assert_eq!(cfi.spine_index(), Some(1));

        let cfi = package_cfi(0, None, "!/4/6").unwrap();
        assert_eq!(cfi.to_string(), "epubcfi(/6/2!/4/6)");

        assert!(package_cfi(0, None, "/4/x").is_err());
    }
}
