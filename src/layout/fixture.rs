//! Fixed-geometry oracle for tests
//!
//! Reports exactly the rectangles it was given, so tests can reproduce
//! engine quirks (wrapped single rectangles, empty fragments, RTL and
//! vertical layouts) that a real reflow would not produce on demand.

use std::collections::HashMap;

use super::{DocumentOffset, FrameDimensions, LayoutOracle, Rect};
use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, Default)]
pub struct StaticLayout {
    frame: FrameDimensions,
    content: Option<FrameDimensions>,
    rects: HashMap<NodeId, Vec<Rect>>,
    offsets: HashMap<NodeId, DocumentOffset>,
}

impl StaticLayout {
    pub fn new(frame: FrameDimensions) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    pub fn with_rects(mut self, node: NodeId, rects: Vec<Rect>) -> Self {
        self.rects.insert(node, rects);
        self
    }

    /// Document offset for a node, overriding its rectangles' origin
    pub fn with_offset(mut self, node: NodeId, left: f64, top: f64) -> Self {
        self.offsets.insert(node, DocumentOffset { left, top });
        self
    }

    pub fn with_content(mut self, content: FrameDimensions) -> Self {
        self.content = Some(content);
        self
    }
}

impl LayoutOracle for StaticLayout {
    fn frame_dimensions(&self) -> FrameDimensions {
        self.frame
    }

    fn content_dimensions(&self, _doc: &Document) -> FrameDimensions {
        self.content.unwrap_or(self.frame)
    }

    fn bounding_rect(&self, _doc: &Document, node: NodeId) -> Option<Rect> {
        Rect::union_all(self.rects.get(&node)?)
    }

    fn client_rects(&self, _doc: &Document, node: NodeId) -> Vec<Rect> {
        self.rects.get(&node).cloned().unwrap_or_default()
    }

    fn document_offset(&self, doc: &Document, node: NodeId) -> Option<DocumentOffset> {
        if let Some(offset) = self.offsets.get(&node) {
            return Some(*offset);
        }
        self.bounding_rect(doc, node).map(|rect| DocumentOffset {
            left: rect.left,
            top: rect.top,
        })
    }
}
