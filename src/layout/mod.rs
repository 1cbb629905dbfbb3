//! Layout measurement
//!
//! The resolver never lays content out itself. Everything it knows about
//! geometry comes through a [`LayoutOracle`]: a browser binding in a real
//! reader, [`FlowLayout`] for the probe tool and tests.

mod flow;
mod rect;

#[cfg(test)]
pub(crate) mod fixture;

pub use flow::{FlowLayout, FlowMetrics, FragmentMode};
pub use rect::{FrameDimensions, Rect};

use serde::Serialize;

use crate::dom::{Document, NodeId};

/// Position of an element relative to the document origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DocumentOffset {
    pub left: f64,
    pub top: f64,
}

/// Text position under a screen point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaretPosition {
    /// Container node (a text node, or an element between text)
    pub node: NodeId,
    /// UTF-16 offset within `node`
    pub offset: usize,
}

/// Geometry source for a rendered document
///
/// All rectangles are viewport-relative, the way `getClientRects()` and
/// `getBoundingClientRect()` report them. Nodes without geometry (hidden,
/// empty, detached) return `None` / an empty list rather than an error.
pub trait LayoutOracle {
    /// Size of the viewport
    fn frame_dimensions(&self) -> FrameDimensions;

    /// Size of the root element's box
    fn content_dimensions(&self, _doc: &Document) -> FrameDimensions {
        self.frame_dimensions()
    }

    /// Union box of a node
    fn bounding_rect(&self, doc: &Document, node: NodeId) -> Option<Rect>;

    /// One box per line or column fragment of a node
    fn client_rects(&self, doc: &Document, node: NodeId) -> Vec<Rect>;

    /// Element position relative to the document, as the host reports it
    fn document_offset(&self, doc: &Document, node: NodeId) -> Option<DocumentOffset>;

    /// Whether [`caret_position_from_point`](Self::caret_position_from_point) is available
    fn supports_caret_positions(&self) -> bool {
        false
    }

    /// Text position under a viewport point
    fn caret_position_from_point(&self, _doc: &Document, _x: f64, _y: f64) -> Option<CaretPosition> {
        None
    }

    /// Document-relative box of a node.
    ///
    /// Nodes with an offset but no box come back as a zero-sized rectangle
    /// at that offset.
    fn document_rect(&self, doc: &Document, node: NodeId) -> Option<Rect> {
        let offset = self.document_offset(doc, node)?;
        Some(match self.bounding_rect(doc, node) {
            Some(bounds) => Rect::from_origin(offset.left, offset.top, bounds.width, bounds.height),
            None => Rect::point(offset.left, offset.top),
        })
    }
}
