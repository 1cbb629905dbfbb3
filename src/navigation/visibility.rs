//! Visibility classification
//!
//! Two strategies, picked once per navigator:
//!
//! - vertical offsets: compares document-relative element boxes against
//!   top/bottom offset lines; suited to scrolled single-column documents
//! - rectangles: rebases client rectangles into the viewport's columns;
//!   suited to paginated multi-column documents
//!
//! Results are `None` when the element has no geometry at all, `Some(0)`
//! when it lies outside the viewport and `Some(1..=100)` otherwise.

use super::normalize::normalized_rectangles;
use super::rebase::{adjust_rectangle, ColumnGeometry};
use crate::config::{NavigatorOptions, VisibleContentOffsets};
use crate::dom::{Document, NodeId};
use crate::layout::{FrameDimensions, LayoutOracle, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityStrategy {
    VerticalOffsets,
    Rectangles,
}

impl VisibilityStrategy {
    pub fn from_options(options: &NavigatorOptions) -> Self {
        if options.rectangle_based {
            Self::Rectangles
        } else {
            Self::VerticalOffsets
        }
    }
}

/// Classifies elements against one viewport
pub struct VisibilityClassifier<'a, L: ?Sized> {
    layout: &'a L,
    geometry: ColumnGeometry,
    strategy: VisibilityStrategy,
}

impl<'a, L: LayoutOracle + ?Sized> VisibilityClassifier<'a, L> {
    pub fn new(layout: &'a L, geometry: ColumnGeometry, strategy: VisibilityStrategy) -> Self {
        Self {
            layout,
            geometry,
            strategy,
        }
    }

    pub fn layout(&self) -> &'a L {
        self.layout
    }

    pub fn geometry(&self) -> &ColumnGeometry {
        &self.geometry
    }

    pub fn strategy(&self) -> VisibilityStrategy {
        self.strategy
    }

    /// Visibility of an element. Without `with_percentage` a visible
    /// element reports 100.
    pub fn visibility(
        &self,
        doc: &Document,
        node: NodeId,
        offsets: &VisibleContentOffsets,
        with_percentage: bool,
    ) -> Option<u8> {
        match self.strategy {
            VisibilityStrategy::VerticalOffsets => {
                self.by_vertical_offsets(doc, node, offsets, with_percentage)
            }
            VisibilityStrategy::Rectangles => self.by_rectangles(doc, node, with_percentage),
        }
    }

    /// Whether the element's trailing edge lies inside the viewport.
    ///
    /// Fragments before the first visible one (earlier pages) are ignored;
    /// everything after it must be visible and end within the frame.
    pub fn is_fully_visible(&self, doc: &Document, node: NodeId, offsets: &VisibleContentOffsets) -> bool {
        match self.strategy {
            VisibilityStrategy::VerticalOffsets => {
                let Some(rect) = self.layout.document_rect(doc, node) else {
                    return false;
                };
                let top = offsets.top.unwrap_or(0.0);
                rect.bottom > top && offsets.bottom.map(|b| rect.bottom <= b).unwrap_or(true)
            }
            VisibilityStrategy::Rectangles => {
                let Some(rects) = self.adjusted_client_rects(doc, node) else {
                    return false;
                };
                let Some(first) = rects.iter().position(|r| self.geometry.is_rect_visible(r)) else {
                    return false;
                };
                let trailing = &rects[first..];
                trailing.iter().all(|r| self.geometry.is_rect_visible(r))
                    && trailing
                        .last()
                        .map(|r| self.ends_within_frame(r))
                        .unwrap_or(false)
            }
        }
    }

    fn ends_within_frame(&self, rect: &Rect) -> bool {
        let frame = self.geometry.frame;
        if self.geometry.vertical_writing_mode {
            rect.right <= frame.width
        } else {
            rect.bottom <= frame.height
        }
    }

    fn by_vertical_offsets(
        &self,
        doc: &Document,
        node: NodeId,
        offsets: &VisibleContentOffsets,
        with_percentage: bool,
    ) -> Option<u8> {
        let rect = self.layout.document_rect(doc, node)?;
        let top_offset = offsets.top.unwrap_or(0.0);

        let below_top = rect.bottom > top_offset;
        let above_bottom = offsets.bottom.map(|b| rect.top < b).unwrap_or(true);
        if !(below_top && above_bottom) {
            return Some(0);
        }
        if !with_percentage {
            return Some(100);
        }
        Some(vertical_offset_percentage(&rect, top_offset))
    }

    /// Normalized client rectangles, a lone rectangle rebased two-phase
    fn adjusted_client_rects(&self, doc: &Document, node: NodeId) -> Option<Vec<Rect>> {
        let mut rects =
            normalized_rectangles(self.layout, doc, node, &VisibleContentOffsets::default()).client;
        if rects.is_empty() {
            return None;
        }
        if let [single] = rects.as_mut_slice() {
            adjust_rectangle(single, &self.geometry, true);
        }
        Some(rects)
    }

    fn by_rectangles(&self, doc: &Document, node: NodeId, with_percentage: bool) -> Option<u8> {
        let rects = self.adjusted_client_rects(doc, node)?;
        let Some(first_visible) = rects.iter().position(|r| self.geometry.is_rect_visible(r)) else {
            return Some(0);
        };
        if !with_percentage {
            return Some(100);
        }
        Some(rectangles_percentage(&rects, self.geometry.frame, first_visible))
    }
}

/// `100 - ceil(100 * hidden / height)` for an element whose top is above
/// the offset line, 100 otherwise
pub fn vertical_offset_percentage(rect: &Rect, top_offset: f64) -> u8 {
    if rect.top > top_offset || rect.height <= 0.0 {
        return 100;
    }
    let hidden = (100.0 * (top_offset - rect.top) / rect.height).ceil();
    clamp_percent(100.0 - hidden)
}

/// Visible share of an element's height.
///
/// Several fragments: every fragment from the first visible one counts as
/// visible. A single fragment loses whatever lies above the frame top and
/// below the frame bottom.
pub fn rectangles_percentage(rects: &[Rect], frame: FrameDimensions, first_visible: usize) -> u8 {
    let (total, visible) = match rects {
        [single] => {
            let above = (-single.top).max(0.0);
            let below = (single.bottom - frame.height).max(0.0);
            (single.height, single.height - above - below)
        }
        _ => (
            rects.iter().map(|r| r.height).sum::<f64>(),
            rects[first_visible..].iter().map(|r| r.height).sum::<f64>(),
        ),
    };
    if visible == total {
        return 100;
    }
    if total <= 0.0 {
        return 0;
    }
    clamp_percent((100.0 * visible / total).floor())
}

fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0) as u8
}
