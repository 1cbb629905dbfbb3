//! Rectangle geometry in viewport pixel space

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in viewport-relative pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Build a rectangle from its edges; width and height are derived
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Build a rectangle from its origin and size
    pub fn from_origin(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::from_edges(left, top, left + width, top + height)
    }

    /// Zero-sized rectangle at a point
    pub fn point(left: f64, top: f64) -> Self {
        Self::from_edges(left, top, left, top)
    }

    /// Copy of a raw measurement translated by content offsets.
    ///
    /// Width and height are recomputed from the edges, so a raw rectangle
    /// with stale size fields comes out consistent.
    pub fn normalized(raw: &Rect, left_offset: f64, top_offset: f64) -> Self {
        let mut rect = Self::from_edges(raw.left, raw.top, raw.right, raw.bottom);
        rect.offset(left_offset, top_offset);
        rect
    }

    /// Translate in place
    pub fn offset(&mut self, left_offset: f64, top_offset: f64) {
        self.left += left_offset;
        self.right += left_offset;
        self.top += top_offset;
        self.bottom += top_offset;
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_edges(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Union of a set of rectangles
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc: Option<Rect>, rect| {
            Some(match acc {
                Some(current) => current.union(rect),
                None => *rect,
            })
        })
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Size of the visible viewport (the content frame)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: f64,
    pub height: f64,
}

impl FrameDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
