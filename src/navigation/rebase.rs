//! Column rebasing
//!
//! In multi-column layout WebKit reports a single client rectangle for an
//! element that spills over several columns. Its `top` is negative (the
//! rectangle looks as if it were laid out from a later column) or its
//! `bottom` runs past the frame (continued below the first column). These
//! helpers walk such a rectangle column by column until its coordinates
//! belong to one real column.

use crate::config::NavigatorOptions;
use crate::layout::{FrameDimensions, Rect};

/// Viewport and column geometry for one resolution pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnGeometry {
    pub frame: FrameDimensions,
    /// Column width plus gap; the frame width when not paginated
    pub column_full_width: f64,
    pub right_to_left: bool,
    pub vertical_writing_mode: bool,
    pub column_count: usize,
    pub visible_column_count: usize,
}

impl ColumnGeometry {
    pub fn new(frame: FrameDimensions, options: &NavigatorOptions) -> Self {
        let pagination = options.pagination_info.as_ref();
        let vertical_writing_mode = options.is_vertical_writing_mode();

        let mut column_full_width = match pagination {
            Some(p) if !vertical_writing_mode => p.column_width + p.column_gap,
            _ => frame.width,
        };
        if !(column_full_width > 0.0 && column_full_width.is_finite()) {
            tracing::warn!(
                "Column full width is {}, treating the document as unpaginated",
                column_full_width
            );
            column_full_width = frame.width;
        }

        Self {
            frame,
            column_full_width,
            right_to_left: options.is_right_to_left(),
            vertical_writing_mode,
            column_count: pagination.map(|p| p.column_count.max(1)).unwrap_or(1),
            visible_column_count: pagination
                .map(|p| p.visible_column_count.max(1))
                .unwrap_or(1),
        }
    }

    /// Whether an adjusted rectangle starts inside the viewport on the
    /// pagination axis
    pub fn is_rect_visible(&self, rect: &Rect) -> bool {
        if self.vertical_writing_mode {
            rect.top >= 0.0 && rect.top < self.frame.height
        } else {
            rect.left >= 0.0 && rect.left < self.frame.width
        }
    }

    /// Horizontal column step; columns advance leftwards in RTL
    fn column_step(&self) -> f64 {
        let step = if self.column_full_width > 0.0 {
            self.column_full_width
        } else {
            self.frame.width
        };
        if self.right_to_left {
            -step
        } else {
            step
        }
    }

    /// Shift counts are only meaningful for finite rectangles in a frame with height
    fn can_rebase(&self, rect: &Rect) -> bool {
        self.frame.height > 0.0 && rect.top.is_finite() && rect.bottom.is_finite()
    }
}

/// Rebase a single client rectangle onto the column it belongs to.
///
/// First moves the rectangle back one column per frame height its top lies
/// above the frame, in a single step. With `look_for_first_visible`, then moves it forward while
/// it overflows the frame bottom, stopping at the first column that is
/// visible. Returns the number of shifts applied.
pub fn adjust_rectangle(rect: &mut Rect, geometry: &ColumnGeometry, look_for_first_visible: bool) -> usize {
    if geometry.vertical_writing_mode || !geometry.can_rebase(rect) {
        return 0;
    }
    let step = geometry.column_step();
    let height = geometry.frame.height;
    let mut shifts = 0;

    if rect.top < 0.0 {
        let back = (-rect.top / height).ceil();
        rect.offset(-step * back, height * back);
        shifts += back as usize;
    }

    if look_for_first_visible {
        for _ in 0..forward_shift_limit(rect, geometry) {
            if geometry.is_rect_visible(rect) {
                break;
            }
            rect.offset(step, -height);
            shifts += 1;
        }
    }
    shifts
}

/// Columns a rectangle can move forward before its bottom is inside the
/// frame, never more than the chapter has
fn forward_shift_limit(rect: &Rect, geometry: &ColumnGeometry) -> usize {
    if rect.bottom < geometry.frame.height {
        return 0;
    }
    let columns = (rect.bottom / geometry.frame.height).floor();
    (columns as usize).min(geometry.column_count)
}

/// Hide `percent` of an element's height from its top.
///
/// Several fragments: leading fragments are dropped while the accumulated
/// height stays within the hidden part, always keeping the last one. A
/// single fragment is rebased onto the last column it reaches and its top
/// moved down by the hidden height.
pub fn trim_rectangles_by_vertical_offset(rects: &mut Vec<Rect>, percent: f64, geometry: &ColumnGeometry) {
    if geometry.vertical_writing_mode || rects.is_empty() {
        return;
    }
    let total: f64 = rects.iter().map(|r| r.height).sum();
    let hidden = total * percent / 100.0;

    if rects.len() > 1 {
        let mut accumulated = 0.0;
        let mut drop = 0;
        for rect in &rects[..rects.len() - 1] {
            accumulated += rect.height;
            if accumulated > hidden {
                break;
            }
            drop += 1;
        }
        rects.drain(..drop);
        return;
    }

    let rect = &mut rects[0];
    if geometry.can_rebase(rect) {
        let forward = forward_shift_limit(rect, geometry) as f64;
        rect.offset(geometry.column_step() * forward, -geometry.frame.height * forward);
    }
    rect.top += hidden;
    rect.height -= hidden;
}
