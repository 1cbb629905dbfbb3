//! Page-index computation
//!
//! Two algorithms coexist. The offset method divides the element's document
//! offset by the column size and nudges onto the next page when the element
//! sits in the last tenth of a column. The rectangle method rebases client
//! rectangles into chapter coordinates and divides by the column stride.
//! [`PageIndexMethod`] picks which one CFI lookups use.

use tracing::{debug, warn};

use super::normalize::normalized_rectangles;
use super::rebase::{adjust_rectangle, trim_rectangles_by_vertical_offset};
use super::CfiNavigator;
use crate::cfi::{split_cfi, Blacklist, CfiCodec, CfiParts};
use crate::config::{PageIndexMethod, VisibleContentOffsets};
use crate::dom::{query, Document, NodeId, ScopedEdit};
use crate::layout::LayoutOracle;

/// Share of a column past which the offset method rounds up
const NEXT_PAGE_THRESHOLD: f64 = 0.9;

impl<'a, L: LayoutOracle + ?Sized, C: CfiCodec> CfiNavigator<'a, L, C> {
    /// Offsets that move viewport rectangles into chapter coordinates
    pub fn visible_content_offsets(&self) -> VisibleContentOffsets {
        let page_offset = self
            .options
            .pagination_info
            .as_ref()
            .map(|p| p.page_offset)
            .unwrap_or(0.0);
        if self.options.is_vertical_writing_mode() {
            VisibleContentOffsets::top(page_offset)
        } else if self.options.is_right_to_left() {
            VisibleContentOffsets::left(-page_offset)
        } else {
            VisibleContentOffsets::left(page_offset)
        }
    }

    /// Column index of an element from its client rectangles, clamped to
    /// the chapter's columns. `spatial_vertical_offset` hides that percentage
    /// of the element from its top first.
    pub fn page_for_element_by_rectangles(
        &self,
        doc: &Document,
        node: NodeId,
        spatial_vertical_offset: f64,
    ) -> Option<usize> {
        let geometry = self.classifier.geometry();
        let mut rects =
            normalized_rectangles(self.layout, doc, node, &self.visible_content_offsets()).client;
        if rects.is_empty() {
            return None;
        }
        if spatial_vertical_offset != 0.0 {
            trim_rectangles_by_vertical_offset(&mut rects, spatial_vertical_offset, geometry);
        }
        if let [single] = rects.as_mut_slice() {
            adjust_rectangle(single, geometry, false);
        }

        let first = rects[0];
        let column_full_width = geometry.column_full_width;
        let page = if geometry.vertical_writing_mode {
            floor_ratio(first.top, geometry.frame.height)
        } else {
            let left = if geometry.right_to_left {
                column_full_width * geometry.visible_column_count as f64 - first.left
            } else {
                first.left
            };
            floor_ratio(left, column_full_width)
        };

        let last = geometry.column_count.saturating_sub(1);
        Some(page.clamp(0.0, last as f64) as usize)
    }

    /// Page of a point inside an element, from its document offset.
    ///
    /// The point sits `x_percent` / `y_percent` into the element's box.
    /// Elements past the first column width are placed by their horizontal
    /// position, the rest by their vertical one; in both cases a point in
    /// the last tenth of a column height counts as the next page.
    pub fn page_for_element(
        &self,
        doc: &Document,
        node: NodeId,
        x_percent: f64,
        y_percent: f64,
    ) -> Option<usize> {
        let rect = self.layout.document_rect(doc, node)?;
        let pagination = self.options.pagination_info.clone().unwrap_or_default();

        let column_width = if pagination.column_width > 0.0 {
            pagination.column_width
        } else {
            self.layout.frame_dimensions().width
        };
        let column_height = self.layout.content_dimensions(doc).height;

        // The sample point sits inside the box, so the next-page nudge below
        // sees the shifted point rather than the box's top edge.
        let left = rect.left + x_percent * rect.width / 100.0;
        let top = rect.top + y_percent * rect.height / 100.0;
        let rect_height = if column_height > 0.0 {
            top / column_height
        } else {
            0.0
        };

        let mut column = if left > column_width && column_width > 0.0 {
            (left / column_width).floor()
        } else {
            rect_height.floor()
        };
        if rect_height % 1.0 > NEXT_PAGE_THRESHOLD {
            column += 1.0;
        }
        let column = if column.is_finite() {
            column.max(0.0) as usize
        } else {
            0
        };

        Some(pagination.current_spread_index * pagination.visible_column_count + column)
    }

    /// Page a CFI lands on.
    ///
    /// Text targets are measured through a one-character marker spliced in
    /// at the character offset and removed afterwards.
    pub fn page_for_element_cfi(&self, doc: &mut Document, cfi: &str) -> Option<usize> {
        let parts = split_cfi(cfi);
        if let Some(body) = query::find_body(doc) {
            doc.normalize(body);
        }

        let wrapped = format!("epubcfi({})", parts.cfi);
        let target = match self
            .codec
            .resolve_partial_cfi(doc, &wrapped, &self.blacklist)
        {
            Ok(node) => node,
            Err(e) => {
                warn!("Can't find element for CFI {}: {}", cfi, e);
                return None;
            }
        };

        if !doc.is_text(target) {
            return self.page_for_target(doc, target, &parts);
        }

        let (text_node, offset) =
            self.codec
                .locate_character_offset(doc, target, parts.chr, &self.blacklist);
        let mut edit = ScopedEdit::new(doc);
        let marker = edit.create_element("span");
        let dash = edit.create_text("-");
        edit.append_child(marker, dash);
        if !edit.inject_at_offset(text_node, offset, marker) {
            edit.discard(marker);
            warn!("Can't place a marker for CFI {}", cfi);
            return None;
        }
        self.page_for_target(&edit, marker, &parts)
    }

    fn page_for_target(&self, doc: &Document, node: NodeId, parts: &CfiParts) -> Option<usize> {
        let by_offsets = || self.page_for_element(doc, node, 1.0, 1.0);
        let by_rectangles = || self.page_for_element_by_rectangles(doc, node, f64::from(parts.y));

        let page = if tracing::enabled!(tracing::Level::DEBUG) {
            let offsets = by_offsets();
            let rectangles = by_rectangles();
            if offsets != rectangles {
                debug!(
                    ?offsets,
                    ?rectangles,
                    "page index methods disagree for {}",
                    parts.cfi
                );
            }
            match self.options.page_index_method {
                PageIndexMethod::Offsets => offsets,
                PageIndexMethod::Rectangles => rectangles,
            }
        } else {
            match self.options.page_index_method {
                PageIndexMethod::Offsets => by_offsets(),
                PageIndexMethod::Rectangles => by_rectangles(),
            }
        };
        page.map(|page| self.clamp_to_columns(page))
    }

    /// Keep a page index inside the chapter's columns when paginated
    fn clamp_to_columns(&self, page: usize) -> usize {
        if self.options.pagination_info.is_none() {
            return page;
        }
        page.min(self.classifier.geometry().column_count.saturating_sub(1))
    }

    pub fn is_element_cfi_visible(&self, doc: &mut Document, cfi: &str, page: usize) -> bool {
        self.page_for_element_cfi(doc, cfi) == Some(page)
    }

    /// Node a CFI points at; the terminus is ignored
    pub fn element_by_cfi(&self, doc: &Document, cfi: &str, blacklist: &Blacklist) -> Option<NodeId> {
        let parts = split_cfi(cfi);
        let wrapped = format!("epubcfi({})", parts.cfi);
        self.codec
            .resolve_partial_cfi(doc, &wrapped, blacklist)
            .map_err(|e| warn!("Can't find element for CFI {}: {}", cfi, e))
            .ok()
    }

    pub fn element_by_id(&self, doc: &Document, id: &str) -> Option<NodeId> {
        doc.element_by_id(id)
    }

    pub fn page_for_element_id(&self, doc: &Document, id: &str) -> Option<usize> {
        let node = self.element_by_id(doc, id)?;
        self.page_for_element(doc, node, 0.0, 0.0)
            .map(|page| self.clamp_to_columns(page))
    }
}

fn floor_ratio(value: f64, divisor: f64) -> f64 {
    if divisor <= 0.0 {
        return 0.0;
    }
    let ratio = (value / divisor).floor();
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NavigatorOptions, PaginationInfo};
    use crate::dom::parse_markup;
    use crate::layout::fixture::StaticLayout;
    use crate::layout::{FrameDimensions, Rect};

    fn pagination() -> PaginationInfo {
        PaginationInfo {
            column_width: 250.0,
            column_gap: 20.0,
            column_count: 3,
            visible_column_count: 1,
            ..PaginationInfo::default()
        }
    }

    fn doc() -> (Document, NodeId) {
        let doc = parse_markup(r#"<html><body><p id="p">text</p></body></html>"#);
        let p = doc.element_by_id("p").unwrap();
        (doc, p)
    }

    #[test]
    fn test_rectangles_page_from_left_edge() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(300.0, 10.0, 200.0, 20.0)]);
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element_by_rectangles(&doc, p, 0.0), Some(1));
    }

    #[test]
    fn test_rectangles_page_clamps() {
        let (doc, p) = doc();
        let far = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(5000.0, 10.0, 200.0, 20.0)]);
        let navigator = CfiNavigator::new(&far, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element_by_rectangles(&doc, p, 0.0), Some(2));

        let before = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(-900.0, 10.0, 200.0, 20.0)]);
        let navigator = CfiNavigator::new(&before, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element_by_rectangles(&doc, p, 0.0), Some(0));
    }

    #[test]
    fn test_rectangles_page_uses_page_offset() {
        let (doc, p) = doc();
        // on the second column, which is scrolled into view
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(0.0, 10.0, 200.0, 20.0)]);
        let options = NavigatorOptions::paginated(PaginationInfo {
            page_offset: 270.0,
            ..pagination()
        });
        let navigator = CfiNavigator::new(&layout, options);
        assert_eq!(
            navigator.visible_content_offsets(),
            VisibleContentOffsets::left(270.0)
        );
        assert_eq!(navigator.page_for_element_by_rectangles(&doc, p, 0.0), Some(1));
    }

    #[test]
    fn test_rectangles_page_rebases_wrapped_rect() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_edges(280.0, -600.0, 500.0, -100.0)]);
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        // one column back: left 10
        assert_eq!(navigator.page_for_element_by_rectangles(&doc, p, 0.0), Some(0));
    }

    #[test]
    fn test_rectangles_page_rtl_and_vertical() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(10.0, 700.0, 200.0, 20.0)]);

        let rtl = NavigatorOptions::paginated(PaginationInfo {
            right_to_left: true,
            ..pagination()
        });
        assert_eq!(
            CfiNavigator::new(&layout, rtl).page_for_element_by_rectangles(&doc, p, 0.0),
            Some(0)
        );

        let vertical = NavigatorOptions::paginated(PaginationInfo {
            is_vertical_writing_mode: true,
            ..pagination()
        });
        assert_eq!(
            CfiNavigator::new(&layout, vertical).page_for_element_by_rectangles(&doc, p, 0.0),
            Some(1)
        );
    }

    #[test]
    fn test_no_rectangles_no_page() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0));
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element_by_rectangles(&doc, p, 0.0), None);
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 0.0), None);
    }

    #[test]
    fn test_offsets_page_by_horizontal_position() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(540.0, 10.0, 200.0, 20.0)]);
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        // 540 / 250 = 2.16
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 0.0), Some(2));
    }

    #[test]
    fn test_offsets_page_adds_spread() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(10.0, 10.0, 200.0, 20.0)]);
        let options = NavigatorOptions::paginated(PaginationInfo {
            current_spread_index: 3,
            visible_column_count: 2,
            ..pagination()
        });
        let navigator = CfiNavigator::new(&layout, options);
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 0.0), Some(6));
    }

    #[test]
    fn test_offsets_page_rounds_up_near_column_bottom() {
        let (doc, p) = doc();
        // 570 / 600 = 0.95 of the first column
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(10.0, 570.0, 200.0, 20.0)]);
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 0.0), Some(1));
        // the rectangle method keeps it on the first column
        assert_eq!(navigator.page_for_element_by_rectangles(&doc, p, 0.0), Some(0));
    }

    #[test]
    fn test_offsets_page_follows_sample_point() {
        let (doc, p) = doc();
        // 540 / 600 = 0.9 at the top edge, 570 / 600 = 0.95 halfway down
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(10.0, 540.0, 200.0, 60.0)]);
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 0.0), Some(0));
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 50.0), Some(1));
    }

    #[test]
    fn test_cfi_page_past_last_column_clamps() {
        let (mut doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(5000.0, 10.0, 200.0, 20.0)]);
        for method in [PageIndexMethod::Offsets, PageIndexMethod::Rectangles] {
            let mut options = NavigatorOptions::paginated(pagination());
            options.page_index_method = method;
            let navigator = CfiNavigator::new(&layout, options);
            assert_eq!(navigator.page_for_element_cfi(&mut doc, "/2/2[p]"), Some(2), "{:?}", method);
            assert_eq!(navigator.page_for_element_id(&doc, "p"), Some(2));
        }
        // the raw offset computation is left unclamped
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 0.0), Some(20));
    }

    #[test]
    fn test_offsets_page_without_pagination() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(10.0, 1300.0, 200.0, 20.0)]);
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::default());
        assert_eq!(navigator.page_for_element(&doc, p, 0.0, 0.0), Some(2));
        assert_eq!(navigator.visible_content_offsets(), VisibleContentOffsets::left(0.0));
    }

    #[test]
    fn test_page_for_element_id() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(p, vec![Rect::from_origin(300.0, 10.0, 200.0, 20.0)]);
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.element_by_id(&doc, "p"), Some(p));
        assert_eq!(navigator.page_for_element_id(&doc, "p"), Some(1));
        assert_eq!(navigator.page_for_element_id(&doc, "missing"), None);
    }

    #[test]
    fn test_element_cfi_lookup() {
        let (doc, p) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0));
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(
            navigator.element_by_cfi(&doc, "/2/2[p]", &Blacklist::readium()),
            Some(p)
        );
        assert_eq!(
            navigator.element_by_cfi(&doc, "/2/2/1:3", &Blacklist::readium()),
            Some(doc.children(p)[0])
        );
        assert_eq!(navigator.element_by_cfi(&doc, "/2/40", &Blacklist::readium()), None);
    }

    #[test]
    fn test_unresolvable_cfi_has_no_page() {
        let (mut doc, _) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0));
        let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(pagination()));
        assert_eq!(navigator.page_for_element_cfi(&mut doc, "/4/12/1:3"), None);
        assert!(!navigator.is_element_cfi_visible(&mut doc, "/4/12/1:3", 0));
    }
}
