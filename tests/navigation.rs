//! End-to-end navigation over reflowed chapters

use std::cmp::Ordering;
use std::collections::HashMap;

use cfi_navigator::cfi::{compare_cfi_strings, split_cfi};
use cfi_navigator::dom::{parse_markup, Document, NodeId};
use cfi_navigator::layout::{DocumentOffset, FlowLayout, FlowMetrics, FrameDimensions, LayoutOracle, Rect};
use cfi_navigator::navigation::EMPTY_BOOKMARK_JSON;
use cfi_navigator::{
    Bookmark, CfiNavigator, NavigationLogic, NavigatorOptions, PageIndexMethod, PaginationInfo,
    VisibleContentOffsets, VisibleElement,
};

// 400x100 frame, two 180px columns per page with a 20px gap. Each line
// holds 18 cells and each column 5 lines.
const FRAME: FrameDimensions = FrameDimensions {
    width: 400.0,
    height: 100.0,
};

/// Eight-character words fill a line exactly in pairs ("word0000 word0001 ")
fn words(range: std::ops::Range<usize>) -> String {
    range
        .map(|i| format!("word{:04}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Heading on line 0, two 25-line paragraphs after it: 51 lines, 11 columns, 6 pages
fn chapter() -> String {
    format!(
        r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title>T</title></head><body><h1 id="title">Chapter</h1><p id="p1">{}</p><p id="p2">{}</p></body></html>"#,
        words(0..50),
        words(50..100)
    )
}

fn pagination(page: usize, column_count: usize) -> PaginationInfo {
    PaginationInfo {
        column_width: 180.0,
        column_gap: 20.0,
        column_count,
        visible_column_count: 2,
        current_spread_index: page,
        page_offset: page as f64 * FRAME.width,
        ..PaginationInfo::default()
    }
}

fn layout_for(info: &PaginationInfo) -> FlowLayout {
    FlowLayout::from_pagination(FRAME, FlowMetrics::default(), info)
}

fn column_count(doc: &Document) -> usize {
    layout_for(&pagination(0, 1)).column_count(doc)
}

/// First and last visible CFIs of a page
fn visible_range(doc: &mut Document, page: usize) -> (Option<String>, Option<String>) {
    let info = pagination(page, column_count(doc));
    let layout = layout_for(&info);
    let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(info));
    (
        navigator.first_visible_text_offset_cfi(doc, VisibleContentOffsets::default()),
        navigator.last_visible_text_offset_cfi(doc, VisibleContentOffsets::default()),
    )
}

#[test]
fn test_chapter_geometry() {
    let doc = parse_markup(&chapter());
    assert_eq!(column_count(&doc), 11);
}

#[test]
fn test_visible_range_of_first_pages() {
    let mut doc = parse_markup(&chapter());

    let (first, last) = visible_range(&mut doc, 0);
    assert_eq!(first.as_deref(), Some("/4/2[title]/1:0"));
    // words 0..=17 fit on page 0; the range ends where word 18 starts
    assert_eq!(last.as_deref(), Some("/4/4[p1]/1:162"));

    let (first, _) = visible_range(&mut doc, 1);
    assert_eq!(first.as_deref(), Some("/4/4[p1]/1:162"));
}

#[test]
fn test_last_page_ends_at_text_end() {
    let mut doc = parse_markup(&chapter());
    let (first, last) = visible_range(&mut doc, 5);
    assert_eq!(first.as_deref(), Some("/4/6[p2]/1:432"));
    assert_eq!(last.as_deref(), Some("/4/6[p2]/1:449"));

    assert_eq!(visible_range(&mut doc, 6), (None, None));
}

#[test]
fn test_ranges_are_ordered_across_pages() {
    let mut doc = parse_markup(&chapter());
    let mut previous_first: Option<String> = None;
    for page in 0..6 {
        let (first, last) = visible_range(&mut doc, page);
        let (first, last) = (first.unwrap(), last.unwrap());
        assert_ne!(
            compare_cfi_strings(&first, &last),
            Some(Ordering::Greater),
            "page {}: {} > {}",
            page,
            first,
            last
        );
        if let Some(previous) = previous_first {
            assert_eq!(compare_cfi_strings(&previous, &first), Some(Ordering::Less));
        }
        previous_first = Some(first);
    }
}

#[test]
fn test_searches_leave_document_untouched() {
    let mut doc = parse_markup(&chapter());
    let before = doc.text_content(doc.root());
    let p1 = doc.element_by_id("p1");

    for page in 0..7 {
        visible_range(&mut doc, page);
    }
    assert_eq!(doc.text_content(doc.root()), before);
    assert_eq!(doc.element_by_id("p1"), p1);
    assert_eq!(doc.children(p1.unwrap()).len(), 1);
}

#[test]
fn test_first_cfi_maps_back_to_its_page() {
    let mut doc = parse_markup(&chapter());
    let columns = column_count(&doc);

    for page in 0..6 {
        let info = pagination(page, columns);
        let layout = layout_for(&info);
        for method in [PageIndexMethod::Offsets, PageIndexMethod::Rectangles] {
            let mut options = NavigatorOptions::paginated(info.clone());
            options.page_index_method = method;
            let navigator = CfiNavigator::new(&layout, options);

            let first = navigator
                .first_visible_text_offset_cfi(&mut doc, VisibleContentOffsets::default())
                .unwrap();
            assert_eq!(
                navigator.page_for_element_cfi(&mut doc, &first),
                Some(2 * page),
                "{:?} on page {} for {}",
                method,
                page,
                first
            );
            assert!(navigator.is_element_cfi_visible(&mut doc, &first, 2 * page));
        }
    }
}

#[test]
fn test_element_lookup_by_cfi_and_id() {
    let doc = parse_markup(&chapter());
    let info = pagination(0, column_count(&doc));
    let layout = layout_for(&info);
    let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(info));

    let p2 = navigator.element_by_id(&doc, "p2").unwrap();
    let blacklist = cfi_navigator::cfi::Blacklist::readium();
    assert_eq!(navigator.element_by_cfi(&doc, "/4/6[p2]", &blacklist), Some(p2));
    assert_eq!(
        navigator.element_by_cfi(&doc, "/4/6/1:20", &blacklist),
        Some(doc.children(p2)[0])
    );
    // p2 starts on line 26, in column 5
    assert_eq!(navigator.page_for_element_id(&doc, "p2"), Some(5));
}

#[test]
fn test_bookmarks() {
    let mut doc = parse_markup(&chapter());
    let columns = column_count(&doc);

    let info = pagination(1, columns);
    let layout = layout_for(&info);
    let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(info));
    let bookmark = navigator.bookmark(&mut doc, true);
    assert_eq!(bookmark.content_cfi, "/4/4[p1]/1:162");
    assert!(bookmark.context.starts_with("word0018 word0019"));
    assert_eq!(bookmark.context.len(), 64);

    let json = navigator.bookmark_json(&mut doc, true);
    assert_eq!(Bookmark::from_json(&json).unwrap(), bookmark);

    let info = pagination(9, columns);
    let layout = layout_for(&info);
    let navigator = CfiNavigator::new(&layout, NavigatorOptions::paginated(info));
    assert_eq!(navigator.bookmark_json(&mut doc, true), EMPTY_BOOKMARK_JSON);
}

#[test]
fn test_scrolled_document_by_vertical_offsets() {
    let body: String = (0..20).map(|i| format!("<p>para{:02}</p>", i)).collect();
    let mut doc = parse_markup(&format!("<html><body>{}</body></html>", body));
    let layout = FlowLayout::scrolled(FrameDimensions::new(200.0, 100.0), FlowMetrics::default())
        .scrolled_to(200.0);
    let navigator = CfiNavigator::new(&layout, NavigatorOptions::default());
    let window = VisibleContentOffsets::top(200.0).with_bottom(300.0);

    let first = navigator.find_first_visible_element(&mut doc, window).unwrap();
    assert_eq!(doc.text(first.node), Some("para10"));
    assert_eq!(first.percent_visible, 100);

    let last = navigator.find_last_visible_element(&mut doc, window).unwrap();
    assert_eq!(doc.text(last.node), Some("para14"));
    assert_eq!(last.text_offset, 6);

    // a bare number is a top offset with no bottom
    let from_number = navigator.find_first_visible_element(&mut doc, 210.0).unwrap();
    assert_eq!(doc.text(from_number.node), Some("para10"));
    assert_eq!(from_number.percent_visible, 50);
    assert_eq!(from_number.percent_hidden(), 50);
}

/// Reports one box for one node and nothing else
struct SingleBox {
    node: NodeId,
    rect: Rect,
}

impl LayoutOracle for SingleBox {
    fn frame_dimensions(&self) -> FrameDimensions {
        FrameDimensions::new(800.0, 600.0)
    }

    fn bounding_rect(&self, _doc: &Document, node: NodeId) -> Option<Rect> {
        (node == self.node).then_some(self.rect)
    }

    fn client_rects(&self, doc: &Document, node: NodeId) -> Vec<Rect> {
        self.bounding_rect(doc, node).into_iter().collect()
    }

    fn document_offset(&self, doc: &Document, node: NodeId) -> Option<DocumentOffset> {
        self.bounding_rect(doc, node).map(|rect| DocumentOffset {
            left: rect.left,
            top: rect.top,
        })
    }
}

#[test]
fn test_page_methods_disagree_near_column_bottom() {
    let mut doc = parse_markup(r#"<html><body><p>intro</p><p id="target">x</p></body></html>"#);
    let target = doc.element_by_id("target").unwrap();
    // 95% down the first column
    let layout = SingleBox {
        node: target,
        rect: Rect::from_origin(10.0, 570.0, 200.0, 20.0),
    };
    let info = PaginationInfo {
        column_width: 250.0,
        column_gap: 20.0,
        column_count: 3,
        ..PaginationInfo::default()
    };

    let mut options = NavigatorOptions::paginated(info);
    options.page_index_method = PageIndexMethod::Offsets;
    let by_offsets = CfiNavigator::new(&layout, options.clone());
    assert_eq!(by_offsets.page_for_element_cfi(&mut doc, "/2/4[target]"), Some(1));

    options.page_index_method = PageIndexMethod::Rectangles;
    let by_rectangles = CfiNavigator::new(&layout, options);
    assert_eq!(by_rectangles.page_for_element_cfi(&mut doc, "/2/4[target]"), Some(0));
    assert!(by_rectangles.is_element_cfi_visible(&mut doc, "/2/4[target]", 0));
}

/// Host logic that answers page lookups from its own cache
struct CachedPages<'a> {
    inner: CfiNavigator<'a, FlowLayout>,
    pages: HashMap<String, usize>,
}

impl NavigationLogic for CachedPages<'_> {
    fn find_first_visible_element(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<VisibleElement> {
        NavigationLogic::find_first_visible_element(&self.inner, doc, offsets)
    }

    fn find_last_visible_element(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<VisibleElement> {
        NavigationLogic::find_last_visible_element(&self.inner, doc, offsets)
    }

    fn first_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<String> {
        NavigationLogic::first_visible_text_offset_cfi(&self.inner, doc, offsets)
    }

    fn last_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<String> {
        NavigationLogic::last_visible_text_offset_cfi(&self.inner, doc, offsets)
    }

    fn page_for_element_cfi(&self, doc: &mut Document, cfi: &str) -> Option<usize> {
        let key = split_cfi(cfi).cfi;
        match self.pages.get(&key) {
            Some(&page) => Some(page),
            None => NavigationLogic::page_for_element_cfi(&self.inner, doc, cfi),
        }
    }

    fn bookmark_for_offset(&self, doc: &mut Document, offset: f64) -> Bookmark {
        NavigationLogic::bookmark_for_offset(&self.inner, doc, offset)
    }
}

#[test]
fn test_host_can_override_page_lookup() {
    let mut doc = parse_markup(&chapter());
    let info = pagination(0, column_count(&doc));
    let layout = layout_for(&info);
    let host = CachedPages {
        inner: CfiNavigator::new(&layout, NavigatorOptions::paginated(info)),
        pages: HashMap::from([("/4/4[p1]/1".to_string(), 7)]),
    };
    let logic: &dyn NavigationLogic = &host;

    assert_eq!(logic.page_for_element_cfi(&mut doc, "/4/4[p1]/1:162"), Some(7));
    assert_eq!(logic.page_for_element_cfi(&mut doc, "/4/2[title]/1:0"), Some(0));
    assert_eq!(
        logic
            .first_visible_text_offset_cfi(&mut doc, &VisibleContentOffsets::default())
            .as_deref(),
        Some("/4/2[title]/1:0")
    );
    assert!(!logic.bookmark_for_offset(&mut doc, 20.0).is_empty());
}
