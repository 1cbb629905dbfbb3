//! Rectangle normalization

use crate::config::VisibleContentOffsets;
use crate::dom::{Document, NodeId};
use crate::layout::{LayoutOracle, Rect};

/// Measured boxes of an element, translated by the content offsets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementRectangles {
    /// Union box
    pub wrapper: Option<Rect>,
    /// One box per line or column fragment, without empty fragments
    pub client: Vec<Rect>,
}

/// Measure `node`, translating every rectangle by the offsets.
///
/// Zero-height client rectangles are dropped (Gecko sometimes emits one in
/// front of the real fragment). A node left with no client rectangles is
/// usually hidden or empty; its next element siblings are tried in turn.
/// An empty `client` list means nothing along that chain has geometry.
pub fn normalized_rectangles<L: LayoutOracle + ?Sized>(
    layout: &L,
    doc: &Document,
    node: NodeId,
    offsets: &VisibleContentOffsets,
) -> ElementRectangles {
    let left = offsets.left.unwrap_or(0.0);
    let top = offsets.top.unwrap_or(0.0);

    let mut current = Some(node);
    let mut measured = ElementRectangles::default();
    while let Some(target) = current {
        measured = ElementRectangles {
            wrapper: layout
                .bounding_rect(doc, target)
                .map(|raw| Rect::normalized(&raw, left, top)),
            client: layout
                .client_rects(doc, target)
                .iter()
                .filter(|raw| raw.bottom - raw.top > 0.0)
                .map(|raw| Rect::normalized(raw, left, top))
                .collect(),
        };
        if !measured.client.is_empty() {
            break;
        }
        current = doc.next_element_sibling(target);
    }
    measured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_markup;
    use crate::layout::fixture::StaticLayout;
    use crate::layout::FrameDimensions;

    fn doc() -> (Document, NodeId, NodeId, NodeId) {
        let doc = parse_markup(r#"<html><body><p id="a">a</p><p id="b">b</p><p id="c">c</p></body></html>"#);
        let a = doc.element_by_id("a").unwrap();
        let b = doc.element_by_id("b").unwrap();
        let c = doc.element_by_id("c").unwrap();
        (doc, a, b, c)
    }

    #[test]
    fn test_offsets_applied_and_empty_fragments_dropped() {
        let (doc, a, _, _) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0)).with_rects(
            a,
            vec![
                Rect::from_edges(5.0, 40.0, 50.0, 40.0),
                Rect::from_edges(5.0, 40.0, 50.0, 60.0),
            ],
        );
        let rects = normalized_rectangles(
            &layout,
            &doc,
            a,
            &VisibleContentOffsets {
                left: Some(100.0),
                top: Some(-10.0),
                bottom: None,
            },
        );
        assert_eq!(rects.client, vec![Rect::from_edges(105.0, 30.0, 150.0, 50.0)]);
        assert_eq!(rects.wrapper, Some(Rect::from_edges(105.0, 30.0, 150.0, 50.0)));
    }

    #[test]
    fn test_falls_back_to_next_sibling() {
        let (doc, a, _, c) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0))
            .with_rects(c, vec![Rect::from_origin(0.0, 100.0, 10.0, 20.0)]);
        let rects = normalized_rectangles(&layout, &doc, a, &VisibleContentOffsets::default());
        assert_eq!(rects.client, vec![Rect::from_origin(0.0, 100.0, 10.0, 20.0)]);
    }

    #[test]
    fn test_no_geometry_anywhere_is_empty() {
        let (doc, a, _, _) = doc();
        let layout = StaticLayout::new(FrameDimensions::new(800.0, 600.0));
        let rects = normalized_rectangles(&layout, &doc, a, &VisibleContentOffsets::default());
        assert!(rects.client.is_empty());
        assert!(rects.wrapper.is_none());
    }
}
