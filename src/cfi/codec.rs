//! CFI generation and resolution against a content document
//!
//! The navigator treats the CFI grammar as a capability behind
//! [`CfiCodec`]. [`ContentCfiCodec`] implements it for [`Document`]:
//!
//! - element steps are even and count only non-blacklisted element children
//! - text steps are odd; `/2k+1` is the run of text after the k-th element
//! - character offsets count UTF-16 units from the start of that run
//! - elements with an id get an `[id]` assertion, which resolution prefers
//!   over the index when both are present
//!
//! Blacklisted elements are skipped in the numbering; text around them
//! belongs to the same run.

use serde::{Deserialize, Serialize};

use super::parser;
use super::types::CfiStep;
use crate::dom::{text, Document, NodeId};
use crate::error::{NavigationError, Result};

/// Elements invisible to CFI step numbering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Blacklist {
    pub classes: Vec<String>,
    pub elements: Vec<String>,
    pub ids: Vec<String>,
}

impl Blacklist {
    /// Elements carrying the `blacklist` class, which reading systems
    /// use for their own injected markup
    pub fn readium() -> Self {
        Self {
            classes: vec!["blacklist".to_string()],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.elements.is_empty() && self.ids.is_empty()
    }

    pub fn is_blacklisted(&self, doc: &Document, node: NodeId) -> bool {
        let Some(element) = doc.element(node) else {
            return false;
        };
        self.classes.iter().any(|class| element.has_class(class))
            || self
                .elements
                .iter()
                .any(|name| element.local_name().eq_ignore_ascii_case(name))
            || element
                .id()
                .map(|id| self.ids.iter().any(|listed| listed == id))
                .unwrap_or(false)
    }
}

/// Black-box CFI capability used by the navigator
pub trait CfiCodec {
    /// Content-document CFI for a character position in a text node
    fn generate_character_offset_cfi(
        &self,
        doc: &Document,
        text_node: NodeId,
        offset: usize,
        blacklist: &Blacklist,
    ) -> Option<String>;

    /// Content-document CFI for an element
    fn generate_element_cfi(
        &self,
        doc: &Document,
        element: NodeId,
        blacklist: &Blacklist,
    ) -> Option<String>;

    /// Node addressed by a partial CFI (`epubcfi(/4/2/1)`). The terminus,
    /// if any, is ignored.
    fn resolve_partial_cfi(&self, doc: &Document, cfi: &str, blacklist: &Blacklist)
        -> Result<NodeId>;

    /// Map an offset counted from the start of `node`'s text run to the
    /// text node that holds it and the offset inside that node
    fn locate_character_offset(
        &self,
        _doc: &Document,
        node: NodeId,
        offset: usize,
        _blacklist: &Blacklist,
    ) -> (NodeId, usize) {
        (node, offset)
    }
}

/// [`CfiCodec`] for the in-memory document tree
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentCfiCodec;

/// Position of a node among its parent's CFI-visible children
enum ChildSlot {
    Element { step: u32 },
    Text { step: u32 },
}

impl ContentCfiCodec {
    fn slot(&self, doc: &Document, node: NodeId, blacklist: &Blacklist) -> Option<ChildSlot> {
        let parent = doc.parent(node)?;
        let mut elements = 0u32;
        for &child in doc.children(parent) {
            let counted = doc.is_element(child) && !blacklist.is_blacklisted(doc, child);
            if child == node {
                return Some(if counted {
                    ChildSlot::Element {
                        step: (elements + 1) * 2,
                    }
                } else {
                    ChildSlot::Text {
                        step: elements * 2 + 1,
                    }
                });
            }
            if counted {
                elements += 1;
            }
        }
        None
    }

    /// Steps from the root element down to `element`, `/4/2[id]` style
    fn element_steps(&self, doc: &Document, element: NodeId, blacklist: &Blacklist) -> Option<String> {
        let root = doc.document_element()?;
        let mut steps = Vec::new();
        let mut current = element;
        while current != root {
            if blacklist.is_blacklisted(doc, current) {
                return None;
            }
            let ChildSlot::Element { step } = self.slot(doc, current, blacklist)? else {
                return None;
            };
            let step = match doc.element(current).and_then(|el| el.id()) {
                Some(id) => CfiStep::element_with_id(step, id),
                None => CfiStep::element(step),
            };
            steps.push(step.to_string());
            current = doc.parent(current)?;
        }
        steps.reverse();
        Some(steps.concat())
    }

    /// Text nodes of the run containing `node`, in order
    fn text_run(&self, doc: &Document, node: NodeId, blacklist: &Blacklist) -> Vec<NodeId> {
        let Some(parent) = doc.parent(node) else {
            return vec![node];
        };
        let mut runs: Vec<Vec<NodeId>> = vec![Vec::new()];
        for &child in doc.children(parent) {
            if doc.is_element(child) && !blacklist.is_blacklisted(doc, child) {
                runs.push(Vec::new());
            } else if doc.is_text(child) {
                if let Some(run) = runs.last_mut() {
                    run.push(child);
                }
            }
        }
        runs.into_iter()
            .find(|run| run.contains(&node))
            .unwrap_or_else(|| vec![node])
    }

    fn child_for_step(
        &self,
        doc: &Document,
        parent: NodeId,
        step: &CfiStep,
        blacklist: &Blacklist,
    ) -> Option<NodeId> {
        let index = step.element_index()?;
        if let Some(id) = step.id_assertion.as_deref() {
            if let Some(asserted) = doc.element_by_id(id) {
                return Some(asserted);
            }
            tracing::debug!("CFI id assertion [{}] not found, using step index", id);
        }

        let wanted_elements = index / 2;
        let mut elements = 0u32;
        for &child in doc.children(parent) {
            let counted = doc.is_element(child) && !blacklist.is_blacklisted(doc, child);
            if counted {
                elements += 1;
                if index % 2 == 0 && elements == wanted_elements {
                    return Some(child);
                }
            } else if index % 2 == 1 && elements == wanted_elements && doc.is_text(child) {
                return Some(child);
            }
        }
        None
    }
}

impl CfiCodec for ContentCfiCodec {
    fn generate_character_offset_cfi(
        &self,
        doc: &Document,
        text_node: NodeId,
        offset: usize,
        blacklist: &Blacklist,
    ) -> Option<String> {
        doc.text(text_node)?;
        let parent = doc.parent(text_node)?;
        let ChildSlot::Text { step } = self.slot(doc, text_node, blacklist)? else {
            return None;
        };
        let preceding: usize = self
            .text_run(doc, text_node, blacklist)
            .into_iter()
            .take_while(|&node| node != text_node)
            .filter_map(|node| doc.text(node))
            .map(text::utf16_len)
            .sum();

        let parent_steps = self.element_steps(doc, parent, blacklist)?;
        Some(format!("!{}/{}:{}", parent_steps, step, preceding + offset))
    }

    fn generate_element_cfi(
        &self,
        doc: &Document,
        element: NodeId,
        blacklist: &Blacklist,
    ) -> Option<String> {
        doc.element(element)?;
        self.element_steps(doc, element, blacklist)
            .map(|steps| format!("!{}", steps))
    }

    fn resolve_partial_cfi(
        &self,
        doc: &Document,
        cfi: &str,
        blacklist: &Blacklist,
    ) -> Result<NodeId> {
        let parsed = parser::parse(cfi)?;
        let unresolved = || NavigationError::UnresolvedCfi(cfi.to_string());

        let mut current = doc.document_element().ok_or_else(unresolved)?;
        let steps = parsed.path.content_steps();
        for (idx, step) in steps.iter().enumerate() {
            if doc.is_text(current) {
                return Err(unresolved());
            }
            current = self
                .child_for_step(doc, current, step, blacklist)
                .ok_or_else(unresolved)?;
            if step.is_text_step() && idx + 1 != steps.len() {
                return Err(unresolved());
            }
        }
        Ok(current)
    }

    fn locate_character_offset(
        &self,
        doc: &Document,
        node: NodeId,
        offset: usize,
        blacklist: &Blacklist,
    ) -> (NodeId, usize) {
        let run = self.text_run(doc, node, blacklist);
        let mut remaining = offset;
        for (idx, &text_node) in run.iter().enumerate() {
            let len = doc.text(text_node).map(text::utf16_len).unwrap_or(0);
            if remaining <= len || idx + 1 == run.len() {
                return (text_node, remaining.min(len));
            }
            remaining -= len;
        }
        (node, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_markup;

    const CHAPTER: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>t</title></head>
<body>
<p>First paragraph.</p>
<p id="second">Before <span class="blacklist">marker</span>after the marker.</p>
<div><img src="a.png" alt="Figure"/></div>
</body>
</html>"#;

    fn second_paragraph_text(doc: &Document) -> (NodeId, NodeId) {
        let p = doc.element_by_id("second").unwrap();
        let children = doc.children(p);
        (children[0], children[2])
    }

    #[test]
    fn test_element_cfi_numbering() {
        let doc = parse_markup(CHAPTER);
        let codec = ContentCfiCodec;
        let p = doc.element_by_id("second").unwrap();
        assert_eq!(
            codec.generate_element_cfi(&doc, p, &Blacklist::default()).as_deref(),
            Some("!/4/4[second]")
        );

        let img = crate::dom::query::elements_by_tag_name(&doc, doc.root(), "img")[0];
        assert_eq!(
            codec.generate_element_cfi(&doc, img, &Blacklist::default()).as_deref(),
            Some("!/4/6/2")
        );
    }

    #[test]
    fn test_text_run_spans_blacklisted_element() {
        let doc = parse_markup(CHAPTER);
        let codec = ContentCfiCodec;
        let (before, after) = second_paragraph_text(&doc);

        let blacklist = Blacklist::readium();
        assert_eq!(
            codec.generate_character_offset_cfi(&doc, before, 2, &blacklist).as_deref(),
            Some("!/4/4[second]/1:2")
        );
        // "Before " is 7 units, so offset 3 in the tail is 10 in the run
        assert_eq!(
            codec.generate_character_offset_cfi(&doc, after, 3, &blacklist).as_deref(),
            Some("!/4/4[second]/1:10")
        );

        // without the blacklist the span is a real step
        assert_eq!(
            codec
                .generate_character_offset_cfi(&doc, after, 3, &Blacklist::default())
                .as_deref(),
            Some("!/4/4[second]/3:3")
        );
    }

    #[test]
    fn test_resolve_roundtrip() {
        let doc = parse_markup(CHAPTER);
        let codec = ContentCfiCodec;
        let blacklist = Blacklist::readium();
        let (before, after) = second_paragraph_text(&doc);

        let node = codec
            .resolve_partial_cfi(&doc, "epubcfi(/4/4[second]/1)", &blacklist)
            .unwrap();
        assert_eq!(node, before);
        assert_eq!(codec.locate_character_offset(&doc, node, 10, &blacklist), (after, 3));
        assert_eq!(codec.locate_character_offset(&doc, node, 2, &blacklist), (before, 2));
        assert_eq!(codec.locate_character_offset(&doc, node, 500, &blacklist), (after, 17));
    }

    #[test]
    fn test_id_assertion_preferred() {
        let doc = parse_markup(CHAPTER);
        let codec = ContentCfiCodec;
        // stale index, correct id
        let node = codec
            .resolve_partial_cfi(&doc, "/4/2[second]", &Blacklist::default())
            .unwrap();
        assert_eq!(Some(node), doc.element_by_id("second"));
    }

    #[test]
    fn test_unresolvable_cfis() {
        let doc = parse_markup(CHAPTER);
        let codec = ContentCfiCodec;
        let blacklist = Blacklist::default();
        assert!(matches!(
            codec.resolve_partial_cfi(&doc, "/4/40", &blacklist),
            Err(NavigationError::UnresolvedCfi(_))
        ));
        assert!(matches!(
            codec.resolve_partial_cfi(&doc, "/4/2/1/2", &blacklist),
            Err(NavigationError::UnresolvedCfi(_))
        ));
        assert!(matches!(
            codec.resolve_partial_cfi(&doc, "/4/[", &blacklist),
            Err(NavigationError::InvalidCfi(_))
        ));
    }

    #[test]
    fn test_blacklist_matching() {
        let doc = parse_markup(
            r#"<html><body><div id="a" class="x blacklist"/><aside id="b"/><p id="c"/></body></html>"#,
        );
        let lists = Blacklist {
            classes: vec![],
            elements: vec!["ASIDE".to_string()],
            ids: vec!["c".to_string()],
        };
        let a = doc.element_by_id("a").unwrap();
        let b = doc.element_by_id("b").unwrap();
        let c = doc.element_by_id("c").unwrap();
        assert!(Blacklist::readium().is_blacklisted(&doc, a));
        assert!(!lists.is_blacklisted(&doc, a));
        assert!(lists.is_blacklisted(&doc, b));
        assert!(lists.is_blacklisted(&doc, c));
        assert!(Blacklist::default().is_empty());
    }
}
