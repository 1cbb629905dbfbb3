//! Traversal and offset search
//!
//! Finds the first or last visible text position on the current page.
//! Candidates are text nodes with visible characters and images under the
//! body, in document order. The first candidate whose element is visible
//! is the anchor; inside a text node a word-by-word search on a temporary
//! copy of the element narrows the visible part down to a character
//! offset.

use serde::Serialize;

use super::visibility::VisibilityClassifier;
use crate::config::VisibleContentOffsets;
use crate::dom::{query, text, Document, NodeId, ScopedEdit};
use crate::layout::LayoutOracle;

/// A visible node and where its visible part starts (or ends)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleElement {
    /// Text node or `img` element
    pub node: NodeId,
    pub percent_visible: u8,
    /// UTF-16 offset into a text node; 0 for images
    pub text_offset: usize,
}

impl VisibleElement {
    /// Share of the element hidden above the viewport
    pub fn percent_hidden(&self) -> u8 {
        100 - self.percent_visible.min(100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// Text nodes with non-whitespace content inside body descendants, and
/// images under body, in document order
pub fn visible_candidates(doc: &Document) -> Vec<NodeId> {
    let Some(body) = query::find_body(doc) else {
        return Vec::new();
    };
    doc.descendants(body)
        .filter(|&node| match doc.text(node) {
            Some(content) => {
                !content.trim().is_empty()
                    && doc
                        .parent(node)
                        .map(|parent| parent != body)
                        .unwrap_or(false)
            }
            None => query::is_tag(doc, node, "img"),
        })
        .collect()
}

/// The element measured for a candidate: a text node's parent, or the image
pub fn measured_element(doc: &Document, candidate: NodeId) -> Option<NodeId> {
    if doc.is_text(candidate) {
        doc.parent(candidate)
    } else {
        Some(candidate)
    }
}

/// First (forward) or last (backward) visible candidate
pub fn find_visible_element<L: LayoutOracle + ?Sized>(
    classifier: &VisibilityClassifier<'_, L>,
    doc: &mut Document,
    direction: SearchDirection,
    offsets: &VisibleContentOffsets,
) -> Option<VisibleElement> {
    let mut candidates = visible_candidates(doc);
    if direction == SearchDirection::Backward {
        candidates.reverse();
    }

    for candidate in candidates {
        let Some(element) = measured_element(doc, candidate) else {
            continue;
        };
        let percent_visible = match classifier.visibility(doc, element, offsets, true) {
            Some(percent) if percent > 0 => percent,
            _ => continue,
        };

        let text_len = doc.text(candidate).map(text::utf16_len);
        let text_offset = match text_len {
            None => 0,
            Some(len) => {
                let offset = match direction {
                    SearchDirection::Forward => {
                        first_visible_text_offset(classifier, doc, element, candidate, offsets)
                            .filter(|&offset| offset < len)
                    }
                    SearchDirection::Backward => {
                        last_visible_text_offset(classifier, doc, element, candidate, offsets)
                    }
                };
                match offset {
                    Some(offset) => offset,
                    // no visible characters in this node
                    None => continue,
                }
            }
        };

        return Some(VisibleElement {
            node: candidate,
            percent_visible,
            text_offset,
        });
    }
    None
}

/// Swap a copy of `element` into the tree and cut it off after the copy
/// of `text_node`. Returns the copy and its text node.
fn truncated_working_copy(
    edit: &mut ScopedEdit<'_>,
    element: NodeId,
    text_node: NodeId,
) -> Option<(NodeId, NodeId)> {
    let index = edit.index_in_parent(text_node)?;
    let copy = edit.swap_in_clone(element)?;
    let copy_text = *edit.children(copy).get(index)?;
    let trailing = edit.children(copy)[index + 1..].to_vec();
    for node in trailing {
        edit.discard(node);
    }
    Some((copy, copy_text))
}

fn skip_spaces(content: &str, mut offset: usize) -> usize {
    while text::is_space_at(content, offset) {
        offset += 1;
    }
    offset
}

/// Offset of the first word that becomes visible when the text is rebuilt
/// word by word. The full length means no word did.
fn first_visible_text_offset<L: LayoutOracle + ?Sized>(
    classifier: &VisibilityClassifier<'_, L>,
    doc: &mut Document,
    element: NodeId,
    text_node: NodeId,
    offsets: &VisibleContentOffsets,
) -> Option<usize> {
    let content = doc.text(text_node)?.to_string();
    let mut edit = ScopedEdit::new(doc);
    let (copy, copy_text) = truncated_working_copy(&mut edit, element, text_node)?;

    let words: Vec<&str> = content.split(' ').collect();
    let mut offset = 0;
    for end in 1..=words.len() {
        let prefix = words[..end].join(" ");
        edit.set_text(copy_text, prefix.as_str());
        if classifier.visibility(&edit, copy, offsets, true).unwrap_or(0) > 0 {
            break;
        }
        offset = text::utf16_len(&prefix);
    }
    Some(skip_spaces(&content, offset))
}

/// End of the longest word prefix whose trailing edge is inside the
/// viewport. `None` when even the first word is not.
fn last_visible_text_offset<L: LayoutOracle + ?Sized>(
    classifier: &VisibilityClassifier<'_, L>,
    doc: &mut Document,
    element: NodeId,
    text_node: NodeId,
    offsets: &VisibleContentOffsets,
) -> Option<usize> {
    let content = doc.text(text_node)?.to_string();
    let mut edit = ScopedEdit::new(doc);
    let (copy, copy_text) = truncated_working_copy(&mut edit, element, text_node)?;

    let words: Vec<&str> = content.split(' ').collect();
    for end in (1..=words.len()).rev() {
        let prefix = words[..end].join(" ");
        edit.set_text(copy_text, prefix.as_str());
        if classifier.is_fully_visible(&edit, copy, offsets) {
            return Some(skip_spaces(&content, text::utf16_len(&prefix)));
        }
    }
    None
}

/// Scan diagonally from the top-left (or bottom-right) corner until the
/// caret lands in something other than the root or body element
pub fn find_by_caret<L: LayoutOracle + ?Sized>(
    classifier: &VisibilityClassifier<'_, L>,
    doc: &Document,
    from_start: bool,
) -> Option<VisibleElement> {
    let layout = classifier.layout();
    let content = layout.content_dimensions(doc);
    let limit = content.width.max(content.height).max(0.0).ceil() as usize;

    for i in 0..=limit {
        let step = i as f64;
        let (x, y) = if from_start {
            (step, step)
        } else {
            (content.width - step, content.height - step)
        };
        let Some(caret) = layout.caret_position_from_point(doc, x, y) else {
            continue;
        };
        if query::is_root_or_body(doc, caret.node) {
            continue;
        }

        let hidden = doc
            .parent(caret.node)
            .and_then(|parent| layout.document_rect(doc, parent))
            .filter(|rect| rect.height > 0.0)
            .map(|rect| (100.0 * -rect.top / rect.height).ceil().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);
        return Some(VisibleElement {
            node: caret.node,
            percent_visible: 100 - hidden,
            text_offset: caret.offset,
        });
    }
    None
}
