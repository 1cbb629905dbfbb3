//! Page bookmarks

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::CfiNavigator;
use crate::cfi::CfiCodec;
use crate::config::VisibleContentOffsets;
use crate::dom::{query, text, Document};
use crate::error::Result;
use crate::layout::LayoutOracle;

/// Bookmark reported when the page shows nothing addressable
pub const EMPTY_BOOKMARK_JSON: &str = r#"{"contentCFI":"/0","context":""}"#;

/// Context snippets are cut to this many UTF-16 units
const CONTEXT_LENGTH: usize = 64;

/// A content CFI plus a short excerpt of what it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(rename = "contentCFI")]
    pub content_cfi: String,
    pub context: String,
}

impl Bookmark {
    /// The virtual first element, `/0`
    pub fn empty() -> Self {
        Self {
            content_cfi: "/0".to_string(),
            context: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content_cfi == "/0"
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            warn!("Failed to serialize bookmark: {}", e);
            EMPTY_BOOKMARK_JSON.to_string()
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<'a, L: LayoutOracle + ?Sized, C: CfiCodec> CfiNavigator<'a, L, C> {
    /// Bookmark for the first visible position.
    ///
    /// `offset` travels as a left content offset, which neither visibility
    /// strategy reads: the bookmark is the page's first visible position
    /// whatever the offset.
    pub fn bookmark_for_offset(&self, doc: &mut Document, offset: f64) -> Bookmark {
        let Some((found, content_cfi)) =
            self.visible_node_with_cfi(doc, true, VisibleContentOffsets::left(offset))
        else {
            return Bookmark::empty();
        };

        let context = if query::is_tag(doc, found.node, "img") {
            match doc.element(found.node).and_then(|img| img.attr("alt")) {
                Some(alt) if !alt.is_empty() => {
                    format!("[image] {}", text::utf16_slice(alt, 0, CONTEXT_LENGTH))
                }
                _ => "[image]".to_string(),
            }
        } else {
            let mut content = doc.text_content(found.node);
            let mut sibling = doc.next_sibling(found.node);
            while let Some(node) = sibling {
                content.push_str(&doc.text_content(node));
                sibling = doc.next_sibling(node);
            }
            text::utf16_slice(
                &content,
                found.text_offset,
                found.text_offset + CONTEXT_LENGTH,
            )
            .to_string()
        };

        Bookmark {
            content_cfi,
            context,
        }
    }

    /// Bookmark for the page. The offset is one column gap in from the
    /// left edge for left-to-right pages and one gap in from the right
    /// otherwise; as with [`Self::bookmark_for_offset`] it does not change
    /// which position is recorded.
    pub fn bookmark(&self, doc: &mut Document, left_to_right: bool) -> Bookmark {
        let gap = self
            .options
            .pagination_info
            .as_ref()
            .map(|p| p.column_gap)
            .unwrap_or(0.0);
        let offset = if left_to_right {
            gap
        } else {
            let root = query::find_body(doc).or_else(|| doc.document_element());
            let width = root
                .and_then(|node| self.layout.bounding_rect(doc, node))
                .map(|rect| rect.width)
                .unwrap_or_else(|| self.layout.frame_dimensions().width);
            width - gap
        };
        self.bookmark_for_offset(doc, offset)
    }

    pub fn bookmark_json(&self, doc: &mut Document, left_to_right: bool) -> String {
        self.bookmark(doc, left_to_right).to_json()
    }
}
