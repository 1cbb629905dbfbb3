//! Visibility and pagination resolution
//!
//! [`CfiNavigator`] answers the questions a paginated reader asks about the
//! page it is showing: which node is the first (or last) visible one, what
//! CFI points at it, which page a CFI lands on, and what a bookmark for the
//! current page looks like. Geometry comes from a [`LayoutOracle`]; CFI
//! paths from a [`CfiCodec`].

mod bookmark;
mod normalize;
mod page;
mod rebase;
mod search;
mod visibility;

pub use bookmark::{Bookmark, EMPTY_BOOKMARK_JSON};
pub use normalize::{normalized_rectangles, ElementRectangles};
pub use rebase::{adjust_rectangle, trim_rectangles_by_vertical_offset, ColumnGeometry};
pub use search::{visible_candidates, SearchDirection, VisibleElement};
pub use visibility::{
    rectangles_percentage, vertical_offset_percentage, VisibilityClassifier, VisibilityStrategy,
};

use tracing::debug;

use crate::cfi::{Blacklist, CfiCodec, ContentCfiCodec};
use crate::config::{NavigatorOptions, VisibleContentOffsets};
use crate::dom::Document;
use crate::layout::LayoutOracle;

/// Navigation queries a reading system can override.
///
/// [`CfiNavigator`] is the stock implementation. Hosts that need to change
/// one answer (for instance a page lookup backed by their own pagination
/// cache) wrap it and delegate the rest.
pub trait NavigationLogic {
    fn find_first_visible_element(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<VisibleElement>;

    fn find_last_visible_element(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<VisibleElement>;

    fn first_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<String>;

    fn last_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<String>;

    fn page_for_element_cfi(&self, doc: &mut Document, cfi: &str) -> Option<usize>;

    fn bookmark_for_offset(&self, doc: &mut Document, offset: f64) -> Bookmark;
}

/// Resolver bound to one layout snapshot
pub struct CfiNavigator<'a, L: ?Sized, C = ContentCfiCodec> {
    layout: &'a L,
    options: NavigatorOptions,
    codec: C,
    classifier: VisibilityClassifier<'a, L>,
    blacklist: Blacklist,
}

impl<'a, L: LayoutOracle + ?Sized> CfiNavigator<'a, L> {
    pub fn new(layout: &'a L, options: NavigatorOptions) -> Self {
        Self::with_codec(layout, options, ContentCfiCodec)
    }
}

impl<'a, L: LayoutOracle + ?Sized, C: CfiCodec> CfiNavigator<'a, L, C> {
    pub fn with_codec(layout: &'a L, options: NavigatorOptions, codec: C) -> Self {
        let geometry = ColumnGeometry::new(layout.frame_dimensions(), &options);
        let classifier =
            VisibilityClassifier::new(layout, geometry, VisibilityStrategy::from_options(&options));
        Self {
            layout,
            options,
            codec,
            classifier,
            blacklist: Blacklist::readium(),
        }
    }

    /// Replace the default `blacklist` class filter used for generated CFIs
    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn options(&self) -> &NavigatorOptions {
        &self.options
    }

    pub fn classifier(&self) -> &VisibilityClassifier<'a, L> {
        &self.classifier
    }

    pub fn find_first_visible_element(
        &self,
        doc: &mut Document,
        props: impl Into<VisibleContentOffsets>,
    ) -> Option<VisibleElement> {
        search::find_visible_element(&self.classifier, doc, SearchDirection::Forward, &props.into())
    }

    pub fn find_last_visible_element(
        &self,
        doc: &mut Document,
        props: impl Into<VisibleContentOffsets>,
    ) -> Option<VisibleElement> {
        search::find_visible_element(&self.classifier, doc, SearchDirection::Backward, &props.into())
    }

    /// Caret lookup when the layout supports it, word search otherwise
    pub fn find_visible_node_with_text_offset(
        &self,
        doc: &mut Document,
        from_start: bool,
        props: impl Into<VisibleContentOffsets>,
    ) -> Option<VisibleElement> {
        if self.layout.supports_caret_positions() {
            if let Some(found) = search::find_by_caret(&self.classifier, doc, from_start) {
                return Some(found);
            }
        }
        if from_start {
            self.find_first_visible_element(doc, props)
        } else {
            self.find_last_visible_element(doc, props)
        }
    }

    pub fn first_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        props: impl Into<VisibleContentOffsets>,
    ) -> Option<String> {
        self.visible_node_with_cfi(doc, true, props.into())
            .map(|(_, cfi)| cfi)
    }

    pub fn last_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        props: impl Into<VisibleContentOffsets>,
    ) -> Option<String> {
        self.visible_node_with_cfi(doc, false, props.into())
            .map(|(_, cfi)| cfi)
    }

    fn visible_node_with_cfi(
        &self,
        doc: &mut Document,
        from_start: bool,
        offsets: VisibleContentOffsets,
    ) -> Option<(VisibleElement, String)> {
        let Some(found) = self.find_visible_node_with_text_offset(doc, from_start, offsets) else {
            debug!("Could not generate CFI. The page has no visible elements.");
            return None;
        };
        let cfi = self.cfi_for(doc, &found)?;
        debug!(from_start, "generated cfi {}", cfi);
        Some((found, cfi))
    }

    /// Content CFI for a search result, without the leading `!`
    fn cfi_for(&self, doc: &Document, found: &VisibleElement) -> Option<String> {
        let cfi = if doc.is_text(found.node) {
            self.codec.generate_character_offset_cfi(
                doc,
                found.node,
                found.text_offset,
                &self.blacklist,
            )
        } else {
            self.codec
                .generate_element_cfi(doc, found.node, &self.blacklist)
        }?;
        Some(match cfi.strip_prefix('!') {
            Some(rest) => rest.to_string(),
            None => cfi,
        })
    }
}

impl<L: LayoutOracle + ?Sized, C: CfiCodec> NavigationLogic for CfiNavigator<'_, L, C> {
    fn find_first_visible_element(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<VisibleElement> {
        CfiNavigator::find_first_visible_element(self, doc, *offsets)
    }

    fn find_last_visible_element(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<VisibleElement> {
        CfiNavigator::find_last_visible_element(self, doc, *offsets)
    }

    fn first_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<String> {
        CfiNavigator::first_visible_text_offset_cfi(self, doc, *offsets)
    }

    fn last_visible_text_offset_cfi(
        &self,
        doc: &mut Document,
        offsets: &VisibleContentOffsets,
    ) -> Option<String> {
        CfiNavigator::last_visible_text_offset_cfi(self, doc, *offsets)
    }

    fn page_for_element_cfi(&self, doc: &mut Document, cfi: &str) -> Option<usize> {
        CfiNavigator::page_for_element_cfi(self, doc, cfi)
    }

    fn bookmark_for_offset(&self, doc: &mut Document, offset: f64) -> Bookmark {
        CfiNavigator::bookmark_for_offset(self, doc, offset)
    }
}
