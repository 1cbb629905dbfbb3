//! Deterministic reflow oracle
//!
//! `FlowLayout` lays a [`Document`] out with fixed-size character cells,
//! either into CSS-style columns (paginated) or into one tall column
//! (scrolled). It re-flows the current tree on every query, so it follows
//! the temporary edits the offset search makes.
//!
//! Block elements can report their column fragments Gecko-style (one
//! rectangle per column) or WebKit-style (one rectangle whose top is
//! wrapped above the viewport). The second form is what the column rebaser
//! exists to undo.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{CaretPosition, DocumentOffset, FrameDimensions, LayoutOracle, Rect};
use crate::config::PaginationInfo;
use crate::dom::{query, Document, ElementData, NodeId};

const SKIPPED: &[&str] = &["head", "script", "style", "title"];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Character cell size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetrics {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for FlowMetrics {
    fn default() -> Self {
        Self {
            char_width: 10.0,
            line_height: 20.0,
        }
    }
}

/// How block elements split across columns are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentMode {
    /// One rectangle per column fragment
    #[default]
    PerColumn,
    /// A single rectangle anchored in the last column, top wrapped upward
    Single,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    width: f64,
    gap: f64,
}

/// Monospace reflow oracle
#[derive(Debug, Clone)]
pub struct FlowLayout {
    frame: FrameDimensions,
    metrics: FlowMetrics,
    columns: Option<Columns>,
    scroll_left: f64,
    scroll_top: f64,
    fragments: FragmentMode,
    caret_positions: bool,
}

#[derive(Debug, Clone, Copy)]
struct LineSpan {
    line: usize,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Glyph {
    node: NodeId,
    offset: usize,
    units: usize,
    col: usize,
}

#[derive(Default)]
struct Placement {
    spans: HashMap<NodeId, Vec<LineSpan>>,
    glyphs: BTreeMap<usize, Vec<Glyph>>,
    blocks: HashSet<NodeId>,
    images: HashSet<NodeId>,
    lines: usize,
}

struct Cursor {
    line: usize,
    col: usize,
    after_space: bool,
    open: Vec<NodeId>,
}

impl FlowLayout {
    /// Single column as wide as the frame, scrolled vertically
    pub fn scrolled(frame: FrameDimensions, metrics: FlowMetrics) -> Self {
        Self {
            frame,
            metrics,
            columns: None,
            scroll_left: 0.0,
            scroll_top: 0.0,
            fragments: FragmentMode::PerColumn,
            caret_positions: false,
        }
    }

    /// Frame-tall columns advancing left to right
    pub fn paginated(
        frame: FrameDimensions,
        metrics: FlowMetrics,
        column_width: f64,
        column_gap: f64,
    ) -> Self {
        Self {
            columns: Some(Columns {
                width: column_width,
                gap: column_gap,
            }),
            ..Self::scrolled(frame, metrics)
        }
    }

    /// Columns and page offset taken from a pagination snapshot.
    ///
    /// Only left-to-right horizontal layouts are reflowed; other modes are
    /// laid out left to right with a warning.
    pub fn from_pagination(
        frame: FrameDimensions,
        metrics: FlowMetrics,
        pagination: &PaginationInfo,
    ) -> Self {
        if pagination.right_to_left || pagination.is_vertical_writing_mode {
            tracing::warn!("FlowLayout only reflows left-to-right horizontal text");
        }
        Self::paginated(frame, metrics, pagination.column_width, pagination.column_gap)
            .at_page_offset(pagination.page_offset)
    }

    /// Shift the content left by `offset` pixels (the current page offset)
    pub fn at_page_offset(mut self, offset: f64) -> Self {
        self.scroll_left = offset;
        self
    }

    /// Scroll the content up by `offset` pixels
    pub fn scrolled_to(mut self, offset: f64) -> Self {
        self.scroll_top = offset;
        self
    }

    pub fn with_fragments(mut self, mode: FragmentMode) -> Self {
        self.fragments = mode;
        self
    }

    /// Enable caret lookup by point
    pub fn with_caret_positions(mut self, enabled: bool) -> Self {
        self.caret_positions = enabled;
        self
    }

    /// Number of columns the document fills; 1 when scrolled
    pub fn column_count(&self, doc: &Document) -> usize {
        match self.columns {
            Some(_) => self.place(doc).lines.div_ceil(self.rows_per_column()).max(1),
            None => 1,
        }
    }

    fn column_width(&self) -> f64 {
        self.columns.map(|c| c.width).unwrap_or(self.frame.width)
    }

    fn column_stride(&self) -> f64 {
        self.columns
            .map(|c| c.width + c.gap)
            .unwrap_or(self.frame.width)
    }

    fn chars_per_line(&self) -> usize {
        ((self.column_width() / self.metrics.char_width).floor() as usize).max(1)
    }

    fn rows_per_column(&self) -> usize {
        match self.columns {
            Some(_) => ((self.frame.height / self.metrics.line_height).floor() as usize).max(1),
            None => usize::MAX,
        }
    }

    /// Viewport x of the first cell of a line
    fn line_x(&self, line: usize) -> f64 {
        let column = line / self.rows_per_column();
        column as f64 * self.column_stride() - self.scroll_left
    }

    /// Viewport y of the top of a line
    fn line_y(&self, line: usize) -> f64 {
        let row = line % self.rows_per_column();
        row as f64 * self.metrics.line_height - self.scroll_top
    }

    fn place(&self, doc: &Document) -> Placement {
        let mut placement = Placement::default();
        let mut cursor = Cursor {
            line: 0,
            col: 0,
            after_space: true,
            open: Vec::new(),
        };
        if let Some(root) = doc.document_element() {
            self.walk(doc, root, &mut cursor, &mut placement);
        }
        placement.lines = cursor.line + usize::from(cursor.col > 0);
        placement
    }

    fn walk(&self, doc: &Document, node: NodeId, cursor: &mut Cursor, placement: &mut Placement) {
        if let Some(content) = doc.text(node) {
            self.flow_text(node, content, cursor, placement);
            return;
        }
        let Some(element) = doc.element(node) else {
            return;
        };
        if is_hidden(element) {
            return;
        }
        let name = element.local_name().to_ascii_lowercase();
        if SKIPPED.contains(&name.as_str()) {
            return;
        }

        match name.as_str() {
            "br" => {
                cursor.line += 1;
                cursor.col = 0;
                cursor.after_space = true;
            }
            "img" => self.place_image(node, element, cursor, placement),
            _ => {
                let block = BLOCKS.contains(&name.as_str());
                if block {
                    placement.blocks.insert(node);
                    break_line(cursor);
                }
                cursor.open.push(node);
                for &child in doc.children(node) {
                    self.walk(doc, child, cursor, placement);
                }
                cursor.open.pop();
                if block {
                    break_line(cursor);
                }
            }
        }
    }

    fn place_image(
        &self,
        node: NodeId,
        element: &ElementData,
        cursor: &mut Cursor,
        placement: &mut Placement,
    ) {
        break_line(cursor);
        let height = dimension(element, "height").unwrap_or(2.0 * self.metrics.line_height);
        let lines = ((height / self.metrics.line_height).ceil() as usize).max(1);
        let cols = dimension(element, "width")
            .map(|w| (w / self.metrics.char_width).ceil() as usize)
            .unwrap_or(self.chars_per_line() / 2)
            .clamp(1, self.chars_per_line());

        let rows = self.rows_per_column();
        let row = cursor.line % rows;
        if row != 0 && row + lines > rows {
            cursor.line += rows - row;
        }

        placement.images.insert(node);
        for line in cursor.line..cursor.line + lines {
            record(placement, &cursor.open, node, line, 0, cols);
        }
        cursor.line += lines;
        cursor.after_space = true;
    }

    fn flow_text(&self, node: NodeId, content: &str, cursor: &mut Cursor, placement: &mut Placement) {
        let per_line = self.chars_per_line();
        let mut offset = 0;
        let mut chars = content.chars().peekable();

        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() {
                chars.next();
                if cursor.col > 0 && !cursor.after_space {
                    self.put_glyph(node, offset, ch.len_utf16(), cursor, placement, per_line);
                    cursor.after_space = true;
                }
                offset += ch.len_utf16();
                continue;
            }

            let word: Vec<char> = std::iter::from_fn(|| chars.next_if(|c| !c.is_whitespace()))
                .collect();
            if cursor.col > 0 && cursor.col + word.len() > per_line {
                cursor.line += 1;
                cursor.col = 0;
            }
            for ch in word {
                self.put_glyph(node, offset, ch.len_utf16(), cursor, placement, per_line);
                offset += ch.len_utf16();
            }
            cursor.after_space = false;
        }
    }

    fn put_glyph(
        &self,
        node: NodeId,
        offset: usize,
        units: usize,
        cursor: &mut Cursor,
        placement: &mut Placement,
        per_line: usize,
    ) {
        record(placement, &cursor.open, node, cursor.line, cursor.col, cursor.col + 1);
        placement.glyphs.entry(cursor.line).or_default().push(Glyph {
            node,
            offset,
            units,
            col: cursor.col,
        });
        cursor.col += 1;
        if cursor.col >= per_line {
            cursor.line += 1;
            cursor.col = 0;
        }
    }

    fn line_rect(&self, span: &LineSpan) -> Rect {
        Rect::from_origin(
            self.line_x(span.line) + span.start as f64 * self.metrics.char_width,
            self.line_y(span.line),
            (span.end - span.start) as f64 * self.metrics.char_width,
            self.metrics.line_height,
        )
    }

    fn block_rects(&self, spans: &[LineSpan]) -> Vec<Rect> {
        let rows = self.rows_per_column();
        let mut fragments: Vec<(usize, Rect)> = Vec::new();
        for span in spans {
            let column = span.line / rows;
            let x = self.line_x(span.line);
            let line_box = Rect::from_origin(
                x,
                self.line_y(span.line),
                self.column_width(),
                self.metrics.line_height,
            );
            match fragments.last_mut() {
                Some((last_column, rect)) if *last_column == column => {
                    *rect = rect.union(&line_box);
                }
                _ => fragments.push((column, line_box)),
            }
        }

        if self.fragments == FragmentMode::Single && fragments.len() > 1 {
            let (first_column, first) = fragments[0];
            let (last_column, last) = fragments[fragments.len() - 1];
            let wrapped = (last_column - first_column) as f64 * self.frame.height;
            return vec![Rect::from_edges(
                last.left,
                first.top - wrapped,
                last.right,
                last.bottom,
            )];
        }
        fragments.into_iter().map(|(_, rect)| rect).collect()
    }

    fn rects_for(&self, placement: &Placement, node: NodeId) -> Vec<Rect> {
        let Some(spans) = placement.spans.get(&node) else {
            return Vec::new();
        };
        if placement.blocks.contains(&node) {
            return self.block_rects(spans);
        }
        let lines: Vec<Rect> = spans.iter().map(|span| self.line_rect(span)).collect();
        if placement.images.contains(&node) {
            return Rect::union_all(&lines).into_iter().collect();
        }
        lines
    }

    fn body_caret(&self, doc: &Document) -> Option<CaretPosition> {
        query::find_body(doc)
            .or_else(|| doc.document_element())
            .map(|node| CaretPosition { node, offset: 0 })
    }
}

fn break_line(cursor: &mut Cursor) {
    if cursor.col > 0 {
        cursor.line += 1;
        cursor.col = 0;
    }
    cursor.after_space = true;
}

fn record(
    placement: &mut Placement,
    open: &[NodeId],
    node: NodeId,
    line: usize,
    start: usize,
    end: usize,
) {
    for &owner in open.iter().chain(std::iter::once(&node)) {
        let spans = placement.spans.entry(owner).or_default();
        match spans.last_mut() {
            Some(last) if last.line == line => {
                last.start = last.start.min(start);
                last.end = last.end.max(end);
            }
            _ => spans.push(LineSpan { line, start, end }),
        }
    }
}

fn is_hidden(element: &ElementData) -> bool {
    if element.attr("hidden").is_some() {
        return true;
    }
    element
        .attr("style")
        .map(|style| {
            let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
            compact.to_ascii_lowercase().contains("display:none")
        })
        .unwrap_or(false)
}

fn dimension(element: &ElementData, name: &str) -> Option<f64> {
    element
        .attr(name)
        .map(|v| v.trim_end_matches("px"))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| *v > 0.0)
}

impl LayoutOracle for FlowLayout {
    fn frame_dimensions(&self) -> FrameDimensions {
        self.frame
    }

    fn content_dimensions(&self, doc: &Document) -> FrameDimensions {
        match self.columns {
            Some(_) => self.frame,
            None => FrameDimensions::new(
                self.frame.width,
                (self.place(doc).lines as f64 * self.metrics.line_height).max(self.frame.height),
            ),
        }
    }

    fn bounding_rect(&self, doc: &Document, node: NodeId) -> Option<Rect> {
        Rect::union_all(&self.client_rects(doc, node))
    }

    fn client_rects(&self, doc: &Document, node: NodeId) -> Vec<Rect> {
        let placement = self.place(doc);
        self.rects_for(&placement, node)
    }

    fn document_offset(&self, doc: &Document, node: NodeId) -> Option<DocumentOffset> {
        let bounds = self.bounding_rect(doc, node)?;
        Some(match self.columns {
            // the root element is translated, so offsets stay viewport-relative
            Some(_) => DocumentOffset {
                left: bounds.left,
                top: bounds.top,
            },
            None => DocumentOffset {
                left: bounds.left + self.scroll_left,
                top: bounds.top + self.scroll_top,
            },
        })
    }

    fn supports_caret_positions(&self) -> bool {
        self.caret_positions
    }

    fn caret_position_from_point(&self, doc: &Document, x: f64, y: f64) -> Option<CaretPosition> {
        if !self.caret_positions {
            return None;
        }
        let doc_x = x + self.scroll_left;
        let doc_y = y + self.scroll_top;
        if doc_x < 0.0 || doc_y < 0.0 {
            return None;
        }

        let rows = self.rows_per_column();
        let (column, within) = match self.columns {
            Some(_) => {
                let column = (doc_x / self.column_stride()).floor() as usize;
                (column, doc_x - column as f64 * self.column_stride())
            }
            None => (0, doc_x),
        };
        let row = (doc_y / self.metrics.line_height).floor() as usize;
        if within >= self.column_width() || (self.columns.is_some() && row >= rows) {
            return self.body_caret(doc);
        }

        let line = column.saturating_mul(rows).saturating_add(row);
        let placement = self.place(doc);
        let Some(glyphs) = placement.glyphs.get(&line).filter(|g| !g.is_empty()) else {
            return self.body_caret(doc);
        };

        let col = (within / self.metrics.char_width).floor() as usize;
        let glyph = glyphs
            .iter()
            .find(|g| g.col == col)
            .copied()
            .or_else(|| {
                let last = glyphs[glyphs.len() - 1];
                if col > last.col {
                    Some(Glyph {
                        offset: last.offset + last.units,
                        ..last
                    })
                } else {
                    glyphs.first().copied()
                }
            })?;
        Some(CaretPosition {
            node: glyph.node,
            offset: glyph.offset,
        })
    }
}
