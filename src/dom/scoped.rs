//! Temporary document edits that undo themselves
//!
//! Measuring a partial text node means swapping a working copy into the live
//! tree, or splicing a marker element into a text node. A [`ScopedEdit`]
//! records each change and reverts all of them, newest first, when it is
//! dropped, so the tree is restored on every exit path.

use std::ops::{Deref, DerefMut};

use super::document::Document;
use super::node::NodeId;

enum Undo {
    /// `replacement` sits where `original` was
    Swap { original: NodeId, replacement: NodeId },
    /// `marker` was spliced into `text`, which may have been split into `tail`
    Inject {
        marker: NodeId,
        text: NodeId,
        tail: Option<NodeId>,
    },
}

/// Guard over a document whose changes are reverted on drop
pub struct ScopedEdit<'d> {
    doc: &'d mut Document,
    undo: Vec<Undo>,
}

impl<'d> ScopedEdit<'d> {
    pub fn new(doc: &'d mut Document) -> Self {
        Self {
            doc,
            undo: Vec::new(),
        }
    }

    /// Replace `element` with a deep copy of itself and return the copy.
    ///
    /// Returns `None` when `element` is not attached to a parent.
    pub fn swap_in_clone(&mut self, element: NodeId) -> Option<NodeId> {
        self.doc.parent(element)?;
        let copy = self.doc.deep_clone(element);
        if !self.doc.replace(element, copy) {
            self.doc.discard(copy);
            return None;
        }
        self.undo.push(Undo::Swap {
            original: element,
            replacement: copy,
        });
        Some(copy)
    }

    /// Splice `marker` into `text` at a UTF-16 offset.
    ///
    /// Returns false when `text` is not an attached text node.
    pub fn inject_at_offset(&mut self, text: NodeId, utf16_offset: usize, marker: NodeId) -> bool {
        if !self.doc.is_text(text) || self.doc.parent(text).is_none() {
            return false;
        }
        let tail = if utf16_offset == 0 {
            self.doc.insert_before(text, marker);
            None
        } else {
            let tail = self.doc.split_text(text, utf16_offset);
            match tail {
                Some(tail_node) => self.doc.insert_before(tail_node, marker),
                None => self.doc.insert_after(text, marker),
            }
            tail
        };
        self.undo.push(Undo::Inject { marker, text, tail });
        true
    }

    fn revert(&mut self, op: Undo) {
        match op {
            Undo::Swap {
                original,
                replacement,
            } => {
                self.doc.replace(replacement, original);
                self.doc.discard(replacement);
            }
            Undo::Inject { marker, text, tail } => {
                self.doc.discard(marker);
                if let Some(tail_node) = tail {
                    let rest = self.doc.text(tail_node).unwrap_or_default().to_string();
                    let mut head = self.doc.text(text).unwrap_or_default().to_string();
                    head.push_str(&rest);
                    self.doc.set_text(text, head);
                    self.doc.discard(tail_node);
                }
            }
        }
    }
}

impl Deref for ScopedEdit<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.doc
    }
}

impl DerefMut for ScopedEdit<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.doc
    }
}

impl Drop for ScopedEdit<'_> {
    fn drop(&mut self) {
        while let Some(op) = self.undo.pop() {
            self.revert(op);
        }
    }
}
