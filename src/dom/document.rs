//! Arena-backed document tree
//!
//! Nodes live in a flat vector and refer to each other by [`NodeId`].
//! Detached subtrees stay allocated until [`Document::discard`] returns
//! their slots to the free list.

use super::node::{ElementData, Node, NodeData, NodeId};
use super::text;

/// A mutable markup document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    free: Vec<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            free: Vec::new(),
        }
    }

    /// The document node (parent of the root element)
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// First element child of the document node (`html`)
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&child| self.is_element(child))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Node::new(data);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Node::new(data));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(name)))
    }

    /// Create a detached element from prepared element data
    pub fn create_element_with(&mut self, data: ElementData) -> NodeId {
        self.alloc(NodeData::Element(data))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(content.into()))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Text of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(content) => Some(content),
            _ => None,
        }
    }

    /// Replace the text of a text node. Returns false for other node kinds.
    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) -> bool {
        match &mut self.node_mut(id).data {
            NodeData::Text(existing) => {
                *existing = content.into();
                true
            }
            _ => false,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Position of `id` among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    /// Next sibling that is an element
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return Some(node);
            }
            current = self.next_sibling(node);
        }
        None
    }

    /// Whether `ancestor` is a proper ancestor of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Unlink a node from its parent. The subtree stays allocated.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `child` at `index` among `parent`'s children (clamped)
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `node` right after `reference`. No-op if `reference` is detached.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if let (Some(parent), Some(idx)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, idx + 1, node);
        }
    }

    /// Insert `node` right before `reference`. No-op if `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if let (Some(parent), Some(idx)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, idx, node);
        }
    }

    /// Put `replacement` where `old` is and detach `old`.
    ///
    /// Returns false when `old` has no parent.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> bool {
        if self.parent(old).is_none() || old == replacement {
            return false;
        }
        self.detach(replacement);
        let (Some(parent), Some(idx)) = (self.parent(old), self.index_in_parent(old)) else {
            return false;
        };
        self.node_mut(parent).children[idx] = replacement;
        self.node_mut(replacement).parent = Some(parent);
        self.node_mut(old).parent = None;
        true
    }

    /// Copy a subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.node(id).data.clone();
        let copy = self.alloc(data);
        let children = self.node(id).children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Detach a subtree and release its slots for reuse
    pub fn discard(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let node_ref = self.node_mut(node);
            stack.append(&mut node_ref.children);
            node_ref.parent = None;
            node_ref.data = NodeData::Text(String::new());
            self.free.push(node.0);
        }
    }

    /// All descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// First element in the document carrying the given id
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&node| self.element(node).and_then(ElementData::id) == Some(id))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(content) = self.text(id) {
            return content.to_string();
        }
        self.descendants(id)
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Merge adjacent text nodes and drop empty ones below `id`
    pub fn normalize(&mut self, id: NodeId) {
        let mut targets = vec![id];
        targets.extend(self.descendants(id).filter(|&n| !self.is_text(n)));

        for element in targets {
            let children = self.children(element).to_vec();
            let mut previous_text: Option<NodeId> = None;
            for child in children {
                let Some(content) = self.text(child).map(str::to_string) else {
                    previous_text = None;
                    continue;
                };
                if content.is_empty() {
                    self.discard(child);
                    continue;
                }
                match previous_text {
                    Some(prev) => {
                        if let NodeData::Text(existing) = &mut self.node_mut(prev).data {
                            existing.push_str(&content);
                        }
                        self.discard(child);
                    }
                    None => previous_text = Some(child),
                }
            }
        }
    }

    /// Split a text node at a UTF-16 offset.
    ///
    /// The original node keeps the head; the tail goes into a new text node
    /// inserted right after it, which is returned. Offsets at either end
    /// split nothing and return `None`.
    pub fn split_text(&mut self, id: NodeId, utf16_offset: usize) -> Option<NodeId> {
        let content = self.text(id)?;
        if utf16_offset == 0 || utf16_offset >= text::utf16_len(content) {
            return None;
        }
        let at = text::byte_index(content, utf16_offset);
        let tail = content[at..].to_string();
        let head = content[..at].to_string();
        self.set_text(id, head);
        let tail_node = self.create_text(tail);
        self.insert_after(id, tail_node);
        Some(tail_node)
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(node).iter().rev().copied());
        Some(node)
    }
}
