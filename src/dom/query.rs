//! Namespace-aware element lookup
//!
//! Content documents arrive as XHTML with or without prefixes
//! (`<body>`, `<xhtml:body>`). Lookups here compare local names
//! case-insensitively so callers do not care which form they got.

use super::document::Document;
use super::node::NodeId;

/// Whether `node` is an element whose local name matches `name`
pub fn is_tag(doc: &Document, node: NodeId, name: &str) -> bool {
    doc.element(node)
        .map(|el| el.local_name().eq_ignore_ascii_case(name))
        .unwrap_or(false)
}

/// Elements below `scope` named `name`.
///
/// Matches the qualified name first; when nothing matches, retries with
/// any namespace on the local name.
pub fn elements_by_tag_name(doc: &Document, scope: NodeId, name: &str) -> Vec<NodeId> {
    let exact: Vec<NodeId> = doc
        .descendants(scope)
        .filter(|&node| {
            doc.element(node)
                .map(|el| el.name.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    doc.descendants(scope)
        .filter(|&node| is_tag(doc, node, name))
        .collect()
}

/// The `body` element of a content document
pub fn find_body(doc: &Document) -> Option<NodeId> {
    let root = doc.document_element()?;
    if let Some(body) = doc
        .children(root)
        .iter()
        .copied()
        .find(|&child| is_tag(doc, child, "body"))
    {
        return Some(body);
    }
    elements_by_tag_name(doc, root, "body").into_iter().next()
}

/// Whether `node` is the root element or the body element
pub fn is_root_or_body(doc: &Document, node: NodeId) -> bool {
    node == doc.root()
        || Some(node) == doc.document_element()
        || is_tag(doc, node, "html")
        || is_tag(doc, node, "body")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixed_doc() -> (Document, NodeId) {
        let mut doc = Document::new();
        let html = doc.create_element("xhtml:html");
        let body = doc.create_element("xhtml:body");
        let img = doc.create_element("xhtml:IMG");
        doc.append_child(doc.root(), html);
        doc.append_child(html, body);
        doc.append_child(body, img);
        (doc, img)
    }

    #[test]
    fn test_is_tag_ignores_prefix_and_case() {
        let (doc, img) = prefixed_doc();
        assert!(is_tag(&doc, img, "img"));
        assert!(!is_tag(&doc, img, "image"));
    }

    #[test]
    fn test_wildcard_namespace_fallback() {
        let (doc, img) = prefixed_doc();
        assert_eq!(elements_by_tag_name(&doc, doc.root(), "img"), vec![img]);
        assert_eq!(elements_by_tag_name(&doc, doc.root(), "xhtml:img"), vec![img]);
    }

    #[test]
    fn test_find_body_with_prefix() {
        let (doc, img) = prefixed_doc();
        let body = find_body(&doc).unwrap();
        assert_eq!(doc.parent(img), Some(body));
        assert!(is_root_or_body(&doc, body));
        assert!(!is_root_or_body(&doc, img));
    }
}
