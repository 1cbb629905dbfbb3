//! Markup parser
//!
//! Builds a [`Document`] from XHTML content documents with quick-xml.
//! Browsers reject XML 1.1 declarations, so those are rewritten to 1.0
//! first. Named HTML entities that plain XML does not define (`&nbsp;`,
//! `&mdash;`, ...) are decoded with html-escape.

use std::borrow::Cow;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;

use super::document::Document;
use super::node::{Attribute, ElementData, NodeId};

/// Markup parsing errors
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("XML error at position {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Invalid attribute at position {position}: {message}")]
    Attribute { position: usize, message: String },

    #[error("Unclosed element <{0}> at end of input")]
    Unclosed(String),

    #[error("Document has no root element")]
    Empty,
}

fn xml_11_declaration() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(<\?xml[\s\S]+?)version="1.1"([\s\S]+?\?>)"#)
            .expect("static XML declaration pattern is valid")
    })
}

/// Rewrite an XML 1.1 declaration to 1.0
pub fn pre_parse(markup: &str) -> Cow<'_, str> {
    if markup.find(r#"version="1.1""#).unwrap_or(0) == 0 {
        return Cow::Borrowed(markup);
    }
    tracing::info!("Replacing XML v1.1 declaration with v1.0");
    xml_11_declaration().replace(markup, r#"${1}version="1.0"${2}"#)
}

/// Parse markup, logging errors and keeping whatever was built before them
pub fn parse_markup(markup: &str) -> Document {
    let (doc, error) = build(markup);
    if let Some(err) = error {
        tracing::warn!("Markup parse error: {}", err);
    }
    doc
}

/// Parse markup, failing on the first error
pub fn try_parse_markup(markup: &str) -> Result<Document, MarkupError> {
    match build(markup) {
        (_, Some(err)) => Err(err),
        (doc, None) if doc.document_element().is_none() => Err(MarkupError::Empty),
        (doc, None) => Ok(doc),
    }
}

struct TreeBuilder {
    doc: Document,
    open: Vec<NodeId>,
    scopes: Vec<Vec<(String, String)>>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            doc: Document::new(),
            open: Vec::new(),
            scopes: Vec::new(),
        }
    }

    fn current_parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn resolve_namespace(&self, prefix: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(declared, _)| declared == prefix)
            .map(|(_, uri)| uri.clone())
    }

    fn open_element(&mut self, start: &BytesStart<'_>, position: usize) -> Result<NodeId, MarkupError> {
        let mut element = ElementData::new(String::from_utf8_lossy(start.name().as_ref()));
        let mut scope = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| MarkupError::Attribute {
                position,
                message: e.to_string(),
            })?;
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => {
                    html_escape::decode_html_entities(&String::from_utf8_lossy(&attr.value))
                        .into_owned()
                }
            };
            if name == "xmlns" {
                scope.push((String::new(), value.clone()));
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                scope.push((prefix.to_string(), value.clone()));
            }
            element.attributes.push(Attribute { name, value });
        }

        self.scopes.push(scope);
        element.namespace = self.resolve_namespace(element.prefix().unwrap_or(""));

        let parent = self.current_parent();
        let node = self.doc.create_element_with(element);
        self.doc.append_child(parent, node);
        Ok(node)
    }

    fn push_text(&mut self, content: String) {
        if self.open.is_empty() || content.is_empty() {
            return;
        }
        let parent = self.current_parent();
        let node = self.doc.create_text(content);
        self.doc.append_child(parent, node);
    }
}

fn decode_text(text: &BytesText<'_>) -> String {
    match text.unescape() {
        Ok(content) => content.into_owned(),
        Err(_) => html_escape::decode_html_entities(&String::from_utf8_lossy(text)).into_owned(),
    }
}

fn build(markup: &str) -> (Document, Option<MarkupError>) {
    let prepared = pre_parse(markup);
    let mut reader = Reader::from_str(&prepared);
    let mut builder = TreeBuilder::new();

    loop {
        let position = reader.buffer_position();
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return (builder.doc, Some(MarkupError::Xml { position, source }));
            }
        };

        match event {
            Event::Start(start) => match builder.open_element(&start, position) {
                Ok(node) => builder.open.push(node),
                Err(err) => return (builder.doc, Some(err)),
            },
            Event::Empty(start) => {
                if let Err(err) = builder.open_element(&start, position) {
                    return (builder.doc, Some(err));
                }
                builder.scopes.pop();
            }
            Event::End(_) => {
                builder.open.pop();
                builder.scopes.pop();
            }
            Event::Text(text) => builder.push_text(decode_text(&text)),
            Event::CData(data) => builder.push_text(String::from_utf8_lossy(&data).into_owned()),
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(&unclosed) = builder.open.last() {
        let name = builder
            .doc
            .element(unclosed)
            .map(|el| el.name.clone())
            .unwrap_or_default();
        return (builder.doc, Some(MarkupError::Unclosed(name)));
    }

    (builder.doc, None)
}
