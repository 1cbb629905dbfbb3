//! EPUB package loading
//!
//! Just enough of the OCF container to get at spine items: the rootfile
//! named in `META-INF/container.xml`, the OPF manifest and the spine order.
//! Content documents come back as markup or as a parsed [`Document`].

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;
use zip::ZipArchive;

use crate::cfi::{package_cfi, Cfi, CfiParseError};
use crate::dom::{parse_markup, Document};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// EPUB loading errors
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error in {file}: {source}")]
    Xml {
        file: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("No rootfile found in META-INF/container.xml")]
    MissingRootfile,

    #[error("Resource '{0}' not found in EPUB")]
    MissingResource(String),

    #[error("Spine item {index} out of range (spine has {len} items)")]
    SpineIndex { index: usize, len: usize },

    #[error("Invalid CFI: {0}")]
    Cfi(#[from] CfiParseError),
}

/// One `itemref` resolved against the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpineItem {
    pub idref: String,
    /// Archive path, relative to the container root
    pub path: String,
    pub media_type: String,
}

/// An opened EPUB archive
pub struct EpubPackage {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    opf_path: String,
    spine: Vec<SpineItem>,
}

impl EpubPackage {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PackageError> {
        Self::from_bytes(fs::read(path)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, PackageError> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let container = read_entry(&mut archive, CONTAINER_PATH)?;
        let opf_path = parse_rootfile(&container)?;
        let opf = read_entry(&mut archive, &opf_path)?;
        let spine = parse_spine(&opf, &opf_path)?;
        tracing::debug!("Loaded package {} with {} spine items", opf_path, spine.len());

        Ok(Self {
            archive,
            opf_path,
            spine,
        })
    }

    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    pub fn spine(&self) -> &[SpineItem] {
        &self.spine
    }

    pub fn spine_item(&self, index: usize) -> Result<&SpineItem, PackageError> {
        self.spine.get(index).ok_or(PackageError::SpineIndex {
            index,
            len: self.spine.len(),
        })
    }

    /// Raw markup of a spine item
    pub fn spine_markup(&mut self, index: usize) -> Result<String, PackageError> {
        let path = self.spine_item(index)?.path.clone();
        read_entry(&mut self.archive, &path)
    }

    /// Spine item parsed leniently into a document tree
    pub fn spine_document(&mut self, index: usize) -> Result<Document, PackageError> {
        Ok(parse_markup(&self.spine_markup(index)?))
    }

    /// Full package CFI for a content CFI inside spine item `index`
    pub fn package_cfi(&self, index: usize, content_cfi: &str) -> Result<Cfi, PackageError> {
        let item = self.spine_item(index)?;
        Ok(package_cfi(index, Some(&item.idref), content_cfi)?)
    }
}

/// Read an archive entry as text, matching the path leniently
fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, path: &str) -> Result<String, PackageError> {
    let wanted = normalize_epub_path(path);
    let name = archive
        .file_names()
        .find(|name| normalize_epub_path(name).eq_ignore_ascii_case(&wanted))
        .map(str::to_string)
        .ok_or_else(|| PackageError::MissingResource(path.to_string()))?;

    let mut file = archive.by_name(&name)?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(String::from_utf8_lossy(strip_bom(&content)).into_owned())
}

/// URL-decode, use forward slashes and drop leading `./` or `/`
fn normalize_epub_path(path: &str) -> String {
    let decoded = urlencoding::decode(path).unwrap_or_else(|_| path.into());
    decoded
        .replace('\\', "/")
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

/// Join a manifest href onto the OPF's directory, folding `..` segments
fn resolve_href(opf_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut segments: Vec<&str> = match opf_path.rfind('/') {
        Some(idx) => opf_path[..idx].split('/').collect(),
        None => Vec::new(),
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn parse_rootfile(container: &str) -> Result<String, PackageError> {
    let mut reader = Reader::from_str(container);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attribute(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => return Err(PackageError::MissingRootfile),
            Err(source) => {
                return Err(PackageError::Xml {
                    file: CONTAINER_PATH.to_string(),
                    source,
                })
            }
            _ => {}
        }
    }
}

fn parse_spine(opf: &str, opf_path: &str) -> Result<Vec<SpineItem>, PackageError> {
    let mut reader = Reader::from_str(opf);
    reader.trim_text(true);

    // id -> (href, media-type)
    let mut manifest: HashMap<String, (String, String)> = HashMap::new();
    let mut idrefs: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"item" => {
                    if let (Some(id), Some(href)) = (attribute(&e, b"id"), attribute(&e, b"href")) {
                        let media_type = attribute(&e, b"media-type").unwrap_or_default();
                        manifest.insert(id, (href, media_type));
                    }
                }
                b"itemref" => {
                    if let Some(idref) = attribute(&e, b"idref") {
                        idrefs.push(idref);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(source) => {
                return Err(PackageError::Xml {
                    file: opf_path.to_string(),
                    source,
                })
            }
            _ => {}
        }
    }

    Ok(idrefs
        .into_iter()
        .filter_map(|idref| match manifest.get(&idref) {
            Some((href, media_type)) => Some(SpineItem {
                path: resolve_href(opf_path, href),
                media_type: media_type.clone(),
                idref,
            }),
            None => {
                tracing::warn!("Spine itemref '{}' has no manifest entry", idref);
                None
            }
        })
        .collect())
}
