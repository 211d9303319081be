//! Office Open XML package plumbing shared by the Word and PowerPoint
//! handlers: part lookup, relationship parsing and a small XML part builder.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{ConverterError, Result};
use crate::handler::open_source;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
pub const OFFICE_RELS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing package part '{0}'")]
    MissingPart(String),
    #[error("package part '{0}' is not valid UTF-8")]
    Encoding(String),
}

pub type PackageResult<T> = std::result::Result<T, PackageError>;

pub type Archive = ZipArchive<BufReader<File>>;

/// Opens the package at `path`, reporting a missing file or a non-ZIP file
/// as a file-processing error.
pub fn open_package(path: &Path, label: &str) -> Result<Archive> {
    let file = open_source(path, label)?;
    ZipArchive::new(BufReader::new(file))
        .map_err(|err| ConverterError::processing_with(path, &format!("invalid {label} package"), err))
}

/// Reads a part as UTF-8 text.
pub fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> PackageResult<String> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Err(PackageError::MissingPart(name.to_string())),
        Err(err) => return Err(err.into()),
    };
    let mut bytes = Vec::new();
    part.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| PackageError::Encoding(name.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: String,
    pub target: String,
}

impl Relationship {
    pub fn new(id: impl Into<String>, kind: &str, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.to_string(),
            target: target.into(),
        }
    }
}

/// Parses a `.rels` part.
pub fn parse_relationships(xml: &str) -> PackageResult<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut relationships = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"Relationship" => {
                let mut relationship = Relationship::new("", "", "");
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.as_ref() {
                        b"Id" => relationship.id = value,
                        b"Type" => relationship.kind = value,
                        b"Target" => relationship.target = value,
                        _ => {}
                    }
                }
                relationships.push(relationship);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(relationships)
}

/// Relationships of `part`, or an empty list when it has none.
pub fn part_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> PackageResult<Vec<Relationship>> {
    match read_part(archive, &rels_part_for(part)) {
        Ok(xml) => parse_relationships(&xml),
        Err(PackageError::MissingPart(_)) => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

/// Locates the main document part through the package relationships,
/// falling back to `default` for packages without them.
pub fn main_part<R: Read + Seek>(archive: &mut ZipArchive<R>, default: &str) -> PackageResult<String> {
    let relationships = match read_part(archive, PACKAGE_RELS_PART) {
        Ok(xml) => parse_relationships(&xml)?,
        Err(PackageError::MissingPart(_)) => Vec::new(),
        Err(err) => return Err(err),
    };
    Ok(relationships
        .iter()
        .find(|rel| rel.kind == REL_OFFICE_DOCUMENT)
        .map(|rel| resolve_target("", &rel.target))
        .unwrap_or_else(|| default.to_string()))
}

/// `ppt/presentation.xml` → `ppt/_rels/presentation.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the part that declares it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
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

/// Unescaped value of the attribute whose local name is `local`.
pub fn attribute(e: &BytesStart<'_>, local: &[u8]) -> PackageResult<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn start_tag<'a>(name: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((*key, xml_chars(value).as_ref()));
    }
    start
}

/// Replaces characters outside the XML 1.0 `Char` production.
fn xml_chars(text: &str) -> Cow<'_, str> {
    fn allowed(ch: char) -> bool {
        matches!(ch, '\t' | '\n' | '\r') || (ch >= ' ' && ch != '\u{fffe}' && ch != '\u{ffff}')
    }

    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().map(|ch| if allowed(ch) { ch } else { ' ' }).collect())
    }
}

/// Builds a ZIP package in memory.
pub struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            // Fixed timestamps keep repeated writes byte-identical.
            options: FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default()),
        }
    }

    pub fn add_part(&mut self, name: &str, content: &[u8]) -> PackageResult<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(content)?;
        Ok(())
    }

    pub fn finish(mut self) -> PackageResult<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Streams one XML part.
pub struct XmlPart {
    writer: Writer<Vec<u8>>,
}

impl XmlPart {
    pub fn new() -> PackageResult<Self> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    pub fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> PackageResult<()> {
        self.writer.write_event(Event::Start(start_tag(name, attributes)))?;
        Ok(())
    }

    pub fn close(&mut self, name: &str) -> PackageResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> PackageResult<()> {
        self.writer.write_event(Event::Empty(start_tag(name, attributes)))?;
        Ok(())
    }

    /// Writes escaped character data. Characters XML 1.0 forbids become
    /// spaces.
    pub fn text(&mut self, text: &str) -> PackageResult<()> {
        let text = xml_chars(text);
        self.writer.write_event(Event::Text(BytesText::new(&text)))?;
        Ok(())
    }

    /// Writes `<name attributes>text</name>`.
    pub fn element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> PackageResult<()> {
        self.open(name, attributes)?;
        self.text(text)?;
        self.close(name)
    }

    /// Copies pre-built markup verbatim.
    pub fn raw(&mut self, markup: &str) -> PackageResult<()> {
        self.writer.get_mut().write_all(markup.as_bytes())?;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// `[Content_Types].xml` declaring `overrides` on top of the `rels`/`xml`
/// defaults.
pub fn content_types(overrides: &[(String, &str)]) -> PackageResult<Vec<u8>> {
    let mut part = XmlPart::new()?;
    part.open("Types", &[("xmlns", CONTENT_TYPES_NS)])?;
    part.empty("Default", &[("Extension", "rels"), ("ContentType", RELS_CONTENT_TYPE)])?;
    part.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for (name, content_type) in overrides {
        let part_name = format!("/{name}");
        part.empty(
            "Override",
            &[("PartName", part_name.as_str()), ("ContentType", content_type)],
        )?;
    }
    part.close("Types")?;
    Ok(part.into_bytes())
}

/// A `.rels` part listing `relationships`.
pub fn relationships_part(relationships: &[Relationship]) -> PackageResult<Vec<u8>> {
    let mut part = XmlPart::new()?;
    part.open("Relationships", &[("xmlns", RELATIONSHIPS_NS)])?;
    for rel in relationships {
        part.empty(
            "Relationship",
            &[
                ("Id", rel.id.as_str()),
                ("Type", rel.kind.as_str()),
                ("Target", rel.target.as_str()),
            ],
        )?;
    }
    part.close("Relationships")?;
    Ok(part.into_bytes())
}
