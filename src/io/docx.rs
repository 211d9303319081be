//! Word documents.
//!
//! Reading walks the main document part in document order: every body
//! paragraph is counted, non-blank ones become [`Record::Paragraph`] with
//! their style identifier, and each top-level table becomes a
//! [`Record::Table`]. Writing produces a minimal package with one document
//! part.

use std::io::{Read, Seek};
use std::mem;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, require_records, source_is_empty, write_output};
use crate::model::Record;

use super::ooxml::{
    CONTENT_TYPES_PART, OFFICE_RELS_NS, PACKAGE_RELS_PART, PackageResult, PackageWriter, REL_OFFICE_DOCUMENT,
    Relationship, XmlPart, attribute, content_types, main_part, open_package, read_part, relationships_part,
};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Style reported for paragraphs without an explicit one.
pub const DEFAULT_STYLE: &str = "Normal";

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxHandler;

impl FormatHandler for DocxHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        if source_is_empty(path, "Word")? {
            return Ok(Vec::new());
        }
        let mut archive = open_package(path, "Word")?;
        let records = read_document(&mut archive)
            .map_err(|err| ConverterError::processing_with(path, "invalid Word document", err))?;
        debug!(records = records.len(), "parsed Word document");
        Ok(records)
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        require_records(records, "Word")?;
        let bytes = render_document(records)
            .map_err(|err| ConverterError::processing_with(path, "could not write Word document", err))?;
        write_output(path, &bytes)
    }
}

fn read_document<R: Read + Seek>(archive: &mut ZipArchive<R>) -> PackageResult<Vec<Record>> {
    let part = main_part(archive, DOCUMENT_PART)?;
    let xml = read_part(archive, &part)?;
    parse_body(&xml)
}

/// Accumulates paragraphs and tables while the document part streams by.
/// Nested paragraphs (text boxes) and nested tables fold into their
/// enclosing paragraph or cell.
#[derive(Default)]
struct BodyParser {
    records: Vec<Record>,
    paragraph_count: u32,
    table_count: u32,
    paragraph_depth: usize,
    table_depth: usize,
    in_properties: bool,
    in_text: bool,
    text: String,
    style: Option<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

impl BodyParser {
    fn start_paragraph(&mut self) {
        if self.paragraph_depth == 0 {
            self.text.clear();
            self.style = None;
        }
        self.paragraph_depth += 1;
    }

    fn end_paragraph(&mut self) {
        self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
        if self.paragraph_depth > 0 {
            return;
        }

        let text = mem::take(&mut self.text);
        let content = text.trim();
        if self.table_depth > 0 {
            self.cell.push(content.to_string());
            return;
        }

        self.paragraph_count += 1;
        if !content.is_empty() {
            self.records.push(Record::Paragraph {
                content: content.to_string(),
                number: Some(self.paragraph_count),
                style: Some(self.style.take().unwrap_or_else(|| DEFAULT_STYLE.to_string())),
            });
        }
    }

    fn set_style(&mut self, style: Option<String>) {
        if self.paragraph_depth == 1 && self.table_depth == 0 {
            self.style = style;
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.paragraph_depth > 0 {
            self.text.push_str(text);
        }
    }

    fn start_table(&mut self) {
        if self.table_depth == 0 {
            self.rows.clear();
        }
        self.table_depth += 1;
    }

    fn end_table(&mut self) {
        self.table_depth = self.table_depth.saturating_sub(1);
        if self.table_depth == 0 {
            self.table_count += 1;
            self.records.push(Record::Table {
                rows: mem::take(&mut self.rows),
                number: Some(self.table_count),
            });
        }
    }

    fn start_row(&mut self) {
        if self.table_depth == 1 {
            self.row.clear();
        }
    }

    fn end_row(&mut self) {
        if self.table_depth == 1 {
            self.rows.push(mem::take(&mut self.row));
        }
    }

    fn start_cell(&mut self) {
        if self.table_depth == 1 {
            self.cell.clear();
        }
    }

    fn end_cell(&mut self) {
        if self.table_depth == 1 {
            let text = mem::take(&mut self.cell).join("\n");
            self.row.push(text.trim().to_string());
        }
    }
}

fn parse_body(xml: &str) -> PackageResult<Vec<Record>> {
    let mut reader = Reader::from_str(xml);
    let mut body = BodyParser::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => body.start_paragraph(),
                b"pPr" => body.in_properties = true,
                b"pStyle" => body.set_style(attribute(&e, b"val")?),
                b"t" => body.in_text = true,
                b"tbl" => body.start_table(),
                b"tr" => body.start_row(),
                b"tc" => body.start_cell(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => {
                    body.start_paragraph();
                    body.end_paragraph();
                }
                b"pStyle" => body.set_style(attribute(&e, b"val")?),
                b"tab" if !body.in_properties => body.push_text("\t"),
                b"br" | b"cr" => body.push_text("\n"),
                b"tc" => {
                    body.start_cell();
                    body.end_cell();
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => body.end_paragraph(),
                b"pPr" => body.in_properties = false,
                b"t" => body.in_text = false,
                b"tbl" => body.end_table(),
                b"tr" => body.end_row(),
                b"tc" => body.end_cell(),
                _ => {}
            },
            Event::Text(e) if body.in_text => body.push_text(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body.records)
}

fn render_document(records: &[Record]) -> PackageResult<Vec<u8>> {
    let mut package = PackageWriter::new();
    package.add_part(
        CONTENT_TYPES_PART,
        &content_types(&[(DOCUMENT_PART.to_string(), DOCUMENT_CONTENT_TYPE)])?,
    )?;
    package.add_part(
        PACKAGE_RELS_PART,
        &relationships_part(&[Relationship::new("rId1", REL_OFFICE_DOCUMENT, DOCUMENT_PART)])?,
    )?;
    package.add_part(DOCUMENT_PART, &document_xml(records)?)?;
    package.finish()
}

fn document_xml(records: &[Record]) -> PackageResult<Vec<u8>> {
    let mut part = XmlPart::new()?;
    part.open("w:document", &[("xmlns:w", WORDML_NS), ("xmlns:r", OFFICE_RELS_NS)])?;
    part.open("w:body", &[])?;

    for record in records {
        match record {
            Record::Table { rows, .. } if !rows.is_empty() => write_table(&mut part, rows)?,
            Record::Paragraph { content, style, .. } => write_paragraph(&mut part, content, style.as_deref())?,
            other => write_paragraph(&mut part, &other.content(), None)?,
        }
    }

    // US Letter with one-inch margins, in twentieths of a point.
    part.open("w:sectPr", &[])?;
    part.empty("w:pgSz", &[("w:w", "12240"), ("w:h", "15840")])?;
    part.empty(
        "w:pgMar",
        &[
            ("w:top", "1440"),
            ("w:right", "1440"),
            ("w:bottom", "1440"),
            ("w:left", "1440"),
            ("w:header", "720"),
            ("w:footer", "720"),
            ("w:gutter", "0"),
        ],
    )?;
    part.close("w:sectPr")?;

    part.close("w:body")?;
    part.close("w:document")?;
    Ok(part.into_bytes())
}

/// Blank paragraphs are dropped.
fn write_paragraph(part: &mut XmlPart, text: &str, style: Option<&str>) -> PackageResult<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    part.open("w:p", &[])?;
    if let Some(style) = style.filter(|style| *style != DEFAULT_STYLE) {
        part.open("w:pPr", &[])?;
        part.empty("w:pStyle", &[("w:val", style)])?;
        part.close("w:pPr")?;
    }
    write_run(part, text)?;
    part.close("w:p")
}

/// One run; newlines become breaks and tabs become tab stops.
fn write_run(part: &mut XmlPart, text: &str) -> PackageResult<()> {
    part.open("w:r", &[])?;
    for (line_idx, line) in text.split('\n').enumerate() {
        if line_idx > 0 {
            part.empty("w:br", &[])?;
        }
        for (segment_idx, segment) in line.trim_end_matches('\r').split('\t').enumerate() {
            if segment_idx > 0 {
                part.empty("w:tab", &[])?;
            }
            if !segment.is_empty() {
                part.element("w:t", &[("xml:space", "preserve")], segment)?;
            }
        }
    }
    part.close("w:r")
}

fn write_table(part: &mut XmlPart, rows: &[Vec<String>]) -> PackageResult<()> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

    part.open("w:tbl", &[])?;
    part.open("w:tblPr", &[])?;
    part.empty("w:tblStyle", &[("w:val", "TableGrid")])?;
    part.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
    part.close("w:tblPr")?;

    part.open("w:tblGrid", &[])?;
    for _ in 0..columns {
        part.empty("w:gridCol", &[])?;
    }
    part.close("w:tblGrid")?;

    for row in rows {
        part.open("w:tr", &[])?;
        for col_idx in 0..columns {
            let cell = row.get(col_idx).map(String::as_str).unwrap_or_default();
            part.open("w:tc", &[])?;
            // Every cell needs a paragraph, even an empty one.
            part.open("w:p", &[])?;
            if !cell.is_empty() {
                write_run(part, cell)?;
            }
            part.close("w:p")?;
            part.close("w:tc")?;
        }
        part.close("w:tr")?;
    }
    part.close("w:tbl")?;

    // Word merges adjacent tables unless a paragraph separates them.
    part.empty("w:p", &[])
}
