use std::mem;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, StringFormat, Stream, dictionary};
use tracing::{debug, warn};

use crate::config::{PDF_PAGE_HEIGHT, PDF_PAGE_WIDTH, PdfLayout};
use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, read_source, require_records, write_output};
use crate::model::Record;

const FONT_RESOURCE: &str = "F1";

/// PDF documents. Reading extracts the text of each page; writing lays the
/// records out as word-wrapped Helvetica text, one blank line between
/// records.
#[derive(Debug, Clone, Default)]
pub struct PdfHandler {
    layout: PdfLayout,
}

impl PdfHandler {
    pub fn new(layout: PdfLayout) -> Self {
        Self { layout }
    }
}

impl FormatHandler for PdfHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let bytes = read_source(path, "PDF")?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let document = Document::load_mem(&bytes)
            .map_err(|err| ConverterError::processing_with(path, "invalid PDF", err.to_string()))?;
        if document.is_encrypted() {
            return Err(ConverterError::processing(path, "PDF is encrypted"));
        }

        let pages = document.get_pages();
        let mut records = Vec::with_capacity(pages.len());
        for &number in pages.keys() {
            match document.extract_text(&[number]) {
                Ok(text) => records.push(Record::Text {
                    content: text.trim().to_string(),
                    page: Some(number),
                }),
                Err(err) => {
                    warn!(page = number, error = %err, "could not extract page text");
                    records.push(Record::Opaque(format!("[Error extracting text: {err}]")));
                }
            }
        }

        debug!(pages = records.len(), "parsed PDF");
        Ok(records)
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        require_records(records, "PDF")?;

        let lines = layout_lines(records, self.layout.max_line_chars);
        let bytes = render_pdf(&lines, &self.layout)
            .map_err(|err| ConverterError::processing_with(path, "could not write PDF", err.to_string()))?;
        write_output(path, &bytes)
    }
}

/// Flattens the records into output lines. Blank records are skipped.
fn layout_lines(records: &[Record], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for record in records {
        let text = record.content();
        if text.trim().is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        for line in text.lines() {
            lines.extend(wrap_line(line, width));
        }
    }
    lines
}

/// Greedy word wrap at `width` characters. Words longer than a line are
/// split.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if current_len > 0 {
                lines.push(mem::take(&mut current));
                current_len = 0;
            }
            let split = word.char_indices().nth(width).map_or(word.len(), |(idx, _)| idx);
            lines.push(word[..split].to_string());
            word = &word[split..];
        }

        let len = word.chars().count();
        if current_len > 0 && current_len + 1 + len > width {
            lines.push(mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += len;
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn render_pdf(lines: &[String], layout: &PdfLayout) -> lopdf::Result<Vec<u8>> {
    let mut document = Document::with_version("1.7");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    });

    let per_page = layout.lines_per_page().max(1);
    let mut chunks: Vec<&[String]> = lines.chunks(per_page).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }

    let mut page_ids: Vec<Object> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let content = page_content(chunk, layout);
        let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PDF_PAGE_WIDTH.into(), PDF_PAGE_HEIGHT.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id.into());
    }

    let page_count = page_ids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    Ok(bytes)
}

/// One text object per line so extracted text keeps the line breaks.
fn page_content(lines: &[String], layout: &PdfLayout) -> Content {
    let top = PDF_PAGE_HEIGHT - layout.margin - layout.font_size;
    let mut operations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let y = top - idx as f32 * layout.line_height;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec![FONT_RESOURCE.into(), layout.font_size.into()]));
        operations.push(Operation::new("Td", vec![layout.margin.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(line), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    Content { operations }
}

/// Encodes `text` for a WinAnsiEncoding font. Latin-1 letters map to
/// themselves, the typographic characters WinAnsi places in 0x80..=0x9F get
/// their code, control characters become spaces and anything else `?`.
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{a0}'..='\u{ff}' | ' '..='~' => ch as u8,
            ch if ch.is_control() => b' ',
            ch => win_ansi_high(ch).unwrap_or(b'?'),
        })
        .collect()
}

/// Code points WinAnsiEncoding assigns to 0x80..=0x9F.
fn win_ansi_high(ch: char) -> Option<u8> {
    let code = match ch {
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => return None,
    };
    Some(code)
}
