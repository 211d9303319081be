//! MOBI and AZW3 books through Calibre's command-line tools.
//!
//! Both directions go through a plain-text rendition in a scratch directory.
//! Reading converts the book to text, splits it like a `.txt` file and
//! prepends the title and author reported by `ebook-meta`. Writing renders
//! the records as text and converts that into the book, passing metadata
//! records as `--title`/`--authors`.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, require_records, source_is_empty, write_output};
use crate::model::Record;

use super::external::ExternalTool;
use super::text::TxtHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbookFormat {
    Mobi,
    Azw3,
}

impl EbookFormat {
    pub fn extension(self) -> &'static str {
        match self {
            EbookFormat::Mobi => "mobi",
            EbookFormat::Azw3 => "azw3",
        }
    }

    fn label(self) -> &'static str {
        match self {
            EbookFormat::Mobi => "MOBI",
            EbookFormat::Azw3 => "AZW3",
        }
    }

    fn sibling(self) -> EbookFormat {
        match self {
            EbookFormat::Mobi => EbookFormat::Azw3,
            EbookFormat::Azw3 => EbookFormat::Mobi,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EbookHandler {
    format: EbookFormat,
    convert: ExternalTool,
    meta: ExternalTool,
}

impl EbookHandler {
    /// `convert` plays the role of `ebook-convert`, `meta` of `ebook-meta`.
    pub fn new(format: EbookFormat, convert: ExternalTool, meta: ExternalTool) -> Self {
        Self { format, convert, meta }
    }

    fn scratch(&self, path: &Path) -> Result<TempDir> {
        tempfile::tempdir().map_err(|err| ConverterError::processing_with(path, "could not create scratch directory", err))
    }

    /// Title and author of the book. Failures are logged and yield `None`
    /// so a book without readable metadata still converts.
    fn read_metadata(&self, path: &Path, scratch: &Path) -> Option<Record> {
        let opf_path = scratch.join("metadata.opf");
        let result = self
            .meta
            .run([path.as_os_str(), OsStr::new("--to-opf"), opf_path.as_os_str()], path)
            .and_then(|()| {
                fs::read_to_string(&opf_path)
                    .map_err(|err| ConverterError::processing_with(path, "metadata tool wrote no OPF file", err))
            })
            .and_then(|opf| {
                parse_opf(&opf).map_err(|err| ConverterError::processing_with(path, "invalid OPF metadata", err))
            });

        match result {
            Ok((title, author)) => Some(Record::Metadata { title, author }),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read e-book metadata");
                None
            }
        }
    }
}

impl FormatHandler for EbookHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let label = self.format.label();
        if source_is_empty(path, label)? {
            return Ok(Vec::new());
        }

        let scratch = self.scratch(path)?;
        let text_path = scratch.path().join("book.txt");
        self.convert.run([path.as_os_str(), text_path.as_os_str()], path)?;

        let blocks = TxtHandler
            .read(&text_path)
            .map_err(|err| ConverterError::processing_with(path, &format!("could not read converted {label} text"), err))?;

        let mut records = Vec::with_capacity(blocks.len() + 1);
        records.extend(self.read_metadata(path, scratch.path()));
        records.extend(blocks);
        debug!(format = label, records = records.len(), "read e-book");
        Ok(records)
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        let label = self.format.label();
        require_records(records, label)?;

        // Metadata travels as converter options; it only becomes body text
        // when there is nothing else to write.
        let body: Vec<Record> = records
            .iter()
            .filter(|record| !matches!(record, Record::Metadata { .. }))
            .cloned()
            .collect();
        let body = if body.is_empty() { records } else { &body[..] };

        let scratch = self.scratch(path)?;
        let text_path = scratch.path().join("book.txt");
        TxtHandler.write(&text_path, body)?;

        let book_path = scratch.path().join(format!("book.{}", self.format.extension()));
        let mut args: Vec<OsString> = vec![text_path.into(), book_path.clone().into()];
        if let Some((title, author)) = book_metadata(records) {
            if let Some(title) = title {
                args.push("--title".into());
                args.push(title.into());
            }
            if let Some(author) = author {
                args.push("--authors".into());
                args.push(author.into());
            }
        }
        self.convert.run(&args, path)?;

        let bytes = fs::read(&book_path).map_err(|err| {
            ConverterError::processing_with(path, &format!("converter produced no {label} file"), err)
        })?;
        write_output(path, &bytes)
    }

    fn declared_conversions(&self) -> Vec<(String, String)> {
        vec![(
            self.format.extension().to_string(),
            self.format.sibling().extension().to_string(),
        )]
    }
}

/// Title and author of the first metadata record.
fn book_metadata(records: &[Record]) -> Option<(Option<&str>, Option<&str>)> {
    records.iter().find_map(|record| match record {
        Record::Metadata { title, author } => Some((title.as_deref(), author.as_deref())),
        _ => None,
    })
}

/// `dc:title` and the `dc:creator` entries of an OPF package document.
/// Several creators are joined with ` & `.
fn parse_opf(xml: &str) -> quick_xml::Result<(Option<String>, Option<String>)> {
    #[derive(Clone, Copy, PartialEq)]
    enum Field {
        Title,
        Creator,
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut title: Option<String> = None;
    let mut creators: Vec<String> = Vec::new();
    let mut current = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                current = match e.local_name().as_ref() {
                    b"title" if title.is_none() => Some(Field::Title),
                    b"creator" => Some(Field::Creator),
                    _ => None,
                };
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                let text = text.trim();
                match current {
                    Some(Field::Title) if !text.is_empty() => title = Some(text.to_string()),
                    Some(Field::Creator) if !text.is_empty() => creators.push(text.to_string()),
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    let author = (!creators.is_empty()).then(|| creators.join(" & "));
    Ok((title, author))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const MISSING: &str = "omniconv-no-such-program";

    fn handler(convert: &Path, meta: &Path, format: EbookFormat) -> EbookHandler {
        EbookHandler::new(
            format,
            ExternalTool::new(convert, Duration::from_secs(10)),
            ExternalTool::new(meta, Duration::from_secs(10)),
        )
    }

    #[cfg(unix)]
    fn stub(dir: &Path, name: &str, script: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{script}")).expect("stub written");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("stub made executable");
        path
    }

    #[test]
    fn missing_book_is_reported_before_running_the_tool() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("missing.mobi");
        let err = handler(Path::new(MISSING), Path::new(MISSING), EbookFormat::Mobi)
            .read(&path)
            .expect_err("missing book");

        assert!(err.to_string().starts_with("MOBI file not found"), "got: {err}");
    }

    #[test]
    fn missing_tool_is_a_processing_error() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("book.azw3");
        fs::write(&path, b"not really a book").expect("seed book");

        let err = handler(Path::new(MISSING), Path::new(MISSING), EbookFormat::Azw3)
            .read(&path)
            .expect_err("tool missing");
        assert!(matches!(err, ConverterError::FileProcessing { .. }));
        assert!(err.to_string().contains("was not found"), "got: {err}");
    }

    #[test]
    fn empty_records_are_rejected_without_output() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("book.mobi");
        let err = handler(Path::new(MISSING), Path::new(MISSING), EbookFormat::Mobi)
            .write(&path, &[])
            .expect_err("empty input");

        assert!(matches!(err, ConverterError::Validation(_)));
        assert!(!path.exists());
    }

    #[test]
    fn declares_the_sibling_conversion() {
        let conversions = handler(Path::new("ebook-convert"), Path::new("ebook-meta"), EbookFormat::Mobi)
            .declared_conversions();
        assert_eq!(conversions, vec![("mobi".to_string(), "azw3".to_string())]);
    }

    #[test]
    fn opf_title_and_creators() {
        let opf = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Good Omens</dc:title>
    <dc:creator>Terry Pratchett</dc:creator>
    <dc:creator>Neil Gaiman</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
</package>"#;
        assert_eq!(
            parse_opf(opf).expect("OPF parsed"),
            (
                Some("Good Omens".to_string()),
                Some("Terry Pratchett & Neil Gaiman".to_string())
            )
        );
        assert_eq!(parse_opf("<package/>").expect("OPF parsed"), (None, None));
    }

    #[cfg(unix)]
    #[test]
    fn round_trip_through_stand_in_tools() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let convert = stub(
            dir.path(),
            "fake-ebook-convert",
            "cp \"$1\" \"$2\"\nshift 2\necho \"$@\" > \"$(dirname \"$0\")/args.log\"\n",
        );
        let meta = stub(
            dir.path(),
            "fake-ebook-meta",
            "cat > \"$3\" <<'OPF'\n<package><metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
             <dc:title>Dune</dc:title><dc:creator>Frank Herbert</dc:creator></metadata></package>\nOPF\n",
        );

        let handler = handler(&convert, &meta, EbookFormat::Mobi);
        let path = dir.path().join("dune.mobi");
        let records = vec![
            Record::Metadata {
                title: Some("Dune".into()),
                author: Some("Frank Herbert".into()),
            },
            Record::Chapter {
                title: Some("Book One".into()),
                content: "A beginning is the time for taking the most delicate care.".into(),
            },
        ];

        handler.write(&path, &records).expect("book written");
        let args = fs::read_to_string(dir.path().join("args.log")).expect("arguments logged");
        assert_eq!(args.trim(), "--title Dune --authors Frank Herbert");

        assert_eq!(
            handler.read(&path).expect("book read"),
            vec![
                Record::Metadata {
                    title: Some("Dune".into()),
                    author: Some("Frank Herbert".into()),
                },
                Record::text("Book One"),
                Record::text("A beginning is the time for taking the most delicate care."),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_metadata_still_yields_the_text() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let convert = stub(dir.path(), "fake-ebook-convert", "cp \"$1\" \"$2\"\n");
        let path = dir.path().join("notes.azw3");
        fs::write(&path, "first\n\nsecond\n").expect("seed book");

        let records = handler(&convert, Path::new(MISSING), EbookFormat::Azw3)
            .read(&path)
            .expect("book read");
        assert_eq!(records, vec![Record::text("first"), Record::text("second")]);
    }
}
