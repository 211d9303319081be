use std::fs;
use std::path::Path;

use omniconv::io::delimited::CsvHandler;
use omniconv::io::docx::DocxHandler;
use omniconv::io::json::JsonHandler;
use omniconv::io::pdf::PdfHandler;
use omniconv::io::pptx::PptxHandler;
use omniconv::io::text::TxtHandler;
use omniconv::io::xlsx::XlsxHandler;
use omniconv::{ConverterError, FormatHandler, Record};
use serde_json::Value;
use tempfile::tempdir;

fn roundtrip(handler: &dyn FormatHandler, path: &Path, records: &[Record]) -> Vec<Record> {
    handler.write(path, records).expect("records written");
    handler.read(path).expect("records read back")
}

fn contents(records: &[Record]) -> Vec<String> {
    records.iter().map(|record| record.content().into_owned()).collect()
}

#[test]
fn csv_rows_survive() {
    let temp_dir = tempdir().expect("temporary directory");
    let records = vec![
        Record::row([("id", "1"), ("city", "Zürich"), ("note", "quoted \"word\"")]),
        Record::row([("id", "2"), ("city", "Oslo"), ("note", "line\nbreak")]),
    ];

    let restored = roundtrip(&CsvHandler::default(), &temp_dir.path().join("cities.csv"), &records);
    assert_eq!(restored, records);
}

#[test]
fn json_keeps_typed_records() {
    let temp_dir = tempdir().expect("temporary directory");
    let records = vec![
        Record::Metadata {
            title: Some("Annual report".into()),
            author: Some("Finance".into()),
        },
        Record::Paragraph {
            content: "Summary".into(),
            number: Some(1),
            style: Some("Heading1".into()),
        },
        Record::Table {
            rows: vec![vec!["q".into(), "revenue".into()], vec!["Q1".into(), "10".into()]],
            number: Some(1),
        },
        Record::row([("id", Value::from(7)), ("tags", serde_json::json!(["a", "b"]))]),
    ];

    let restored = roundtrip(&JsonHandler::default(), &temp_dir.path().join("report.json"), &records);
    assert_eq!(restored, records);
}

#[test]
fn text_blocks_survive() {
    let temp_dir = tempdir().expect("temporary directory");
    let records = vec![Record::text("first block\nsecond line"), Record::text("another block")];

    let restored = roundtrip(&TxtHandler, &temp_dir.path().join("notes.txt"), &records);
    assert_eq!(restored, records);
}

#[test]
fn excel_rows_survive() {
    let temp_dir = tempdir().expect("temporary directory");
    let records = vec![
        Record::row([("sku", Value::from("A-1")), ("qty", Value::from(4))]),
        Record::row([("sku", Value::from("B-2")), ("qty", Value::from(12))]),
    ];

    let restored = roundtrip(&XlsxHandler, &temp_dir.path().join("stock.xlsx"), &records);
    assert_eq!(restored, records);
}

#[test]
fn word_document_keeps_paragraph_text() {
    let temp_dir = tempdir().expect("temporary directory");
    let records = vec![
        Record::Paragraph {
            content: "Introduction".into(),
            number: None,
            style: Some("Heading1".into()),
        },
        Record::text("Body text & more"),
    ];

    let restored = roundtrip(&DocxHandler, &temp_dir.path().join("letter.docx"), &records);
    assert_eq!(contents(&restored), vec!["Introduction", "Body text & more"]);
    assert!(matches!(
        &restored[0],
        Record::Paragraph { style: Some(style), number: Some(1), .. } if style == "Heading1"
    ));
}

#[test]
fn presentations_keep_slide_text() {
    let temp_dir = tempdir().expect("temporary directory");
    let records = vec![Record::text("Welcome"), Record::text("Agenda\nQuestions")];

    for (handler, name) in [
        (PptxHandler::presentation(), "deck.pptx"),
        (PptxHandler::slideshow(), "deck.ppsx"),
    ] {
        let restored = roundtrip(&handler, &temp_dir.path().join(name), &records);
        assert_eq!(contents(&restored), vec!["Welcome", "Agenda\nQuestions"], "{name}");
        assert!(matches!(restored[1], Record::Slide { number: Some(2), .. }));
    }
}

#[test]
fn pdf_text_can_be_extracted() {
    let temp_dir = tempdir().expect("temporary directory");
    let records = vec![Record::text("Hello from the first record"), Record::text("and the second")];

    let restored = roundtrip(&PdfHandler::default(), &temp_dir.path().join("hello.pdf"), &records);
    assert_eq!(restored.len(), 1);
    let text = restored[0].content();
    assert!(text.contains("Hello from the first record"), "got: {text}");
    assert!(text.contains("and the second"), "got: {text}");
}

#[test]
fn empty_input_is_rejected_without_creating_files() {
    let temp_dir = tempdir().expect("temporary directory");
    let handlers: Vec<(Box<dyn FormatHandler>, &str)> = vec![
        (Box::new(CsvHandler::default()), "empty.csv"),
        (Box::new(JsonHandler::default()), "empty.json"),
        (Box::new(TxtHandler), "empty.txt"),
        (Box::new(XlsxHandler), "empty.xlsx"),
        (Box::new(DocxHandler), "empty.docx"),
        (Box::new(PptxHandler::presentation()), "empty.pptx"),
        (Box::new(PdfHandler::default()), "empty.pdf"),
    ];

    for (handler, name) in handlers {
        let path = temp_dir.path().join(name);
        let err = handler.write(&path, &[]).expect_err("empty input rejected");
        assert!(matches!(err, ConverterError::Validation(_)), "{name}: {err}");
        assert!(!path.exists(), "{name} was created");
    }
}

#[test]
fn zero_byte_sources_read_as_empty() {
    let temp_dir = tempdir().expect("temporary directory");
    let handlers: Vec<(Box<dyn FormatHandler>, &str)> = vec![
        (Box::new(CsvHandler::default()), "blank.csv"),
        (Box::new(JsonHandler::default()), "blank.json"),
        (Box::new(TxtHandler), "blank.txt"),
        (Box::new(XlsxHandler), "blank.xlsx"),
        (Box::new(DocxHandler), "blank.docx"),
        (Box::new(PptxHandler::presentation()), "blank.pptx"),
        (Box::new(PdfHandler::default()), "blank.pdf"),
    ];

    for (handler, name) in handlers {
        let path = temp_dir.path().join(name);
        fs::write(&path, b"").expect("seed file");
        let records = handler.read(&path).expect("empty file read");
        assert!(records.is_empty(), "{name} produced {records:?}");
    }
}
