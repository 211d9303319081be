use std::error::Error as _;
use std::fs;

use omniconv::{Converter, ConverterConfig, ConverterError, HandlerRegistry};
use serde_json::json;
use tempfile::tempdir;

fn converter() -> Converter {
    Converter::with_config(&ConverterConfig::default()).expect("built-in registry")
}

#[test]
fn csv_converts_to_json() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("sample.csv");
    let output = temp_dir.path().join("sample.json");
    fs::write(&input, "id,data\n1,sample\n2,other\n").expect("seed CSV");

    converter().convert(&input, &output).expect("conversion succeeds");

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("JSON read")).expect("valid JSON");
    assert_eq!(
        written,
        json!([
            {"id": "1", "data": "sample"},
            {"id": "2", "data": "other"}
        ])
    );
}

#[test]
fn json_converts_to_text() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("doc.JSON");
    let output = temp_dir.path().join("doc.txt");
    fs::write(
        &input,
        r#"[{"type": "paragraph", "content": "Hello"}, {"text": "World"}]"#,
    )
    .expect("seed JSON");

    converter().convert(&input, &output).expect("conversion succeeds");
    assert_eq!(fs::read_to_string(&output).expect("text read"), "Hello\n\nWorld\n");
}

#[test]
fn unsupported_destination_names_both_formats() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("sample.csv");
    let output = temp_dir.path().join("sample.xml");
    fs::write(&input, "id\n1\n").expect("seed CSV");

    let err = converter().convert(&input, &output).expect_err("xml is not supported");
    let message = err.to_string();
    assert!(message.contains("'csv'"), "got: {message}");
    assert!(message.contains("'xml'"), "got: {message}");
    assert!(matches!(err.cause(), Some(ConverterError::UnsupportedFormat { .. })));
    assert!(!output.exists());
}

#[test]
fn missing_source_is_wrapped_processing_error() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("missing.csv");
    let output = temp_dir.path().join("out.json");

    let err = converter().convert(&input, &output).expect_err("missing input");
    match err.cause() {
        Some(ConverterError::FileProcessing { path, .. }) => assert_eq!(path, &input),
        other => panic!("unexpected cause: {other:?}"),
    }
    assert!(err.to_string().contains("missing.csv"), "got: {err}");
    assert!(err.source().is_some());
}

#[test]
fn path_without_extension_fails() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("README");
    let output = temp_dir.path().join("readme.txt");
    fs::write(&input, "hello").expect("seed file");

    let err = converter().convert(&input, &output).expect_err("no source format");
    assert!(matches!(err, ConverterError::Conversion { .. }));
    assert!(err.to_string().contains("could not determine file formats"), "got: {err}");
}

#[test]
fn empty_source_fails_validation_and_writes_nothing() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("empty.csv");
    let output = temp_dir.path().join("empty.json");
    fs::write(&input, "").expect("seed CSV");

    let err = converter().convert(&input, &output).expect_err("nothing to write");
    assert!(matches!(err.cause(), Some(ConverterError::Validation(_))));
    assert!(!output.exists());
}

#[test]
fn repeated_conversions_are_byte_identical() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("people.csv");
    fs::write(&input, "name,age\nAda,36\n\"Hopper, Grace\",85\n").expect("seed CSV");

    let converter = converter();
    let mut outputs = Vec::new();
    for name in ["first.json", "second.json", "first.docx", "second.docx", "first.pdf", "second.pdf"] {
        let output = temp_dir.path().join(name);
        converter.convert(&input, &output).expect("conversion succeeds");
        outputs.push(fs::read(&output).expect("output read"));
    }
    for pair in outputs.chunks(2) {
        assert_eq!(pair[0], pair[1]);
    }

    let back = temp_dir.path().join("back.csv");
    converter
        .convert(&temp_dir.path().join("first.json"), &back)
        .expect("JSON converts back");
    assert_eq!(
        fs::read_to_string(&back).expect("CSV read"),
        fs::read_to_string(&input).expect("CSV read")
    );
}

#[test]
fn spreadsheet_round_trip_through_the_converter() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("stock.json");
    let workbook = temp_dir.path().join("stock.xlsx");
    let output = temp_dir.path().join("stock.csv");
    fs::write(&input, r#"[{"sku": "A-1", "qty": 4}, {"sku": "B-2", "qty": 12}]"#).expect("seed JSON");

    let converter = converter();
    converter.convert(&input, &workbook).expect("JSON to Excel");
    converter.convert(&workbook, &output).expect("Excel to CSV");
    assert_eq!(
        fs::read_to_string(&output).expect("CSV read"),
        "sku,qty\nA-1,4\nB-2,12\n"
    );
}

#[test]
fn every_builtin_format_resolves() {
    let registry = HandlerRegistry::builtin(&ConverterConfig::default()).expect("built-in registry");
    for format in ["csv", "json", "txt", "xlsx", "docx", "pptx", "ppsx", "pdf", "mobi", "azw3"] {
        assert!(registry.resolve(format).is_ok(), "{format} should resolve");
        assert!(registry.supports(&format.to_uppercase()));
    }
    assert!(matches!(
        registry.resolve("xml"),
        Err(ConverterError::UnsupportedFormat { .. })
    ));
    assert!(
        registry
            .declared_conversions()
            .contains(&("mobi".to_string(), "azw3".to_string()))
    );
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = ConverterConfig {
        csv_delimiter: '"',
        ..ConverterConfig::default()
    };
    assert!(matches!(
        Converter::with_config(&config),
        Err(ConverterError::InvalidConfig(_))
    ));
}

#[test]
fn json_copy_keeps_every_key() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("notes.json");
    let output = temp_dir.path().join("copy.json");
    let source = json!([
        {"type": "text", "content": "hello", "author": "ann", "id": 7},
        {"type": "paragraph", "content": "body", "number": 2, "style": "Quote"}
    ]);
    fs::write(&input, source.to_string()).expect("seed JSON");

    converter().convert(&input, &output).expect("conversion succeeds");

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("JSON read")).expect("valid JSON");
    assert_eq!(written, source);
}

#[test]
fn csv_columns_named_like_record_fields_survive_json() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("posts.csv");
    let middle = temp_dir.path().join("posts.json");
    let output = temp_dir.path().join("posts-copy.csv");
    fs::write(&input, "type,content,author\ntext,hello,ann\n").expect("seed CSV");

    let converter = converter();
    converter.convert(&input, &middle).expect("CSV to JSON");
    converter.convert(&middle, &output).expect("JSON to CSV");
    assert_eq!(
        fs::read_to_string(&output).expect("CSV read"),
        "type,content,author\ntext,hello,ann\n"
    );
}

#[test]
fn converter_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Converter>();

    let temp_dir = tempdir().expect("temporary directory");
    let first = temp_dir.path().join("first.csv");
    let second = temp_dir.path().join("second.json");
    fs::write(&first, "id,name\n1,Ada\n").expect("seed CSV");
    fs::write(&second, r#"[{"id": "2", "name": "Grace"}]"#).expect("seed JSON");

    let converter = converter();
    let first_out = temp_dir.path().join("first.json");
    let second_out = temp_dir.path().join("second.csv");
    std::thread::scope(|scope| {
        let a = scope.spawn(|| converter.convert(&first, &first_out));
        let b = scope.spawn(|| converter.convert(&second, &second_out));
        a.join().expect("first thread").expect("first conversion");
        b.join().expect("second thread").expect("second conversion");
    });

    assert_eq!(fs::read_to_string(&second_out).expect("CSV read"), "id,name\n2,Grace\n");
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&first_out).expect("JSON read")).expect("valid JSON");
    assert_eq!(written, json!([{"id": "1", "name": "Ada"}]));
}
