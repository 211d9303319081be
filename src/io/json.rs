use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, read_source, require_records, write_output};
use crate::model::Record;

/// JSON documents whose root is an array of records.
#[derive(Debug, Clone, Copy)]
pub struct JsonHandler {
    indent: usize,
}

impl JsonHandler {
    /// `indent` is the number of spaces per nesting level in written files.
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }
}

impl Default for JsonHandler {
    fn default() -> Self {
        Self::new(4)
    }
}

impl FormatHandler for JsonHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let bytes = read_source(path, "JSON")?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|err| ConverterError::processing_with(path, "invalid JSON format", err))?;

        match value {
            Value::Array(items) => Ok(items.into_iter().map(Record::from_json).collect()),
            other => Err(ConverterError::processing(
                path,
                format!(
                    "JSON content has wrong structure: expected an array at the root, found {}",
                    json_kind(&other)
                ),
            )),
        }
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        require_records(records, "JSON")?;

        let indent = vec![b' '; self.indent];
        let mut bytes = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(&indent));
        records
            .serialize(&mut serializer)
            .map_err(|err| ConverterError::processing_with(path, "could not serialise JSON", err))?;
        bytes.push(b'\n');

        write_output(path, &bytes)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn object_root_is_a_structure_error() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("object.json");
        fs::write(&path, r#"{"id": 1}"#).expect("seed JSON");

        let err = JsonHandler::default().read(&path).expect_err("object root");
        assert!(err.to_string().contains("wrong structure"), "got: {err}");
    }

    #[test]
    fn syntax_errors_are_processing_errors() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{").expect("seed JSON");

        let err = JsonHandler::default().read(&path).expect_err("broken JSON");
        match err {
            ConverterError::FileProcessing { message, .. } => {
                assert!(message.starts_with("invalid JSON format"), "got: {message}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn whitespace_only_file_is_empty() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("blank.json");
        fs::write(&path, " \n").expect("seed JSON");

        assert!(JsonHandler::default().read(&path).expect("JSON parsed").is_empty());
    }

    #[test]
    fn writes_indented_array_keeping_key_order() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("out.json");
        let records = vec![Record::row([("id", "1"), ("data", "sample")])];

        JsonHandler::new(2).write(&path, &records).expect("JSON written");
        assert_eq!(
            fs::read_to_string(&path).expect("JSON read"),
            "[\n  {\n    \"id\": \"1\",\n    \"data\": \"sample\"\n  }\n]\n"
        );
    }

    #[test]
    fn non_object_elements_become_opaque() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("mixed.json");
        fs::write(&path, r#"[{"type": "text", "content": "hi"}, "loose", 7]"#).expect("seed JSON");

        assert_eq!(
            JsonHandler::default().read(&path).expect("JSON parsed"),
            vec![
                Record::text("hi"),
                Record::Opaque("loose".into()),
                Record::Opaque("7".into()),
            ]
        );
    }
}
