use std::path::Path;

use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, read_source, require_records, write_output};
use crate::model::Record;

/// Plain UTF-8 text. Blocks separated by blank lines become one
/// [`Record::Text`] each; writing joins record contents with a blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxtHandler;

impl FormatHandler for TxtHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let bytes = read_source(path, "text")?;
        let text = String::from_utf8(bytes)
            .map_err(|err| ConverterError::processing_with(path, "text file is not valid UTF-8", err))?;
        Ok(split_blocks(&text).into_iter().map(Record::text).collect())
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        require_records(records, "text")?;

        let blocks: Vec<_> = records.iter().map(Record::content).collect();
        let mut body = blocks.join("\n\n");
        body.push('\n');
        write_output(path, body.as_bytes())
    }
}

/// Groups consecutive non-blank lines. Line endings are normalised to `\n`.
pub(crate) fn split_blocks(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}
