//! CSV files as header-keyed rows.

use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde_json::Value;
use tracing::debug;

use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, open_source, require_records, write_output};
use crate::model::{Fields, Record, value_to_text};

use super::column_names;

/// Reads each data line into a [`Record::Row`] keyed by the header line and
/// writes any records back as a table whose header is the union of their
/// keys.
#[derive(Debug, Clone, Copy)]
pub struct CsvHandler {
    delimiter: u8,
}

impl CsvHandler {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvHandler {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl FormatHandler for CsvHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let file = open_source(path, "CSV")?;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|err| ConverterError::processing_with(path, "invalid CSV header", err))?
            .clone();

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|err| {
                ConverterError::processing_with(path, &format!("invalid CSV row {}", index + 1), err)
            })?;
            let fields: Fields = headers
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.to_string(), Value::from(value)))
                .collect();
            records.push(Record::Row(fields));
        }

        debug!(rows = records.len(), columns = headers.len(), "parsed CSV");
        Ok(records)
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        require_records(records, "CSV")?;

        let rows: Vec<Fields> = records.iter().map(Record::to_fields).collect();
        let columns = column_names(&rows);
        let fail = |err: csv::Error| ConverterError::processing_with(path, "could not write CSV", err);

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer.write_record(&columns).map_err(fail)?;
        for row in &rows {
            writer
                .write_record(columns.iter().map(|column| {
                    row.get(column)
                        .map(|value| value_to_text(value).into_owned())
                        .unwrap_or_default()
                }))
                .map_err(fail)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| ConverterError::processing_with(path, "could not write CSV", err.into_error()))?;
        write_output(path, &bytes)
    }
}
