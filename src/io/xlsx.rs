use std::io::{BufReader, Read, Seek};
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, XlsxError};
use rust_xlsxwriter::{Workbook, XlsxError as WriteError};
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, open_source, require_records, source_is_empty, write_output};
use crate::model::{Fields, Record, value_to_text};

use super::column_names;

/// Name of the single worksheet produced by [`XlsxHandler::write`].
pub const RECORDS_SHEET: &str = "Records";

/// Worksheet size limits of the Excel file format.
pub const MAX_COLUMNS: usize = 16_384;
pub const MAX_ROWS: usize = 1_048_576;

/// Excel workbooks. Every worksheet is read as a table whose first row holds
/// the column names; writing produces one [`RECORDS_SHEET`] worksheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxHandler;

impl FormatHandler for XlsxHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        if source_is_empty(path, "Excel")? {
            return Ok(Vec::new());
        }
        let file = open_source(path, "Excel")?;
        let mut workbook = Xlsx::new(BufReader::new(file))
            .map_err(|err| ConverterError::processing_with(path, "invalid Excel workbook", err))?;
        let sheets = read_sheets(&mut workbook)
            .map_err(|err| ConverterError::processing_with(path, "invalid Excel worksheet", err))?;

        let mut records = Vec::new();
        for (name, range) in &sheets {
            let before = records.len();
            ingest_sheet(range, &mut records);
            debug!(sheet = %name, rows = records.len() - before, "read worksheet");
        }
        Ok(records)
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        require_records(records, "Excel")?;

        let rows: Vec<Fields> = records.iter().map(Record::to_fields).collect();
        let columns = column_names(&rows);
        if columns.len() > MAX_COLUMNS {
            return Err(ConverterError::processing(
                path,
                format!("{} columns exceed the Excel limit of {MAX_COLUMNS}", columns.len()),
            ));
        }
        // One worksheet row holds the header.
        if rows.len() >= MAX_ROWS {
            return Err(ConverterError::processing(
                path,
                format!("{} rows exceed the Excel limit of {}", rows.len(), MAX_ROWS - 1),
            ));
        }

        let bytes = render_workbook(&columns, &rows)
            .map_err(|err| ConverterError::processing_with(path, "could not write Excel workbook", err))?;
        write_output(path, &bytes)
    }
}

fn read_sheets<R: Read + Seek>(workbook: &mut Xlsx<R>) -> std::result::Result<Vec<(String, Range<DataType>)>, XlsxError> {
    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_owned() {
        if let Some(range) = workbook.worksheet_range(&name) {
            sheets.push((name, range?));
        }
    }
    Ok(sheets)
}

fn ingest_sheet(range: &Range<DataType>, records: &mut Vec<Record>) {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row.iter().map(|cell| cell_to_string(Some(cell))).collect(),
        None => return,
    };

    for row in rows {
        if row.iter().all(|cell| matches!(cell, DataType::Empty)) {
            continue;
        }

        let fields: Fields = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(col_idx, header)| (header.clone(), cell_to_value(row.get(col_idx))))
            .collect();
        records.push(Record::Row(fields));
    }
}

fn render_workbook(columns: &[String], rows: &[Fields]) -> std::result::Result<Vec<u8>, WriteError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(RECORDS_SHEET)?;

    for (col_idx, column) in columns.iter().enumerate() {
        worksheet.write_string(0, excel_col(col_idx)?, column)?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        let excel_row = excel_row(row_idx + 1)?;
        for (col_idx, column) in columns.iter().enumerate() {
            let excel_col = excel_col(col_idx)?;
            match row.get(column) {
                Some(Value::Number(number)) => match number.as_f64() {
                    Some(number) => worksheet.write_number(excel_row, excel_col, number)?,
                    None => worksheet.write_string(excel_row, excel_col, number.to_string())?,
                },
                Some(Value::Bool(flag)) => worksheet.write_boolean(excel_row, excel_col, *flag)?,
                Some(Value::Null) | None => continue,
                Some(other) => worksheet.write_string(excel_row, excel_col, value_to_text(other))?,
            };
        }
    }

    if let Some(last) = columns.len().checked_sub(1) {
        worksheet.autofilter(0, 0, excel_row(rows.len())?, excel_col(last)?)?;
    }

    workbook.save_to_buffer()
}

fn excel_row(index: usize) -> std::result::Result<u32, WriteError> {
    u32::try_from(index).map_err(|_| WriteError::RowColumnLimitError)
}

fn excel_col(index: usize) -> std::result::Result<u16, WriteError> {
    u16::try_from(index).map_err(|_| WriteError::RowColumnLimitError)
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Keeps numbers and booleans typed. Whole floats become integers so a value
/// written as `3` reads back as `3` rather than `3.0`.
fn cell_to_value(cell: Option<&DataType>) -> Value {
    match cell {
        Some(DataType::String(value)) => Value::from(value.as_str()),
        Some(DataType::Int(value)) => Value::from(*value),
        Some(DataType::Float(value)) => {
            if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                Value::from(*value as i64)
            } else {
                Number::from_f64(*value).map_or(Value::Null, Value::Number)
            }
        }
        Some(DataType::Bool(value)) => Value::from(*value),
        Some(DataType::Empty) | None => Value::from(""),
        Some(other) => Value::from(other.to_string()),
    }
}
