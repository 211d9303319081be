//! The contract every format handler implements, plus the helpers handlers
//! share for touching the filesystem.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ConverterError, Result};
use crate::model::Record;

/// Reads and writes one file format through the intermediate [`Record`]
/// sequence.
///
/// Handlers are created fresh for every resolution and must not keep state
/// between calls.
pub trait FormatHandler: Send + Sync {
    /// Parses the file at `path` into records. An empty file yields an empty
    /// sequence; a missing, unreadable or malformed file is a
    /// [`ConverterError::FileProcessing`].
    fn read(&self, path: &Path) -> Result<Vec<Record>>;

    /// Serialises `records` to `path`, replacing any existing file. An empty
    /// sequence is a [`ConverterError::Validation`] and leaves the filesystem
    /// untouched.
    fn write(&self, path: &Path, records: &[Record]) -> Result<()>;

    /// Direct `(from, to)` conversions the handler's backing tool can perform
    /// without the intermediate model.
    fn declared_conversions(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Rejects an empty record sequence before a writer touches the filesystem.
pub fn require_records(records: &[Record], format: &str) -> Result<()> {
    if records.is_empty() {
        return Err(ConverterError::validation(format!(
            "input data for {format} writing cannot be empty"
        )));
    }
    Ok(())
}

/// Reads the whole source file, reporting a missing file separately from
/// other I/O failures.
pub fn read_source(path: &Path, label: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| source_error(path, label, err))
}

/// Opens the source file for streaming readers.
pub fn open_source(path: &Path, label: &str) -> Result<fs::File> {
    fs::File::open(path).map_err(|err| source_error(path, label, err))
}

/// Whether the source file exists but holds no bytes. Binary readers use it
/// to return an empty sequence instead of failing to parse nothing.
pub fn source_is_empty(path: &Path, label: &str) -> Result<bool> {
    fs::metadata(path)
        .map(|metadata| metadata.len() == 0)
        .map_err(|err| source_error(path, label, err))
}

fn source_error(path: &Path, label: &str, err: std::io::Error) -> ConverterError {
    if err.kind() == ErrorKind::NotFound {
        ConverterError::processing(path, format!("{label} file not found"))
    } else {
        ConverterError::processing_with(path, &format!("could not read {label} file"), err)
    }
}

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so a failure never leaves a truncated destination behind.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(directory)
        .map_err(|err| ConverterError::processing_with(path, "could not create output file", err))?;
    staged
        .write_all(bytes)
        .and_then(|()| staged.flush())
        .map_err(|err| ConverterError::processing_with(path, "could not write output file", err))?;
    staged
        .persist(path)
        .map_err(|err| ConverterError::processing_with(path, "could not write output file", err.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "output written");
    Ok(())
}
