use std::path::{Path, PathBuf};

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ConverterError>;

/// Boxed error carried as the cause of a file-processing failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type covering every failure the converter can report, from handler
/// level problems up to the umbrella [`ConverterError::Conversion`] produced
/// by the orchestrator.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Raised when no handler is registered for a format identifier.
    #[error("no handler registered for this file type: '{format}'")]
    UnsupportedFormat { format: String },

    /// Raised when a handler cannot read or write a specific file.
    #[error("{message}: {}", path.display())]
    FileProcessing {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Raised when a handler receives structurally invalid input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Umbrella error for any failure during a conversion. The original
    /// failure is kept as the source.
    #[error("conversion from '{from}' to '{to}' failed: {reason}")]
    Conversion {
        from: String,
        to: String,
        reason: String,
        #[source]
        source: Option<Box<ConverterError>>,
    },

    /// Raised when two plugins claim the same format identifier.
    #[error("format '{format}' is claimed by both the '{first}' and '{second}' plugins")]
    DuplicateFormat {
        format: String,
        first: String,
        second: String,
    },

    /// Raised when a handler panics while reading or writing.
    #[error("unexpected handler failure: {0}")]
    Unexpected(String),

    /// Raised when the configuration holds values the handlers cannot use.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wrapper for IO failures outside of handlers (configuration, CLI).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing fails outside of handlers.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ConverterError {
    /// Builds an unsupported-format error for the given identifier.
    pub fn unsupported(format: impl Into<String>) -> Self {
        ConverterError::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Builds a file-processing error without an underlying cause.
    pub fn processing(path: &Path, message: impl Into<String>) -> Self {
        ConverterError::FileProcessing {
            path: path.to_path_buf(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds a file-processing error that keeps `source` as its cause and
    /// embeds it in the message.
    pub fn processing_with<E>(path: &Path, context: &str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = source.into();
        ConverterError::FileProcessing {
            path: path.to_path_buf(),
            message: format!("{context}: {source}"),
            source: Some(source),
        }
    }

    /// Builds a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        ConverterError::Validation(reason.into())
    }

    /// Builds a conversion error that has no underlying cause.
    pub fn conversion(from: &str, to: &str, reason: impl Into<String>) -> Self {
        ConverterError::Conversion {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Wraps `source` into a conversion error naming both endpoint formats.
    pub fn wrap(from: &str, to: &str, source: ConverterError) -> Self {
        ConverterError::Conversion {
            from: from.to_string(),
            to: to.to_string(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the wrapped cause of a conversion error.
    pub fn cause(&self) -> Option<&ConverterError> {
        match self {
            ConverterError::Conversion { source, .. } => source.as_deref(),
            _ => None,
        }
    }
}
