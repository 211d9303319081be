//! Handler configuration.
//!
//! [`ConverterConfig`] gathers the few knobs the built-in handlers expose.
//! Every field has a default so a configuration file only needs to name what
//! it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConverterError, Result};

/// Settings shared by the built-in handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Program used to convert MOBI and AZW3 books. Default: `ebook-convert`.
    pub ebook_convert: PathBuf,
    /// Program used to read e-book title and author. Default: `ebook-meta`.
    pub ebook_meta: PathBuf,
    /// Upper bound on the run time of an external tool, in seconds. Default: 120.
    pub tool_timeout_secs: u64,
    /// Spaces per indentation level in JSON output. Default: 4.
    pub json_indent: usize,
    /// Field delimiter for CSV input and output. Default: `,`.
    pub csv_delimiter: char,
    /// Page geometry for PDF output.
    pub pdf: PdfLayout,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ebook_convert: PathBuf::from("ebook-convert"),
            ebook_meta: PathBuf::from("ebook-meta"),
            tool_timeout_secs: 120,
            json_indent: 4,
            csv_delimiter: ',',
            pdf: PdfLayout::default(),
        }
    }
}

/// Text layout used when rendering PDF pages. Distances are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub margin: f32,
    /// Lines longer than this many characters are word-wrapped.
    pub max_line_chars: usize,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            line_height: 14.0,
            margin: 72.0,
            max_line_chars: 90,
        }
    }
}

/// US Letter, portrait.
pub const PDF_PAGE_WIDTH: f32 = 612.0;
pub const PDF_PAGE_HEIGHT: f32 = 792.0;

impl PdfLayout {
    /// Number of text lines that fit between the top and bottom margins.
    pub fn lines_per_page(&self) -> usize {
        ((PDF_PAGE_HEIGHT - 2.0 * self.margin) / self.line_height).floor() as usize
    }
}

impl ConverterConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: ConverterConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Timeout applied to external tools.
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// The CSV delimiter as the single byte the CSV reader expects.
    pub fn csv_delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.csv_delimiter)
            .ok()
            .filter(|byte| byte.is_ascii() && *byte != b'"' && *byte != b'\n' && *byte != b'\r')
            .ok_or_else(|| {
                ConverterError::InvalidConfig(format!(
                    "csv_delimiter must be a single ASCII character other than a quote or newline, got {:?}",
                    self.csv_delimiter
                ))
            })
    }

    /// Checks that every value is usable by the handlers.
    pub fn validate(&self) -> Result<()> {
        if self.ebook_convert.as_os_str().is_empty() {
            return Err(ConverterError::InvalidConfig(
                "ebook_convert must name a program".into(),
            ));
        }
        if self.ebook_meta.as_os_str().is_empty() {
            return Err(ConverterError::InvalidConfig(
                "ebook_meta must name a program".into(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(ConverterError::InvalidConfig(
                "tool_timeout_secs must be greater than zero".into(),
            ));
        }
        self.csv_delimiter_byte()?;

        let pdf = &self.pdf;
        if !(pdf.font_size > 0.0 && pdf.line_height > 0.0 && pdf.margin >= 0.0) {
            return Err(ConverterError::InvalidConfig(
                "pdf font_size and line_height must be positive and margin non-negative".into(),
            ));
        }
        if pdf.max_line_chars == 0 {
            return Err(ConverterError::InvalidConfig(
                "pdf max_line_chars must be greater than zero".into(),
            ));
        }
        if pdf.lines_per_page() == 0 {
            return Err(ConverterError::InvalidConfig(
                "pdf margin leaves no room for text".into(),
            ));
        }
        Ok(())
    }
}
