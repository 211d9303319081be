//! Built-in format handlers.
//!
//! Each submodule implements [`FormatHandler`](crate::handler::FormatHandler)
//! for one family of formats. [`builtin_plugins`] is the table the registry
//! discovers; adding a format means adding a module and one entry there.

pub mod delimited;
pub mod docx;
pub mod ebook;
pub mod external;
pub mod json;
mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod text;
pub mod xlsx;

use std::collections::HashSet;

use crate::config::ConverterConfig;
use crate::error::Result;
use crate::model::Fields;
use crate::registry::HandlerPlugin;

use self::delimited::CsvHandler;
use self::docx::DocxHandler;
use self::ebook::{EbookFormat, EbookHandler};
use self::external::ExternalTool;
use self::json::JsonHandler;
use self::pdf::PdfHandler;
use self::pptx::PptxHandler;
use self::text::TxtHandler;
use self::xlsx::XlsxHandler;

const CALIBRE_HINT: &str = "MOBI and AZW3 need Calibre's command-line tools; \
    install Calibre or set ebook_convert and ebook_meta";

#[derive(Clone)]
struct Calibre {
    convert: ExternalTool,
    meta: ExternalTool,
}

/// The plugins shipped with the crate, configured from `config`.
pub fn builtin_plugins(config: &ConverterConfig) -> Result<Vec<HandlerPlugin>> {
    let delimiter = config.csv_delimiter_byte()?;
    let indent = config.json_indent;
    let layout = config.pdf.clone();
    let calibre = Calibre {
        convert: ExternalTool::new(config.ebook_convert.clone(), config.tool_timeout())
            .with_install_hint(CALIBRE_HINT),
        meta: ExternalTool::new(config.ebook_meta.clone(), config.tool_timeout()).with_install_hint(CALIBRE_HINT),
    };
    let calibre_azw3 = calibre.clone();

    Ok(vec![
        HandlerPlugin::new("csv").handles("csv", move || CsvHandler::new(delimiter)),
        HandlerPlugin::new("json").handles("json", move || JsonHandler::new(indent)),
        HandlerPlugin::new("text").handles("txt", || TxtHandler),
        HandlerPlugin::new("excel").handles("xlsx", || XlsxHandler),
        HandlerPlugin::new("word").handles("docx", || DocxHandler),
        HandlerPlugin::new("powerpoint")
            .handles("pptx", PptxHandler::presentation)
            .handles("ppsx", PptxHandler::slideshow),
        HandlerPlugin::new("pdf").handles("pdf", move || PdfHandler::new(layout.clone())),
        HandlerPlugin::new("calibre")
            .handles("mobi", move || {
                EbookHandler::new(EbookFormat::Mobi, calibre.convert.clone(), calibre.meta.clone())
            })
            .handles("azw3", move || {
                EbookHandler::new(EbookFormat::Azw3, calibre_azw3.convert.clone(), calibre_azw3.meta.clone())
            }),
    ])
}

/// Union of the keys of `rows`, in first-seen order.
pub(crate) fn column_names(rows: &[Fields]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    #[test]
    fn column_names_keep_first_seen_order() {
        let rows = vec![
            Record::row([("id", "1"), ("name", "a")]).to_fields(),
            Record::row([("name", "b"), ("email", "b@example.com")]).to_fields(),
        ];
        assert_eq!(column_names(&rows), vec!["id", "name", "email"]);
    }

    #[test]
    fn builtin_table_covers_every_format() {
        let plugins = builtin_plugins(&ConverterConfig::default()).expect("plugins built");
        let mut formats: Vec<&str> = plugins.iter().flat_map(HandlerPlugin::formats).collect();
        formats.sort_unstable();
        assert_eq!(
            formats,
            vec!["azw3", "csv", "docx", "json", "mobi", "pdf", "ppsx", "pptx", "txt", "xlsx"]
        );
    }
}
