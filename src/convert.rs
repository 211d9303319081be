//! Conversion orchestration.
//!
//! [`Converter::convert`] derives both formats from the path extensions,
//! resolves a reader and a writer, and pipes the intermediate records from
//! one to the other. Every failure past the format check is reported as a
//! [`ConverterError::Conversion`] naming both formats, with the original
//! error attached as its source.

use std::any::Any;
use std::ffi::OsStr;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::ConverterConfig;
use crate::error::{ConverterError, Result};
use crate::registry::HandlerRegistry;

/// Stateless conversion entry point sharing one immutable registry.
#[derive(Debug, Clone)]
pub struct Converter {
    registry: Arc<HandlerRegistry>,
}

impl Converter {
    pub fn new(registry: impl Into<Arc<HandlerRegistry>>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    /// Builds a converter over the built-in handlers.
    pub fn with_config(config: &ConverterConfig) -> Result<Self> {
        Ok(Self::new(HandlerRegistry::builtin(config)?))
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Converts `input` into `output`, choosing handlers from the file
    /// extensions.
    #[instrument(
        level = "info",
        skip_all,
        fields(input = %input.display(), output = %output.display())
    )]
    pub fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let from = format_of(input);
        let to = format_of(output);

        if from.is_empty() || to.is_empty() {
            return Err(ConverterError::conversion(
                &from,
                &to,
                "could not determine file formats from paths",
            ));
        }

        self.pipe(input, output, &from, &to)
            .map_err(|source| ConverterError::wrap(&from, &to, source))?;

        info!(%from, %to, "conversion completed");
        Ok(())
    }

    fn pipe(&self, input: &Path, output: &Path, from: &str, to: &str) -> Result<()> {
        let reader = self.registry.resolve(from)?;
        let writer = self.registry.resolve(to)?;
        debug!(%from, %to, "handlers resolved");

        let records = guarded(|| reader.read(input))?;
        info!(record_count = records.len(), "read intermediate records");

        guarded(|| writer.write(output, &records))
    }
}

/// Lower-cased extension of `path` without the dot, or an empty string when
/// the path has none.
pub fn format_of(path: &Path) -> String {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Runs a handler call, turning a panic into [`ConverterError::Unexpected`].
fn guarded<T>(call: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(ConverterError::Unexpected(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::handler::FormatHandler;
    use crate::model::Record;
    use crate::registry::HandlerPlugin;

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    struct Recording {
        calls: Arc<Calls>,
        panic_on_read: bool,
    }

    impl FormatHandler for Recording {
        fn read(&self, path: &Path) -> Result<Vec<Record>> {
            self.calls.0.lock().unwrap().push(format!("read {}", path.display()));
            if self.panic_on_read {
                panic!("reader exploded");
            }
            Ok(vec![Record::text("payload")])
        }

        fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
            self.calls
                .0
                .lock()
                .unwrap()
                .push(format!("write {} {}", path.display(), records.len()));
            Ok(())
        }
    }

    fn converter(calls: &Arc<Calls>, panic_on_read: bool) -> Converter {
        let reader_calls = Arc::clone(calls);
        let writer_calls = Arc::clone(calls);
        let registry = HandlerRegistry::discover([
            HandlerPlugin::new("src").handles("src", move || Recording {
                calls: Arc::clone(&reader_calls),
                panic_on_read,
            }),
            HandlerPlugin::new("dst").handles("dst", move || Recording {
                calls: Arc::clone(&writer_calls),
                panic_on_read: false,
            }),
        ])
        .expect("discovery succeeds");
        Converter::new(registry)
    }

    #[test]
    fn pipes_reader_into_writer() {
        let calls = Arc::new(Calls::default());
        converter(&calls, false)
            .convert(Path::new("in.SRC"), Path::new("out.dst"))
            .expect("conversion succeeds");

        assert_eq!(
            *calls.0.lock().unwrap(),
            vec!["read in.SRC".to_string(), "write out.dst 1".to_string()]
        );
    }

    #[test]
    fn missing_extension_fails_before_any_handler_runs() {
        let calls = Arc::new(Calls::default());
        let err = converter(&calls, false)
            .convert(Path::new("in.src"), Path::new("out"))
            .expect_err("no destination format");

        match &err {
            ConverterError::Conversion { from, to, source, .. } => {
                assert_eq!(from, "src");
                assert_eq!(to, "");
                assert!(source.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(calls.0.lock().unwrap().is_empty());
    }

    #[test]
    fn unsupported_writer_is_wrapped_before_reading() {
        let calls = Arc::new(Calls::default());
        let err = converter(&calls, false)
            .convert(Path::new("in.src"), Path::new("out.xml"))
            .expect_err("xml unsupported");

        assert!(matches!(
            err.cause(),
            Some(ConverterError::UnsupportedFormat { format }) if format == "xml"
        ));
        assert!(err.to_string().contains("'src'"));
        assert!(err.to_string().contains("'xml'"));
        assert!(calls.0.lock().unwrap().is_empty());
    }

    #[test]
    fn handler_panic_becomes_conversion_error() {
        let calls = Arc::new(Calls::default());
        let err = converter(&calls, true)
            .convert(Path::new("in.src"), Path::new("out.dst"))
            .expect_err("reader panics");

        match err.cause() {
            Some(ConverterError::Unexpected(message)) => assert_eq!(message, "reader exploded"),
            other => panic!("unexpected cause: {other:?}"),
        }
    }

    #[test]
    fn format_of_lowercases_extension() {
        assert_eq!(format_of(Path::new("data/Report.PDF")), "pdf");
        assert_eq!(format_of(Path::new("archive.tar.gz")), "gz");
        assert_eq!(format_of(Path::new("README")), "");
        assert_eq!(format_of(Path::new(".json")), "");
    }
}
