//! Format identifier → handler resolution.
//!
//! Handlers are contributed by [`HandlerPlugin`]s, each an explicit list of
//! `(format, factory)` pairs. [`HandlerRegistry::discover`] runs once at
//! startup over the plugin table; the resulting registry is immutable and can
//! be shared freely between threads.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ConverterConfig;
use crate::error::{ConverterError, Result};
use crate::handler::FormatHandler;

/// Builds a fresh handler instance.
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn FormatHandler> + Send + Sync>;

/// A named unit contributing handlers for one or more formats.
pub struct HandlerPlugin {
    name: String,
    registrations: Vec<(String, HandlerFactory)>,
}

impl HandlerPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registrations: Vec::new(),
        }
    }

    /// Registers `factory` for `format`.
    pub fn handles<F, H>(mut self, format: &str, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: FormatHandler + 'static,
    {
        let factory: HandlerFactory = Arc::new(move || Box::new(factory()) as Box<dyn FormatHandler>);
        self.registrations.push((format.to_string(), factory));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format identifiers as declared, before normalisation.
    pub fn formats(&self) -> impl Iterator<Item = &str> + '_ {
        self.registrations.iter().map(|(format, _)| format.as_str())
    }
}

impl fmt::Debug for HandlerPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerPlugin")
            .field("name", &self.name)
            .field("formats", &self.formats().collect::<Vec<_>>())
            .finish()
    }
}

struct Registration {
    plugin: String,
    factory: HandlerFactory,
}

/// Immutable map from format identifier to handler factory.
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Registration>,
}

impl HandlerRegistry {
    /// Registers every plugin in order.
    ///
    /// A plugin declaring a malformed identifier is skipped as a whole so the
    /// remaining plugins stay available. Two registrations for the same
    /// identifier are an error.
    pub fn discover<I>(plugins: I) -> Result<Self>
    where
        I: IntoIterator<Item = HandlerPlugin>,
    {
        let mut handlers: BTreeMap<String, Registration> = BTreeMap::new();

        for plugin in plugins {
            let HandlerPlugin {
                name,
                registrations,
            } = plugin;

            let mut staged = Vec::with_capacity(registrations.len());
            let mut malformed = None;
            for (declared, factory) in registrations {
                match normalize_format(&declared) {
                    Some(format) => staged.push((format, factory)),
                    None => {
                        malformed = Some(declared);
                        break;
                    }
                }
            }
            if let Some(declared) = malformed {
                warn!(plugin = %name, format = %declared, "skipping plugin with malformed format identifier");
                continue;
            }

            for (format, factory) in staged {
                if let Some(existing) = handlers.get(&format) {
                    return Err(ConverterError::DuplicateFormat {
                        format,
                        first: existing.plugin.clone(),
                        second: name,
                    });
                }
                debug!(plugin = %name, %format, "registered handler");
                handlers.insert(
                    format,
                    Registration {
                        plugin: name.clone(),
                        factory,
                    },
                );
            }
        }

        info!(format_count = handlers.len(), "handler discovery complete");
        Ok(Self { handlers })
    }

    /// Discovers the built-in handlers configured by `config`.
    pub fn builtin(config: &ConverterConfig) -> Result<Self> {
        config.validate()?;
        Self::discover(crate::io::builtin_plugins(config)?)
    }

    /// Returns a fresh handler for `format`.
    pub fn resolve(&self, format: &str) -> Result<Box<dyn FormatHandler>> {
        normalize_format(format)
            .and_then(|normalized| self.handlers.get(&normalized))
            .map(|registration| (registration.factory)())
            .ok_or_else(|| ConverterError::unsupported(format))
    }

    /// Whether a handler is registered for `format`.
    pub fn supports(&self, format: &str) -> bool {
        normalize_format(format).is_some_and(|normalized| self.handlers.contains_key(&normalized))
    }

    /// Registered identifiers in sorted order.
    pub fn formats(&self) -> impl Iterator<Item = &str> + '_ {
        self.handlers.keys().map(String::as_str)
    }

    /// Name of the plugin that registered `format`.
    pub fn plugin_for(&self, format: &str) -> Option<&str> {
        normalize_format(format)
            .and_then(|normalized| self.handlers.get(&normalized))
            .map(|registration| registration.plugin.as_str())
    }

    /// Every direct conversion advertised by the registered handlers.
    pub fn declared_conversions(&self) -> BTreeSet<(String, String)> {
        self.handlers
            .values()
            .flat_map(|registration| (registration.factory)().declared_conversions())
            .collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.handlers
                    .iter()
                    .map(|(format, registration)| (format, &registration.plugin)),
            )
            .finish()
    }
}

/// Lower-cases `format` and strips a leading dot. Returns `None` unless the
/// result is a non-empty ASCII alphanumeric identifier.
pub fn normalize_format(format: &str) -> Option<String> {
    let trimmed = format.trim();
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}
