//! Core library for the omniconv file-format converter.
//!
//! A conversion reads the source file into a sequence of [`Record`]s with the
//! handler registered for its extension and writes that sequence back out
//! with the handler registered for the destination extension. Handlers live
//! under [`io`], the contract they implement in [`handler`], format lookup in
//! [`registry`], and the orchestration in [`convert`].

pub mod config;
pub mod convert;
pub mod error;
pub mod handler;
pub mod io;
pub mod model;
pub mod registry;

pub use config::ConverterConfig;
pub use convert::{Converter, format_of};
pub use error::{ConverterError, Result};
pub use handler::FormatHandler;
pub use model::Record;
pub use registry::{HandlerPlugin, HandlerRegistry};
