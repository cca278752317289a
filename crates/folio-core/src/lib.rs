//! Folio Core Library
//!
//! Core types, configuration, and error handling for the Folio page reader.
//!
//! # Modules
//!
//! - [`config`] - `folio.toml` loading and validation
//! - [`locator`] - Page number to resource path mapping
//! - [`metadata`] - The static page metadata table
//! - [`error`] - Core error type

pub mod config;
pub mod error;
pub mod locator;
pub mod metadata;

pub use config::{BookConfig, Config, ReaderConfig, SearchConfig};
pub use error::{CoreError, Result};
pub use locator::{PageLocation, PageLocator, parse_page};
pub use metadata::{PageMetadata, PageTable};
