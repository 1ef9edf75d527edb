//! Parsing and validation of `loom.toml` configuration files.
//!
//! This crate reads the substrate configuration and produces a strongly-typed
//! [`LoomConfig`] consumed by the object store and the unit library.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
