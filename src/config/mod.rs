//! Configuration module for static-export
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use static_export::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("export.toml")).unwrap();
//! println!("Rendering with {} workers", config.export.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExportConfig, FailurePolicy, FallbackConfig, OutputConfig, RendererConfig,
    TrailingSlash,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_relative_file_name};
