//! static-export: prerender an application's routes into a static file tree
//!
//! This crate crawls an application's route graph through a render
//! collaborator, writes every prerenderable route to disk under strict
//! collision rules, and packages an SPA fallback document for everything a
//! static host cannot resolve on its own.

pub mod config;
pub mod crawler;
pub mod output;
pub mod route;
pub mod state;

use thiserror::Error;

/// Main error type for static-export operations
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Fallback error: {0}")]
    Fallback(#[from] output::FallbackError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid route in config: {0}")]
    InvalidRoute(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),
}

/// Route-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Route must start with '/': {0}")]
    NotAbsolute(String),

    #[error("Failed to parse route: {0}")]
    Parse(String),

    #[error("Route {route} cannot be mapped to a file: {reason}")]
    Unmappable { route: String, reason: String },
}

/// Result type alias for static-export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for route operations
pub type RouteResult<T> = std::result::Result<T, RouteError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{export, export_with, Coordinator, Render, RenderError, RenderResponse};
pub use output::{BuildOutcome, BuildManifest, OutputEntry};
pub use route::RoutePath;
pub use state::RouteState;
