//! SPA fallback document
//!
//! The fallback is a shell page that boots the client-side router. Static
//! hosts serve it for any path that has no prerendered file.

use crate::config::{validate_relative_file_name, FallbackConfig};
use crate::output::{OutputEntry, OutputOwner};
use std::path::Path;
use thiserror::Error;

/// Placeholder replaced with the client entry script URL
pub const ENTRY_PLACEHOLDER: &str = "{{entry}}";

/// Placeholder replaced with the application base path
pub const BASE_PLACEHOLDER: &str = "{{base}}";

/// Built-in shell used when no template file is configured
pub const DEFAULT_SHELL: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<base href="{{base}}">
</head>
<body>
<div id="app"></div>
<script type="module" src="{{entry}}"></script>
</body>
</html>
"#;

/// Errors producing the fallback document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackError {
    #[error("Failed to read shell template {path}: {reason}")]
    TemplateUnreadable { path: String, reason: String },

    #[error("Shell template is empty")]
    EmptyTemplate,

    #[error("Shell template has no <script> element to bootstrap the client router")]
    MissingBootstrap,

    #[error("Invalid fallback file name: {0}")]
    InvalidFilename(String),
}

/// Loads the shell template, or the built-in shell when `path` is None
pub async fn load_shell_template(path: Option<&Path>) -> Result<String, FallbackError> {
    let Some(path) = path else {
        return Ok(DEFAULT_SHELL.to_string());
    };

    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FallbackError::TemplateUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Builds the fallback output entry
///
/// # Arguments
///
/// * `shell` - Shell template text
/// * `fallback_filename` - Relative destination name (e.g. `200.html`)
/// * `config` - Client entry and base path substituted into the shell
///
/// # Example
///
/// ```
/// use static_export::config::FallbackConfig;
/// use static_export::output::{build_fallback, DEFAULT_SHELL};
///
/// let entry = build_fallback(DEFAULT_SHELL, "200.html", &FallbackConfig::default()).unwrap();
/// assert_eq!(entry.path, "200.html");
/// assert!(String::from_utf8(entry.bytes).unwrap().contains("/app.js"));
/// ```
pub fn build_fallback(
    shell: &str,
    fallback_filename: &str,
    config: &FallbackConfig,
) -> Result<OutputEntry, FallbackError> {
    validate_relative_file_name(fallback_filename)
        .map_err(|e| FallbackError::InvalidFilename(e.to_string()))?;

    if shell.trim().is_empty() {
        return Err(FallbackError::EmptyTemplate);
    }

    if !shell.to_ascii_lowercase().contains("<script") {
        return Err(FallbackError::MissingBootstrap);
    }

    let document = shell
        .replace(ENTRY_PLACEHOLDER, &escape_attribute(&config.client_entry))
        .replace(BASE_PLACEHOLDER, &escape_attribute(&config.base_path));

    Ok(OutputEntry::new(
        OutputOwner::Fallback,
        fallback_filename,
        document.into_bytes(),
    ))
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
