use crate::config::types::{Config, ExportConfig, FallbackConfig, OutputConfig, RendererConfig};
use crate::route::RoutePath;
use crate::ConfigError;
use url::Url;

/// Upper bound for the render worker pool
const MAX_CONCURRENCY: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_export_config(&config.export)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;
    validate_fallback_config(&config.fallback)?;
    Ok(())
}

/// Validates crawl and export behavior
fn validate_export_config(config: &ExportConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.render_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "render-timeout-ms must be greater than 0".to_string(),
        ));
    }

    for entry in &config.entries {
        RoutePath::parse(entry)
            .map_err(|e| ConfigError::InvalidRoute(format!("entry '{}': {}", entry, e)))?;
    }

    if !config.fallback.is_empty() {
        validate_relative_file_name(&config.fallback)?;
    }

    if config.document_extensions.is_empty() {
        return Err(ConfigError::Validation(
            "document-extensions cannot be empty".to_string(),
        ));
    }

    for ext in &config.document_extensions {
        if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
            return Err(ConfigError::Validation(format!(
                "document extension '{}' must be a bare extension such as 'html'",
                ext
            )));
        }
    }

    for pattern in &config.exclude {
        validate_exclude_pattern(pattern)?;
    }

    Ok(())
}

/// Validates render collaborator configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    let origin = Url::parse(&config.origin)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid origin '{}': {}", config.origin, e)))?;

    if origin.scheme() != "http" && origin.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "origin '{}' must use http or https",
            config.origin
        )));
    }

    if origin.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "origin '{}' has no host",
            config.origin
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let directory = config.directory.trim();
    if directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.clean && (directory == "/" || directory == "." || directory == "./") {
        return Err(ConfigError::Validation(format!(
            "refusing to clean output directory '{}'",
            directory
        )));
    }

    if let Some(report_path) = &config.report_path {
        if report_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "report-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates SPA shell configuration
fn validate_fallback_config(config: &FallbackConfig) -> Result<(), ConfigError> {
    if config.client_entry.trim().is_empty() {
        return Err(ConfigError::Validation(
            "client-entry cannot be empty".to_string(),
        ));
    }

    if !config.base_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "base-path must start with '/', got '{}'",
            config.base_path
        )));
    }

    Ok(())
}

/// Validates a fallback file name: relative, no parent traversal
pub fn validate_relative_file_name(name: &str) -> Result<(), ConfigError> {
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(ConfigError::Validation(format!(
            "fallback '{}' must be a relative path",
            name
        )));
    }

    if name.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "fallback '{}' must name a file, not a directory",
            name
        )));
    }

    if name.contains('\\') || name.contains('\0') {
        return Err(ConfigError::Validation(format!(
            "fallback '{}' contains invalid characters",
            name
        )));
    }

    if name.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(ConfigError::Validation(format!(
            "fallback '{}' cannot contain empty or '..' segments",
            name
        )));
    }

    Ok(())
}

/// Validates an exclude pattern ("/exact" or "/prefix/*")
fn validate_exclude_pattern(pattern: &str) -> Result<(), ConfigError> {
    if !pattern.starts_with('/') {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}' must start with '/'",
            pattern
        )));
    }

    // Only a single trailing wildcard segment is supported
    let without_suffix = pattern.strip_suffix("/*").unwrap_or(pattern);
    if without_suffix.contains('*') {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}' may only use '*' as its final segment",
            pattern
        )));
    }

    Ok(())
}
