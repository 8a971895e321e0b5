//! Crawler module for route discovery and rendering
//!
//! This module contains the core export logic, including:
//! - The render collaborator seam and an HTTP-backed renderer
//! - Route resolution with timeout and retry
//! - HTML parsing and link extraction
//! - Frontier management and bounded concurrency
//! - Overall build coordination

mod coordinator;
mod parser;
mod renderer;
mod resolver;
mod scheduler;

pub use coordinator::Coordinator;
pub use parser::{extract_links, is_html_document, parse_html};
pub use renderer::{
    build_http_client, HttpRenderer, Render, RenderError, RenderResponse, DYNAMIC_HEADER,
    DYNAMIC_VALUE,
};
pub use resolver::{classify, RenderOutcome, RenderResult, RetryPolicy, RouteResolver};
pub use scheduler::{Frontier, RouteRecord, ScheduledRoute, Scheduler};

use crate::config::Config;
use crate::output::BuildOutcome;
use crate::ExportError;
use std::sync::Arc;
use std::time::Duration;

/// Runs a complete export against the configured preview origin
///
/// This is the main entry point for a build. It will:
/// 1. Validate the configuration
/// 2. Build the HTTP renderer
/// 3. Prepare the output directory and copy assets
/// 4. Write the SPA fallback
/// 5. Crawl and prerender every reachable route
/// 6. Finalize the build outcome
///
/// # Returns
///
/// * `Ok(BuildOutcome)` - The build ran; check `success` for the verdict
/// * `Err(ExportError)` - The build could not run at all
pub async fn export(config: Config) -> Result<BuildOutcome, ExportError> {
    let timeout = Duration::from_millis(config.export.render_timeout_ms);
    let renderer = HttpRenderer::new(&config.renderer, timeout)?;
    export_with(config, Arc::new(renderer)).await
}

/// Runs a complete export with a caller-supplied renderer
pub async fn export_with(
    config: Config,
    renderer: Arc<dyn Render>,
) -> Result<BuildOutcome, ExportError> {
    let mut coordinator = Coordinator::new(config, renderer)?;
    coordinator.run().await
}
