//! Render collaborator interface
//!
//! This module defines the single asynchronous seam through which routes are
//! rendered, including:
//! - The `Render` trait consumed by the route resolver
//! - The response and error types a renderer reports
//! - `HttpRenderer`, which renders routes by requesting them from a running
//!   preview server

use crate::config::RendererConfig;
use crate::route::{route_url, RoutePath};
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Response header a preview server sets to mark a route as server-only
pub const DYNAMIC_HEADER: &str = "x-static-export";

/// Value of [`DYNAMIC_HEADER`] that marks a route as non-prerenderable
pub const DYNAMIC_VALUE: &str = "dynamic";

/// What the render collaborator produced for one route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderResponse {
    /// HTTP-like status code
    pub status: u16,

    /// Rendered document, if any
    pub body: Option<Vec<u8>>,

    /// Redirect target (absolute or relative to the route)
    pub redirect_target: Option<String>,

    /// The route needs live server logic and cannot be precomputed
    pub requires_server: bool,

    /// Content-Type of the body, if known
    pub content_type: Option<String>,
}

impl RenderResponse {
    /// A 200 response carrying an HTML document
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: Some(body.into()),
            content_type: Some("text/html; charset=utf-8".to_string()),
            ..Self::default()
        }
    }

    /// A redirect response
    pub fn redirect(status: u16, target: impl Into<String>) -> Self {
        Self {
            status,
            redirect_target: Some(target.into()),
            ..Self::default()
        }
    }

    /// A response for a route that must be served by a live server
    pub fn dynamic() -> Self {
        Self {
            status: 200,
            requires_server: true,
            ..Self::default()
        }
    }

    /// A bare status with no body
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Errors a renderer can report
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// I/O failure while rendering; worth retrying
    #[error("I/O error while rendering: {0}")]
    Io(String),

    /// The application itself failed; retrying will not help
    #[error("render failed: {0}")]
    Application(String),
}

impl RenderError {
    /// Returns true if the failure is transient and may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// The render collaborator
///
/// Implementations must be callable concurrently for distinct routes. The
/// crawler never renders the same route twice at once.
#[async_trait]
pub trait Render: Send + Sync {
    /// Renders one route
    async fn render(&self, route: &RoutePath) -> Result<RenderResponse, RenderError>;
}

/// Renders routes by requesting them from a running preview server
pub struct HttpRenderer {
    client: Client,
    origin: Url,
}

impl HttpRenderer {
    /// Creates a renderer for the configured origin
    ///
    /// # Arguments
    ///
    /// * `config` - The renderer configuration
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(HttpRenderer)` - Ready to render
    /// * `Err(ExportError)` - Invalid origin or HTTP client setup failure
    pub fn new(config: &RendererConfig, timeout: Duration) -> Result<Self, crate::ExportError> {
        let origin = Url::parse(&config.origin)?;
        let client = build_http_client(config, timeout)?;
        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

/// Builds an HTTP client for talking to the preview server
///
/// Redirects are not followed: a redirect is an outcome the crawler records
/// and follows itself as a discovered link.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use static_export::config::RendererConfig;
/// use static_export::crawler::build_http_client;
///
/// let client = build_http_client(&RendererConfig::default(), Duration::from_secs(30));
/// assert!(client.is_ok());
/// ```
pub fn build_http_client(config: &RendererConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl Render for HttpRenderer {
    async fn render(&self, route: &RoutePath) -> Result<RenderResponse, RenderError> {
        let url = route_url(&self.origin, route).map_err(|e| RenderError::Application(e.to_string()))?;

        let response = self.client.get(url).send().await.map_err(classify_transport_error)?;

        let status = response.status();
        let headers = response.headers();

        let requires_server = headers
            .get(DYNAMIC_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().eq_ignore_ascii_case(DYNAMIC_VALUE))
            .unwrap_or(false);

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if status.is_redirection() {
            let redirect_target = headers
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            return Ok(RenderResponse {
                status: status.as_u16(),
                body: None,
                redirect_target,
                requires_server,
                content_type,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RenderError::Io(e.to_string()))?;

        Ok(RenderResponse {
            status: status.as_u16(),
            body: Some(body.to_vec()),
            redirect_target: None,
            requires_server,
            content_type,
        })
    }
}

/// Maps a reqwest transport failure onto the render error taxonomy
fn classify_transport_error(e: reqwest::Error) -> RenderError {
    if e.is_timeout() {
        RenderError::Io("request timeout".to_string())
    } else if e.is_connect() {
        RenderError::Io(format!("connection failed: {}", e))
    } else if e.is_builder() {
        RenderError::Application(e.to_string())
    } else {
        RenderError::Io(e.to_string())
    }
}
