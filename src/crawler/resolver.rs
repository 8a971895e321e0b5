//! Route resolver
//!
//! Invokes the render collaborator for one route and classifies the outcome.
//!
//! # Classification
//!
//! | Response | Outcome |
//! |----------|---------|
//! | `requires_server` set | Dynamic |
//! | 2xx with body | Static |
//! | 2xx without body | Failed |
//! | 3xx with target | Redirect |
//! | 3xx without target | Failed |
//! | Any other status | Failed |
//! | `RenderError::Io` / timeout | Retried, then Failed |
//! | `RenderError::Application` | Failed immediately |

use crate::config::ExportConfig;
use crate::crawler::renderer::{Render, RenderError, RenderResponse};
use crate::route::RoutePath;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Classified result of rendering one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The route rendered to a standalone document
    Static {
        content: Vec<u8>,
        content_type: Option<String>,
    },

    /// The route needs a live server and is excluded from output
    Dynamic,

    /// The route redirects elsewhere; no document is produced
    Redirect { target: String },

    /// Rendering failed
    Failed { reason: String, transient: bool },
}

impl RenderOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of resolving one route, including how many attempts it took
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub route: RoutePath,
    pub outcome: RenderOutcome,
    pub attempts: u32,
}

/// Timeout and retry settings for render calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Pause between attempts
    pub delay: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
            timeout: Duration::from_millis(config.render_timeout_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

/// Renders routes through the collaborator with timeout and bounded retry
///
/// Holds no per-route state, so a single resolver is shared by every worker.
#[derive(Clone)]
pub struct RouteResolver {
    renderer: Arc<dyn Render>,
    policy: RetryPolicy,
}

impl RouteResolver {
    pub fn new(renderer: Arc<dyn Render>, policy: RetryPolicy) -> Self {
        Self { renderer, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolves a route to a classified outcome
    ///
    /// Transient failures (I/O errors and timeouts) are retried up to
    /// `max_retries` times. Everything else is final on the first attempt.
    pub async fn resolve(&self, route: &RoutePath) -> RenderResult {
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let outcome = self.attempt(route).await;

            let retry = matches!(outcome, RenderOutcome::Failed { transient: true, .. })
                && attempts < max_attempts;

            if !retry {
                return RenderResult {
                    route: route.clone(),
                    outcome,
                    attempts,
                };
            }

            debug!(
                "Transient render failure for {} (attempt {}/{}), retrying",
                route, attempts, max_attempts
            );

            if !self.policy.delay.is_zero() {
                tokio::time::sleep(self.policy.delay).await;
            }
        }
    }

    async fn attempt(&self, route: &RoutePath) -> RenderOutcome {
        match tokio::time::timeout(self.policy.timeout, self.renderer.render(route)).await {
            Ok(Ok(response)) => classify(response),
            Ok(Err(e)) => e.into(),
            Err(_) => RenderOutcome::Failed {
                reason: format!("render timed out after {}ms", self.policy.timeout.as_millis()),
                transient: true,
            },
        }
    }
}

/// Classifies a collaborator response
pub fn classify(response: RenderResponse) -> RenderOutcome {
    if response.requires_server {
        return RenderOutcome::Dynamic;
    }

    match response.status {
        200..=299 => match response.body {
            Some(content) => RenderOutcome::Static {
                content,
                content_type: response.content_type,
            },
            None => RenderOutcome::Failed {
                reason: format!("status {} without a body", response.status),
                transient: false,
            },
        },
        300..=399 => match response.redirect_target {
            Some(target) if !target.trim().is_empty() => RenderOutcome::Redirect { target },
            _ => RenderOutcome::Failed {
                reason: format!("redirect status {} without a target", response.status),
                transient: false,
            },
        },
        status => RenderOutcome::Failed {
            reason: format!("status {}", status),
            transient: false,
        },
    }
}

impl From<RenderError> for RenderOutcome {
    fn from(e: RenderError) -> Self {
        RenderOutcome::Failed {
            transient: e.is_transient(),
            reason: e.to_string(),
        }
    }
}
