//! Build manifest: the single record of what a build produced
//!
//! The manifest is append-only while the build runs. It tracks every output
//! file (from claim to completed write), every warning and every fatal error,
//! and is the only place that decides whether the build succeeded.

use crate::output::{CollisionError, OutputEntry, OutputOwner};
use crate::route::RoutePath;
use crate::state::RouteState;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Non-fatal problems recorded during a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// A route failed to render and was left out
    RenderFailed {
        route: RoutePath,
        reason: String,
        attempts: u32,
    },

    /// A route rendered only after transient failures
    RetriedRender { route: RoutePath, attempts: u32 },

    /// A route needs a live server and is served by the fallback
    DynamicRoute { route: RoutePath },

    /// A rendered document could not be scanned for links
    MalformedContent { route: RoutePath, reason: String },
}

impl BuildWarning {
    /// The route the warning is about
    pub fn route(&self) -> &RoutePath {
        match self {
            BuildWarning::RenderFailed { route, .. }
            | BuildWarning::RetriedRender { route, .. }
            | BuildWarning::DynamicRoute { route }
            | BuildWarning::MalformedContent { route, .. } => route,
        }
    }
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::RenderFailed {
                route,
                reason,
                attempts,
            } => write!(
                f,
                "{} failed to render after {} attempt(s): {}",
                route, attempts, reason
            ),
            BuildWarning::RetriedRender { route, attempts } => {
                write!(f, "{} rendered after {} attempts", route, attempts)
            }
            BuildWarning::DynamicRoute { route } => {
                write!(f, "{} requires a server and is left to the fallback", route)
            }
            BuildWarning::MalformedContent { route, reason } => {
                write!(f, "{} could not be scanned for links: {}", route, reason)
            }
        }
    }
}

/// Fatal problems; any of these fails the build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Collision(#[from] CollisionError),

    #[error("{route} requires a server and {}", dynamic_reason(.fallback_available))]
    NonPrerenderable {
        route: RoutePath,
        fallback_available: bool,
    },

    #[error("{route} failed to render: {reason}")]
    RenderFailed { route: RoutePath, reason: String },

    #[error("Fallback could not be produced: {0}")]
    Fallback(String),

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Failed to copy assets: {0}")]
    Assets(String),
}

fn dynamic_reason(fallback_available: &bool) -> &'static str {
    if *fallback_available {
        "on-dynamic is set to fail"
    } else {
        "no fallback is configured"
    }
}

/// One file in the output tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Path relative to the output directory
    pub path: String,
    pub owner: OutputOwner,
    /// Size in bytes
    pub bytes: usize,
    /// Hex SHA-256 of the content
    pub digest: String,
}

/// Final state of one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    pub route: RoutePath,
    /// The route whose render first referenced this one
    pub parent: Option<RoutePath>,
    pub state: RouteState,
}

/// A route that redirected elsewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRecord {
    pub from: RoutePath,
    /// Target as reported by the renderer
    pub target: String,
    /// Target as a route, when it is on the same origin
    pub resolved: Option<RoutePath>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteStatus {
    Pending,
    Written,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackStatus {
    Disabled,
    Expected,
    Written,
    Failed,
}

/// Result of a build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub success: bool,
    /// Files written, in claim order
    pub written_files: Vec<WrittenFile>,
    pub warnings: Vec<BuildWarning>,
    pub errors: Vec<BuildError>,
    /// Every discovered route, in discovery order
    pub routes: Vec<RouteReport>,
    pub redirects: Vec<RedirectRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildOutcome {
    /// Counts routes by state
    pub fn count_by_state(&self) -> BTreeMap<RouteState, usize> {
        let mut counts = BTreeMap::new();
        for report in &self.routes {
            *counts.entry(report.state).or_insert(0) += 1;
        }
        counts
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Returns the written file at `path`, if any
    pub fn file(&self, path: &str) -> Option<&WrittenFile> {
        self.written_files.iter().find(|f| f.path == path)
    }
}

/// Assembles an outcome from its parts
///
/// A build succeeds exactly when no fatal error was recorded.
pub fn finalize(
    outputs: Vec<WrittenFile>,
    warnings: Vec<BuildWarning>,
    errors: Vec<BuildError>,
) -> BuildOutcome {
    let now = Utc::now();
    BuildOutcome {
        success: errors.is_empty(),
        written_files: outputs,
        warnings,
        errors,
        routes: Vec::new(),
        redirects: Vec::new(),
        started_at: now,
        finished_at: now,
    }
}

/// Accumulates build results until finalization
#[derive(Debug)]
pub struct BuildManifest {
    files: Vec<(WrittenFile, WriteStatus)>,
    warnings: Vec<BuildWarning>,
    errors: Vec<BuildError>,
    redirects: Vec<RedirectRecord>,
    fallback: FallbackStatus,
    started_at: DateTime<Utc>,
}

impl Default for BuildManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildManifest {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            redirects: Vec::new(),
            fallback: FallbackStatus::Disabled,
            started_at: Utc::now(),
        }
    }

    /// Records a claimed output whose write is about to start
    ///
    /// # Returns
    ///
    /// The sequence number to report the write result with
    pub fn record_output(&mut self, entry: &OutputEntry) -> usize {
        let seq = self.files.len();
        self.files.push((
            WrittenFile {
                path: entry.path.clone(),
                owner: entry.owner.clone(),
                bytes: entry.bytes.len(),
                digest: entry.digest.clone(),
            },
            WriteStatus::Pending,
        ));
        seq
    }

    /// Marks a recorded output as written
    pub fn mark_written(&mut self, seq: usize) {
        if let Some((file, status)) = self.files.get_mut(seq) {
            *status = WriteStatus::Written;
            if file.owner == OutputOwner::Fallback {
                self.fallback = FallbackStatus::Written;
            }
        }
    }

    /// Marks a recorded output as failed and records the fatal error
    pub fn mark_write_failed(&mut self, seq: usize, reason: String) {
        let Some((file, status)) = self.files.get_mut(seq) else {
            return;
        };
        *status = WriteStatus::Failed;
        if file.owner == OutputOwner::Fallback {
            self.fallback = FallbackStatus::Failed;
        }
        let path = file.path.clone();
        self.errors.push(BuildError::Write { path, reason });
    }

    /// Declares that this build must produce a fallback document
    pub fn expect_fallback(&mut self) {
        self.fallback = FallbackStatus::Expected;
    }

    /// Records why the fallback could not be produced
    pub fn fallback_failed(&mut self, error: BuildError) {
        self.fallback = FallbackStatus::Failed;
        self.error(error);
    }

    pub fn warn(&mut self, warning: BuildWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn error(&mut self, error: BuildError) {
        tracing::error!("{}", error);
        self.errors.push(error);
    }

    pub fn record_redirect(&mut self, redirect: RedirectRecord) {
        self.redirects.push(redirect);
    }

    /// Returns true once any fatal error has been recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true once an output collision has been recorded
    pub fn has_collision(&self) -> bool {
        self.errors
            .iter()
            .any(|error| matches!(error, BuildError::Collision(_)))
    }

    /// Returns true if a fallback is configured and has not failed so far
    pub fn fallback_available(&self) -> bool {
        matches!(
            self.fallback,
            FallbackStatus::Expected | FallbackStatus::Written
        )
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    /// Closes the manifest and decides success
    ///
    /// Must be called after every write has been reported. A fallback that
    /// was expected but never written is a fatal error.
    pub fn finalize(mut self, routes: Vec<RouteReport>) -> BuildOutcome {
        if self.fallback == FallbackStatus::Expected {
            self.errors.push(BuildError::Fallback(
                "fallback document was never written".to_string(),
            ));
        }

        let written = self
            .files
            .into_iter()
            .filter(|(_, status)| *status == WriteStatus::Written)
            .map(|(file, _)| file)
            .collect();

        let mut outcome = finalize(written, self.warnings, self.errors);
        outcome.routes = routes;
        outcome.redirects = self.redirects;
        outcome.started_at = self.started_at;
        outcome
    }
}
