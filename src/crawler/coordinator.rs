//! Build coordinator - main export orchestration logic
//!
//! This module contains the crawl loop that coordinates a whole build:
//! - Preparing the output directory and copying assets
//! - Producing the SPA fallback
//! - Dispatching routes to the resolver with bounded concurrency
//! - Merging results in discovery order (links, outputs, warnings)
//! - Draining file writes and finalizing the manifest

use crate::config::{validate, Config, FailurePolicy};
use crate::crawler::parser::{extract_links, is_html_document};
use crate::crawler::renderer::Render;
use crate::crawler::resolver::{RenderOutcome, RenderResult, RetryPolicy, RouteResolver};
use crate::crawler::scheduler::{ScheduledRoute, Scheduler};
use crate::output::{
    build_fallback, collect_assets, load_shell_template, prepare_output_dir,
    write_markdown_report, write_entry, BuildError, BuildManifest, BuildOutcome, BuildWarning,
    OutputEntry, OutputError, OutputMapper, OutputRegistry, RedirectRecord, RouteReport,
};
use crate::route::{is_excluded, resolve_reference, RoutePath};
use crate::state::RouteState;
use crate::ExportError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

/// What a worker hands back for one dispatched route
#[derive(Debug)]
struct RouteCompletion {
    index: usize,
    result: RenderResult,
    links: Vec<RoutePath>,
    link_error: Option<String>,
    redirect: Option<RoutePath>,
}

impl RouteCompletion {
    fn failed(index: usize, route: RoutePath, reason: String) -> Self {
        Self {
            index,
            result: RenderResult {
                route,
                outcome: RenderOutcome::Failed {
                    reason,
                    transient: false,
                },
                attempts: 1,
            },
            links: Vec::new(),
            link_error: None,
            redirect: None,
        }
    }
}

/// Holds completions until they can be merged in dispatch order
#[derive(Debug, Default)]
struct ReorderBuffer {
    next: usize,
    ready: BTreeMap<usize, RouteCompletion>,
    outstanding: BTreeMap<usize, RoutePath>,
}

impl ReorderBuffer {
    fn dispatched(&mut self, index: usize, path: RoutePath) {
        self.outstanding.insert(index, path);
    }

    fn completed(&mut self, completion: RouteCompletion) {
        self.outstanding.remove(&completion.index);
        self.ready.insert(completion.index, completion);
    }

    /// Fails every dispatched route that never reported back
    ///
    /// Only valid once no route task is running.
    fn fail_outstanding(&mut self) -> usize {
        let lost = std::mem::take(&mut self.outstanding);
        let count = lost.len();
        for (index, path) in lost {
            self.ready.insert(
                index,
                RouteCompletion::failed(index, path, "render task was lost".to_string()),
            );
        }
        count
    }

    /// Returns the next completion in dispatch order, if it has arrived
    fn pop(&mut self) -> Option<RouteCompletion> {
        let completion = self.ready.remove(&self.next)?;
        self.next += 1;
        Some(completion)
    }
}

/// Per-route work that runs off the coordinator loop
struct RouteWorker {
    resolver: RouteResolver,
    origin: Url,
    document_extensions: Vec<String>,
}

impl RouteWorker {
    async fn process(&self, index: usize, route: RoutePath) -> RouteCompletion {
        let result = self.resolver.resolve(&route).await;

        let mut links = Vec::new();
        let mut link_error = None;
        let mut redirect = None;

        match &result.outcome {
            RenderOutcome::Static {
                content,
                content_type,
            } => {
                if is_html_document(&route, content_type.as_deref()) {
                    match extract_links(&self.origin, &route, content, &self.document_extensions) {
                        Ok(found) => links = found,
                        Err(e) => link_error = Some(e),
                    }
                }
            }
            RenderOutcome::Redirect { target } => {
                redirect = resolve_reference(&self.origin, &route, target);
            }
            RenderOutcome::Dynamic | RenderOutcome::Failed { .. } => {}
        }

        RouteCompletion {
            index,
            result,
            links,
            link_error,
            redirect,
        }
    }
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Main build coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    worker: Arc<RouteWorker>,
    mapper: OutputMapper,
    scheduler: Scheduler,
    registry: OutputRegistry,
    manifest: BuildManifest,
    writes: JoinSet<(usize, Result<PathBuf, OutputError>)>,
    output_dir: PathBuf,
    config_hash: Option<String>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The export configuration
    /// * `renderer` - The render collaborator
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ExportError)` - Invalid configuration
    pub fn new(config: Config, renderer: Arc<dyn Render>) -> Result<Self, ExportError> {
        validate(&config)?;

        let origin = Url::parse(&config.renderer.origin)?;
        let resolver = RouteResolver::new(renderer, RetryPolicy::from_config(&config.export));

        let mut entries = Vec::with_capacity(config.export.entries.len());
        for raw in &config.export.entries {
            let entry = RoutePath::parse(raw)?;
            if is_excluded(&entry, &config.export.exclude) {
                tracing::info!("Entry {} is excluded, skipping", entry);
                continue;
            }
            entries.push(entry);
        }

        let scheduler = Scheduler::new(config.export.concurrency as usize, entries);
        let registry = OutputRegistry::new(config.export.case_insensitive_collisions);

        Ok(Self {
            mapper: OutputMapper::from_config(&config.export),
            output_dir: PathBuf::from(&config.output.directory),
            worker: Arc::new(RouteWorker {
                resolver,
                origin,
                document_extensions: config.export.document_extensions.clone(),
            }),
            config: Arc::new(config),
            scheduler,
            registry,
            manifest: BuildManifest::new(),
            writes: JoinSet::new(),
            config_hash: None,
        })
    }

    /// Records the configuration file hash in the build report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs the whole build
    ///
    /// Per-route problems end up in the returned outcome. `Err` is reserved
    /// for failures that prevent a build from happening at all, such as an
    /// output directory that cannot be created.
    pub async fn run(&mut self) -> Result<BuildOutcome, ExportError> {
        tracing::info!(
            "Starting export to {} ({} entries, concurrency {})",
            self.output_dir.display(),
            self.scheduler.frontier().len(),
            self.scheduler.concurrency()
        );

        prepare_output_dir(&self.output_dir, self.config.output.clean).await?;

        self.copy_assets().await;
        self.produce_fallback().await;
        if self.manifest.has_collision() {
            tracing::error!("Output collision before the crawl, no routes will be rendered");
        } else {
            self.crawl().await;
        }
        self.drain_writes().await;

        let routes = self.route_reports();
        let manifest = std::mem::take(&mut self.manifest);
        let outcome = manifest.finalize(routes);

        if let Some(report_path) = &self.config.output.report_path {
            match write_markdown_report(&outcome, self.config_hash.as_deref(), Path::new(report_path)) {
                Ok(()) => tracing::info!("Build report written to {}", report_path),
                Err(e) => tracing::error!("Failed to write build report {}: {}", report_path, e),
            }
        }

        tracing::info!(
            "Export {}: {} files, {} warnings, {} errors",
            if outcome.success { "succeeded" } else { "failed" },
            outcome.written_files.len(),
            outcome.warnings.len(),
            outcome.errors.len()
        );

        Ok(outcome)
    }

    /// Registers and writes every file from the assets directory
    async fn copy_assets(&mut self) {
        let Some(assets_dir) = self.config.output.assets_dir.clone() else {
            return;
        };

        let dir = PathBuf::from(&assets_dir);
        let collected = tokio::task::spawn_blocking(move || collect_assets(&dir)).await;

        let assets = match collected {
            Ok(Ok(assets)) => assets,
            Ok(Err(e)) => {
                self.manifest.error(BuildError::Assets(e.to_string()));
                return;
            }
            Err(e) => {
                self.manifest.error(BuildError::Assets(e.to_string()));
                return;
            }
        };

        tracing::info!("Copying {} assets from {}", assets.len(), assets_dir);
        for asset in assets {
            if !self.claim_and_write(asset) {
                return;
            }
        }
    }

    /// Builds, registers and writes the fallback document
    async fn produce_fallback(&mut self) {
        let fallback_name = self.config.export.fallback.clone();
        if fallback_name.is_empty() {
            tracing::debug!("No fallback configured");
            return;
        }

        self.manifest.expect_fallback();

        let template = self.config.fallback.shell_template.as_deref().map(Path::new);
        let entry = match load_shell_template(template).await {
            Ok(shell) => build_fallback(&shell, &fallback_name, &self.config.fallback),
            Err(e) => Err(e),
        };

        match entry {
            Ok(entry) => {
                if let Err(collision) = self.registry.claim(&entry.path, entry.owner.clone()) {
                    self.manifest.fallback_failed(BuildError::Collision(collision));
                    return;
                }
                tracing::info!("Writing fallback {}", entry.path);
                self.spawn_write(entry);
            }
            Err(e) => self.manifest.fallback_failed(BuildError::Fallback(e.to_string())),
        }
    }

    /// The crawl loop
    ///
    /// Completions are buffered and merged strictly in dispatch order, so
    /// everything observable (frontier growth, outputs, warnings) is
    /// independent of which render finishes first.
    async fn crawl(&mut self) {
        let mut in_flight: JoinSet<RouteCompletion> = JoinSet::new();
        let mut reorder = ReorderBuffer::default();
        let mut merged = 0usize;
        let mut cancelled = false;
        let start_time = Instant::now();

        loop {
            if !cancelled {
                while let Some(scheduled) = self.scheduler.next_route() {
                    tracing::debug!("Rendering {}", scheduled.path);
                    reorder.dispatched(scheduled.index, scheduled.path.clone());
                    self.dispatch(&mut in_flight, scheduled);
                }
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok(completion) => reorder.completed(completion),
                Err(e) if e.is_cancelled() => continue,
                Err(e) => tracing::error!("Route task failed: {}", e),
            }

            if cancelled {
                continue;
            }

            if in_flight.is_empty() {
                let lost = reorder.fail_outstanding();
                if lost > 0 {
                    tracing::error!("{} route tasks ended without a result", lost);
                }
            }

            while let Some(completion) = reorder.pop() {
                merged += 1;

                if !self.merge(completion) {
                    tracing::error!("Fatal output collision, cancelling remaining renders");
                    cancelled = true;
                    in_flight.abort_all();
                    break;
                }

                if merged % 10 == 0 {
                    let elapsed = start_time.elapsed();
                    tracing::info!(
                        "Progress: {} routes done, {} known, {} in flight, {:.2} routes/sec",
                        merged,
                        self.scheduler.frontier().len(),
                        in_flight.len(),
                        merged as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                    );
                }
            }
        }

        if cancelled {
            let reset = self.scheduler.frontier_mut().requeue_unfinished();
            if reset > 0 {
                tracing::warn!("{} routes were cancelled before completing", reset);
            }
        }

        tracing::info!(
            "Crawl finished: {} routes processed in {:?}",
            merged,
            start_time.elapsed()
        );
    }

    /// Spawns a render for one route
    ///
    /// The worker runs in its own task so a panic inside the renderer is
    /// reported against the route instead of losing it.
    fn dispatch(&self, in_flight: &mut JoinSet<RouteCompletion>, scheduled: ScheduledRoute) {
        let ScheduledRoute {
            index,
            path,
            _permit: permit,
        } = scheduled;
        let worker = Arc::clone(&self.worker);

        in_flight.spawn(async move {
            let _permit = permit;
            let route = path.clone();
            let mut task = AbortOnDrop(tokio::spawn(async move { worker.process(index, route).await }));

            match (&mut task.0).await {
                Ok(completion) => completion,
                Err(e) => RouteCompletion::failed(index, path, format!("render task panicked: {}", e)),
            }
        });
    }

    /// Applies one completed route to the build
    ///
    /// # Returns
    ///
    /// false if the build hit a fatal collision and must stop dispatching
    fn merge(&mut self, completion: RouteCompletion) -> bool {
        let RouteCompletion {
            index,
            result,
            links,
            link_error,
            redirect,
        } = completion;
        let RenderResult {
            route,
            outcome,
            attempts,
        } = result;

        if attempts > 1 && !outcome.is_failed() {
            self.manifest.warn(BuildWarning::RetriedRender {
                route: route.clone(),
                attempts,
            });
        }

        match outcome {
            RenderOutcome::Static { content, .. } => {
                match self.mapper.map_to_file(&route, content) {
                    Ok(entry) => {
                        if !self.claim_and_write(entry) {
                            self.scheduler.complete(index, RouteState::Failed);
                            return false;
                        }
                        self.scheduler.complete(index, RouteState::Succeeded);
                    }
                    Err(e) => {
                        self.scheduler.complete(index, RouteState::Failed);
                        self.render_failure(&route, e.to_string(), attempts);
                    }
                }

                if let Some(reason) = link_error {
                    self.manifest.warn(BuildWarning::MalformedContent {
                        route: route.clone(),
                        reason,
                    });
                }

                for link in links {
                    self.discover(link, index);
                }
            }

            RenderOutcome::Redirect { target } => {
                tracing::debug!("{} redirects to {}", route, target);
                self.scheduler.complete(index, RouteState::Succeeded);
                self.manifest.record_redirect(RedirectRecord {
                    from: route,
                    target,
                    resolved: redirect.clone(),
                });
                if let Some(resolved) = redirect {
                    self.discover(resolved, index);
                }
            }

            RenderOutcome::Dynamic => {
                self.scheduler.complete(index, RouteState::Skipped);
                let fallback_available = self.manifest.fallback_available();

                if fallback_available && self.config.export.on_dynamic == FailurePolicy::Warn {
                    self.manifest.warn(BuildWarning::DynamicRoute { route });
                } else {
                    self.manifest.error(BuildError::NonPrerenderable {
                        route,
                        fallback_available,
                    });
                }
            }

            RenderOutcome::Failed { reason, .. } => {
                self.scheduler.complete(index, RouteState::Failed);
                self.render_failure(&route, reason, attempts);
            }
        }

        true
    }

    /// Records a per-route failure according to the render error policy
    fn render_failure(&mut self, route: &RoutePath, reason: String, attempts: u32) {
        match self.config.export.on_render_error {
            FailurePolicy::Warn => self.manifest.warn(BuildWarning::RenderFailed {
                route: route.clone(),
                reason,
                attempts,
            }),
            FailurePolicy::Fail => self.manifest.error(BuildError::RenderFailed {
                route: route.clone(),
                reason,
            }),
        }
    }

    /// Adds a discovered route to the frontier unless excluded or known
    fn discover(&mut self, route: RoutePath, parent: usize) {
        if is_excluded(&route, &self.config.export.exclude) {
            tracing::trace!("Skipping excluded route {}", route);
            return;
        }
        if let Some(index) = self.scheduler.discover(route, Some(parent)) {
            tracing::trace!("Discovered route #{}", index);
        }
    }

    /// Claims an output path and starts its write
    ///
    /// Returns false (and records the collision) if the path is taken.
    fn claim_and_write(&mut self, entry: OutputEntry) -> bool {
        if let Err(collision) = self.registry.claim(&entry.path, entry.owner.clone()) {
            self.manifest.error(BuildError::Collision(collision));
            return false;
        }
        self.spawn_write(entry);
        true
    }

    fn spawn_write(&mut self, entry: OutputEntry) {
        let seq = self.manifest.record_output(&entry);
        let root = self.output_dir.clone();
        self.writes
            .spawn(async move { (seq, write_entry(&root, &entry).await) });
    }

    /// Waits for every file write to finish
    async fn drain_writes(&mut self) {
        while let Some(joined) = self.writes.join_next().await {
            match joined {
                Ok((seq, Ok(path))) => {
                    tracing::trace!("Wrote {}", path.display());
                    self.manifest.mark_written(seq);
                }
                Ok((seq, Err(e))) => self.manifest.mark_write_failed(seq, e.to_string()),
                Err(e) => self.manifest.error(BuildError::Write {
                    path: self.output_dir.display().to_string(),
                    reason: e.to_string(),
                }),
            }
        }
    }

    fn route_reports(&self) -> Vec<RouteReport> {
        let frontier = self.scheduler.frontier();
        frontier
            .records()
            .iter()
            .map(|record| RouteReport {
                route: record.path.clone(),
                parent: record
                    .parent
                    .and_then(|parent| frontier.get(parent))
                    .map(|parent| parent.path.clone()),
                state: record.state,
            })
            .collect()
    }
}
