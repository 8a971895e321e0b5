//! Shared helpers: an in-process site renderer and config builders

use async_trait::async_trait;
use static_export::config::Config;
use static_export::crawler::{Render, RenderError, RenderResponse};
use static_export::RoutePath;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use walkdir::WalkDir;

/// How a mock route behaves
#[derive(Debug, Clone)]
pub enum Page {
    /// Renders the given HTML
    Html(String),
    /// Fails with an I/O error `failures` times, then renders
    Flaky { failures: u32, html: String },
    /// Fails with an application error every time
    Broken,
    /// Requires a live server
    Dynamic,
    /// Redirects to the given target
    Redirect(String),
}

/// A site whose routes are served from memory
///
/// Tracks how often each route is rendered and the highest number of
/// renders that were running at the same time.
pub struct MockSite {
    pages: HashMap<String, Page>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<HashMap<String, u32>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockSite {
    pub fn new(pages: Vec<(&str, Page)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(route, page)| (route.to_string(), page))
                .collect(),
            delays: HashMap::new(),
            default_delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_route_delay(mut self, route: &str, delay: Duration) -> Self {
        self.delays.insert(route.to_string(), delay);
        self
    }

    pub fn calls(&self, route: &str) -> u32 {
        self.calls.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn all_calls(&self) -> HashMap<String, u32> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Render for MockSite {
    async fn render(&self, route: &RoutePath) -> Result<RenderResponse, RenderError> {
        let key = route.to_string();
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let delay = self.delays.get(&key).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = match self.pages.get(&key) {
            Some(Page::Html(html)) => Ok(RenderResponse::ok(html.clone())),
            Some(Page::Flaky { failures, html }) => {
                if call <= *failures {
                    Err(RenderError::Io("connection reset by peer".to_string()))
                } else {
                    Ok(RenderResponse::ok(html.clone()))
                }
            }
            Some(Page::Broken) => Err(RenderError::Application("template threw".to_string())),
            Some(Page::Dynamic) => Ok(RenderResponse::dynamic()),
            Some(Page::Redirect(target)) => Ok(RenderResponse::redirect(307, target.clone())),
            None => Ok(RenderResponse::status(404)),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Builds a page linking to every given route
pub fn links(routes: &[&str]) -> Page {
    let anchors: String = routes
        .iter()
        .map(|route| format!(r#"<a href="{}">{}</a>"#, route, route))
        .collect();
    Page::Html(format!("<html><body><nav>{}</nav></body></html>", anchors))
}

/// A config writing into `dir/build` with no retry delay
pub fn test_config(dir: &TempDir, entries: &[&str]) -> Config {
    let mut config = Config::default();
    config.export.entries = entries.iter().map(|e| e.to_string()).collect();
    config.export.retry_delay_ms = 0;
    config.output.directory = output_dir(dir).display().to_string();
    config
}

pub fn output_dir(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("build")
}

/// Reads every file under `root` keyed by '/'-separated relative path
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (relative, std::fs::read(e.path()).unwrap())
        })
        .collect()
}
