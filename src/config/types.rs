use serde::Deserialize;

/// Main configuration structure for static-export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// How routes are mapped onto files with respect to trailing slashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    /// Every route becomes `<path>/index.html`
    #[default]
    Always,
    /// Every route becomes `<path>.html`
    Never,
    /// `/a/` becomes `a/index.html`, `/a` becomes `a.html`
    Ignore,
}

/// Whether a class of per-route problem fails the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Warn,
    Fail,
}

/// Crawl and export behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Seed routes; may be empty for a fully fallback-served build
    #[serde(default)]
    pub entries: Vec<String>,

    /// Relative name of the SPA fallback document ("" disables it)
    #[serde(default = "default_fallback")]
    pub fallback: String,

    /// Maximum number of routes rendered at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    #[serde(rename = "trailing-slash", default)]
    pub trailing_slash: TrailingSlash,

    /// What to do with routes that require a live server
    #[serde(rename = "on-dynamic", default)]
    pub on_dynamic: FailurePolicy,

    /// What to do with routes that fail to render
    #[serde(rename = "on-render-error", default)]
    pub on_render_error: FailurePolicy,

    /// Retries after a transient render failure
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-attempt render timeout (milliseconds)
    #[serde(rename = "render-timeout-ms", default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Fold case when checking output paths for collisions
    #[serde(rename = "case-insensitive-collisions", default)]
    pub case_insensitive_collisions: bool,

    /// Extensions of linked routes that are crawled as documents
    ///
    /// Links to any other extension (`/guide.pdf`) are left to the assets
    /// directory and never rendered.
    #[serde(rename = "document-extensions", default = "default_document_extensions")]
    pub document_extensions: Vec<String>,

    /// Route patterns that are never crawled (e.g. "/admin/*")
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            fallback: default_fallback(),
            concurrency: default_concurrency(),
            trailing_slash: TrailingSlash::default(),
            on_dynamic: FailurePolicy::default(),
            on_render_error: FailurePolicy::default(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            render_timeout_ms: default_render_timeout_ms(),
            case_insensitive_collisions: false,
            document_extensions: default_document_extensions(),
            exclude: Vec::new(),
        }
    }
}

/// Render collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    /// Origin of the preview server that renders routes
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User agent sent with render requests
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            user_agent: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the static tree is written to
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Remove the output directory before writing
    #[serde(default = "default_true")]
    pub clean: bool,

    /// Pre-built static assets copied verbatim into the output
    #[serde(rename = "assets-dir", default)]
    pub assets_dir: Option<String>,

    /// Path to the markdown build report
    #[serde(rename = "report-path", default)]
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            clean: true,
            assets_dir: None,
            report_path: None,
        }
    }
}

/// SPA shell configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    /// Shell template file; the built-in shell is used when unset
    #[serde(rename = "shell-template", default)]
    pub shell_template: Option<String>,

    /// URL of the client-side router entry script
    #[serde(rename = "client-entry", default = "default_client_entry")]
    pub client_entry: String,

    /// Base path the application is served under
    #[serde(rename = "base-path", default = "default_base_path")]
    pub base_path: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            shell_template: None,
            client_entry: default_client_entry(),
            base_path: default_base_path(),
        }
    }
}

fn default_fallback() -> String {
    "200.html".to_string()
}

fn default_concurrency() -> u32 {
    4
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    250
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_document_extensions() -> Vec<String> {
    ["html", "htm", "xml", "json", "txt", "rss", "atom", "webmanifest"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_origin() -> String {
    "http://127.0.0.1:4173".to_string()
}

fn default_user_agent() -> String {
    format!("static-export/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_directory() -> String {
    "build".to_string()
}

fn default_true() -> bool {
    true
}

fn default_client_entry() -> String {
    "/app.js".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}
