//! static-export main entry point
//!
//! This is the command-line interface for the static-export build adapter.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use static_export::config::{load_config_with_hash, validate, Config};
use static_export::crawler::{Coordinator, HttpRenderer};
use static_export::output::print_outcome;
use static_export::route::{is_excluded, RoutePath};
use tracing_subscriber::EnvFilter;

/// static-export: prerender an application into a static file tree
///
/// Crawls every route reachable from the configured entries through a
/// running preview server, writes each prerenderable route to disk and
/// packages an SPA fallback document for everything else.
#[derive(Parser, Debug)]
#[command(name = "static-export")]
#[command(version)]
#[command(about = "Prerender an application into a static file tree", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the build plan without rendering anything
    #[arg(long)]
    dry_run: bool,

    /// Override the preview server origin
    #[arg(long, value_name = "URL")]
    origin: Option<String>,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(origin) = cli.origin {
        config.renderer.origin = origin;
    }
    if let Some(out) = cli.out {
        config.output.directory = out.display().to_string();
    }
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let success = handle_export(config, config_hash).await?;
    if !success {
        std::process::exit(1);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("static_export=info,warn"),
            1 => EnvFilter::new("static_export=debug,info"),
            2 => EnvFilter::new("static_export=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what a build would do
fn handle_dry_run(config: &Config) {
    println!("=== static-export Dry Run ===\n");

    println!("Export:");
    println!("  Concurrency: {}", config.export.concurrency);
    println!("  Trailing slash: {:?}", config.export.trailing_slash);
    println!(
        "  Retries: {} ({}ms apart, {}ms timeout)",
        config.export.max_retries, config.export.retry_delay_ms, config.export.render_timeout_ms
    );
    println!("  On dynamic route: {:?}", config.export.on_dynamic);
    println!("  On render error: {:?}", config.export.on_render_error);

    println!("\nRenderer:");
    println!("  Origin: {}", config.renderer.origin);
    println!("  User agent: {}", config.renderer.user_agent);

    println!("\nOutput:");
    println!(
        "  Directory: {}{}",
        config.output.directory,
        if config.output.clean { " (cleaned first)" } else { "" }
    );
    if let Some(assets) = &config.output.assets_dir {
        println!("  Assets: {}", assets);
    }
    if let Some(report) = &config.output.report_path {
        println!("  Report: {}", report);
    }

    if config.export.fallback.is_empty() {
        println!("\nFallback: disabled");
    } else {
        println!("\nFallback: {}", config.export.fallback);
        println!(
            "  Shell: {}",
            config.fallback.shell_template.as_deref().unwrap_or("built-in")
        );
        println!("  Client entry: {}", config.fallback.client_entry);
    }

    println!("\nEntries ({}):", config.export.entries.len());
    for entry in &config.export.entries {
        let excluded = RoutePath::parse(entry)
            .map(|route| is_excluded(&route, &config.export.exclude))
            .unwrap_or(false);
        println!("  - {}{}", entry, if excluded { " (excluded)" } else { "" });
    }

    if !config.export.exclude.is_empty() {
        println!("\nExcluded patterns ({}):", config.export.exclude.len());
        for pattern in &config.export.exclude {
            println!("  - {}", pattern);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main export operation
///
/// Returns whether the build succeeded.
async fn handle_export(config: Config, config_hash: String) -> anyhow::Result<bool> {
    tracing::info!(
        "Exporting {} entries from {}",
        config.export.entries.len(),
        config.renderer.origin
    );

    let timeout = Duration::from_millis(config.export.render_timeout_ms);
    let renderer = HttpRenderer::new(&config.renderer, timeout)?;

    let mut coordinator = Coordinator::new(config, Arc::new(renderer))?.with_config_hash(config_hash);
    let outcome = coordinator.run().await?;

    print_outcome(&outcome);

    if outcome.success {
        tracing::info!("Export completed successfully");
    } else {
        tracing::error!("Export failed with {} errors", outcome.errors.len());
    }

    Ok(outcome.success)
}
