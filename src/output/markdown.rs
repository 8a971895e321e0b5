//! Markdown build report generation
//!
//! This module renders a `BuildOutcome` as a human-readable markdown report:
//! run information, route state breakdown, written files, redirects,
//! warnings and errors.

use crate::output::{BuildOutcome, OutputError};
use crate::state::RouteState;
use std::path::Path;

/// Writes the markdown report for a build
///
/// # Arguments
///
/// * `outcome` - The finalized build outcome
/// * `config_hash` - Hash of the configuration file, when built from one
/// * `output_path` - Where the report is written
pub fn write_markdown_report(
    outcome: &BuildOutcome,
    config_hash: Option<&str>,
    output_path: &Path,
) -> Result<(), OutputError> {
    let markdown = format_markdown_report(outcome, config_hash);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output_path, markdown)?;

    Ok(())
}

/// Formats a build outcome as markdown
pub fn format_markdown_report(outcome: &BuildOutcome, config_hash: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str("# Static Export Build Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", outcome.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", outcome.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        outcome.duration_seconds()
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if outcome.success { "success" } else { "failed" }
    ));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Routes Discovered**: {}\n", outcome.routes.len()));
    md.push_str(&format!("- **Files Written**: {}\n", outcome.written_files.len()));
    md.push_str(&format!(
        "- **Total Bytes**: {}\n",
        outcome.written_files.iter().map(|f| f.bytes).sum::<usize>()
    ));
    md.push_str(&format!("- **Warnings**: {}\n", outcome.warnings.len()));
    md.push_str(&format!("- **Errors**: {}\n\n", outcome.errors.len()));

    // State breakdown
    let counts = outcome.count_by_state();
    md.push_str("## Route State Breakdown\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    for state in RouteState::all_states() {
        md.push_str(&format!(
            "| {} | {} |\n",
            state,
            counts.get(&state).copied().unwrap_or(0)
        ));
    }
    md.push('\n');

    if !outcome.written_files.is_empty() {
        md.push_str("## Written Files\n\n");
        md.push_str("| Path | Source | Bytes | SHA-256 |\n");
        md.push_str("|------|--------|-------|---------|\n");
        for file in &outcome.written_files {
            md.push_str(&format!(
                "| `{}` | {} | {} | `{}` |\n",
                file.path,
                file.owner,
                file.bytes,
                &file.digest[..file.digest.len().min(12)]
            ));
        }
        md.push('\n');
    }

    if !outcome.redirects.is_empty() {
        md.push_str("## Redirects\n\n");
        md.push_str("| From | To |\n");
        md.push_str("|------|----|\n");
        for redirect in &outcome.redirects {
            md.push_str(&format!("| {} | {} |\n", redirect.from, redirect.target));
        }
        md.push('\n');
    }

    if !outcome.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warning in &outcome.warnings {
            md.push_str(&format!("- {}\n", warning));
        }
        md.push('\n');
    }

    if !outcome.errors.is_empty() {
        md.push_str("## Errors\n\n");
        for error in &outcome.errors {
            md.push_str(&format!("- {}\n", error));
        }
        md.push('\n');
    }

    md
}
