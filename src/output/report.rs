//! Console summary of a build

use crate::output::BuildOutcome;
use crate::state::RouteState;

/// Prints a build outcome to stdout
pub fn print_outcome(outcome: &BuildOutcome) {
    println!("{}", format_outcome(outcome));
}

/// Formats the console summary
pub fn format_outcome(outcome: &BuildOutcome) -> String {
    let mut out = String::new();
    out.push_str("=== Static Export ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Routes discovered: {}\n", outcome.routes.len()));
    out.push_str(&format!("  Files written: {}\n", outcome.written_files.len()));
    out.push_str(&format!("  Redirects: {}\n", outcome.redirects.len()));
    out.push_str(&format!("  Duration: {}s\n\n", outcome.duration_seconds()));

    let counts = outcome.count_by_state();
    if !counts.is_empty() {
        out.push_str("Routes by State:\n");
        let total = outcome.routes.len();
        for (state, count) in &counts {
            let percentage = if total > 0 {
                (*count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            out.push_str(&format!("  {}: {} ({:.1}%)\n", state, count, percentage));
        }
        out.push('\n');
    }

    if !outcome.warnings.is_empty() {
        out.push_str(&format!("Warnings ({}):\n", outcome.warnings.len()));
        for warning in &outcome.warnings {
            out.push_str(&format!("  - {}\n", warning));
        }
        out.push('\n');
    }

    if !outcome.errors.is_empty() {
        out.push_str(&format!("Errors ({}):\n", outcome.errors.len()));
        for error in &outcome.errors {
            out.push_str(&format!("  - {}\n", error));
        }
        out.push('\n');
    }

    let succeeded = counts.get(&RouteState::Succeeded).copied().unwrap_or(0);
    out.push_str(&format!(
        "Result: {} ({} / {} routes prerendered)",
        if outcome.success { "SUCCESS" } else { "FAILED" },
        succeeded,
        outcome.routes.len()
    ));
    out
}
