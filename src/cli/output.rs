//! Output formatting helpers for CLI commands

use crate::reaper::{Disposition, GroupOutcome, ReapReport};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

/// Short label for what happened to a resource.
pub fn disposition_label(disposition: Disposition) -> &'static str {
    match disposition {
        Disposition::Deleted => "deleted",
        Disposition::InUse => "in use",
        Disposition::Absent => "absent",
    }
}

/// Format a reap report as a table, one row per group
pub fn format_reap_table(report: &ReapReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Region", "Group", "Outcome", "Security Group", "Key Pairs"]);

    for group in &report.groups {
        let (outcome, security_group, key_pairs) = match &group.outcome {
            GroupOutcome::Cleaned(cleanup) => {
                let deleted: Vec<&str> = cleanup.deleted_key_pairs().collect();
                let key_pairs = if deleted.is_empty() {
                    "-".to_string()
                } else {
                    deleted.join(", ")
                };
                (
                    "cleaned".green().to_string(),
                    disposition_label(cleanup.security_group).to_string(),
                    key_pairs,
                )
            }
            GroupOutcome::Abandoned { attempts, .. } => (
                "abandoned".yellow().to_string(),
                format!("in use after {} attempts", attempts),
                "-".to_string(),
            ),
            GroupOutcome::Failed { error } => {
                ("failed".red().to_string(), error.clone(), "-".to_string())
            }
        };

        table.add_row(vec![
            Cell::new(&group.group.region),
            Cell::new(&group.group.name),
            Cell::new(outcome),
            Cell::new(security_group),
            Cell::new(key_pairs),
        ]);
    }

    table.to_string()
}

/// One-line tally of a reap
pub fn format_reap_summary(report: &ReapReport) -> String {
    let mut summary = format!(
        "{} cleaned, {} abandoned, {} failed",
        report.cleaned(),
        report.abandoned(),
        report.failed()
    );
    if !report.unresolved_nodes.is_empty() {
        summary.push_str(&format!(
            " ({} nodes without a region skipped)",
            report.unresolved_nodes.len()
        ));
    }
    summary
}
