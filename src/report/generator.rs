//! Markdown and JSON rendering.
//!
//! This module renders leaderboard pages and player cards for the
//! terminal front-end.

use crate::models::{LeaderboardReport, PlayerCard, RankedRow, ReportMetadata, SortKey};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Generate a complete Markdown leaderboard page.
pub fn generate_markdown_leaderboard(report: &LeaderboardReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Hero FFA Leaderboard: {}\n\n",
        report.metadata.sort.label()
    ));

    output.push_str(&generate_metadata_section(report));

    if !report.complete {
        output.push_str(&format!(
            "> ⚠️ **Incomplete:** aggregation stopped early ({}). Totals may be too low.\n\n",
            report.metadata.stop_reason
        ));
    }

    output.push_str(&generate_table(&report.rows, report.metadata.sort));
    output.push_str(&generate_pager(report));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &LeaderboardReport) -> String {
    let metadata: &ReportMetadata = &report.metadata;
    let mut section = String::new();

    section.push_str(&format!("- **Sorted by:** {}\n", metadata.sort.label()));
    section.push_str(&format!(
        "- **Page:** {} of {}\n",
        report.page, report.total_pages
    ));
    section.push_str(&format!("- **Players:** {}\n", report.total_players));
    section.push_str(&format!(
        "- **Upstream pages:** {}\n",
        metadata.upstream_pages
    ));
    section.push_str(&format!(
        "- **Fetched:** {} ({:.1}s)\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the ranking table.
fn generate_table(rows: &[RankedRow], sort: SortKey) -> String {
    if rows.is_empty() {
        return "No players on this page.\n\n".to_string();
    }

    let mark = |key: SortKey| if key == sort { " ▼" } else { "" };

    let mut table = String::new();
    table.push_str(&format!(
        "| # | Player | Kills{} | Deaths{} | K/D | XP{} |\n",
        mark(SortKey::Kills),
        mark(SortKey::Deaths),
        mark(SortKey::Experience)
    ));
    table.push_str("|---:|:---|---:|---:|---:|---:|\n");

    for row in rows {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {:.2} | {} |\n",
            row.rank,
            escape_cell(row.display_name()),
            row.kills,
            row.deaths,
            row.kd_ratio,
            row.xp
        ));
    }
    table.push('\n');

    table
}

/// Generate the "players x - y" line under the table.
fn generate_pager(report: &LeaderboardReport) -> String {
    match (report.rows.first(), report.rows.last()) {
        (Some(first), Some(last)) => format!(
            "*Players {} - {} of {}*\n\n",
            first.rank, last.rank, report.total_players
        ),
        _ => String::new(),
    }
}

/// Generate a Markdown player card.
pub fn generate_markdown_player(card: &PlayerCard) -> String {
    let details = &card.details;
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", details.name));
    output.push_str(&format!("`{}`\n\n", details.uuid));

    output.push_str("| Kills | Deaths | K/D | XP |\n");
    output.push_str("|---:|---:|---:|---:|\n");
    output.push_str(&format!(
        "| {} | {} | {:.2} | {} |\n\n",
        details.kills, details.deaths, card.kd_ratio, details.xp
    ));

    output.push_str(&format!("- **Killstreak:** {}\n", details.killstreak));
    output.push_str(&format!(
        "- **Peak killstreak:** {}\n",
        details.peak_killstreak
    ));
    output.push_str(&format!("- **Bounty:** {}\n\n", details.bounty));

    if !card.hero_experience.is_empty() {
        output.push_str("## Heroes\n\n");
        output.push_str("| Hero | XP |\n");
        output.push_str("|:---|---:|\n");
        for (hero, xp) in &card.hero_experience {
            output.push_str(&format!("| {} | {} |\n", escape_cell(hero), xp));
        }
        output.push('\n');
    }

    output.push_str(&generate_footer());
    output
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate the footer.
fn generate_footer() -> String {
    "---\n\n*Data from the HGLabor Hero FFA stats API*\n".to_string()
}

/// Serialize any report as pretty JSON.
pub fn generate_json<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Print to stdout, or write to `path` when one is given.
pub fn emit(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}
