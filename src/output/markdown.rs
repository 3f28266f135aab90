//! Markdown report generation
//!
//! This module renders the new items of a batch as a human-readable markdown
//! report, grouped by query in submission order.

use crate::batch::{BatchOutcome, Item, ItemLink, QueryReport};
use crate::output::{ReportError, ReportResult};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp appended to report file names
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y_%H-%M-%S";

/// Writes the report of a batch next to other reports
///
/// # Arguments
///
/// * `dir` - Directory the report is written to (created if missing)
/// * `title` - Report heading
/// * `input` - Input list the batch was built from; its stem names the report
/// * `outcome` - New items per query
///
/// # Returns
///
/// * `Ok(Some(path))` - The report was written to `path`
/// * `Ok(None)` - Nothing new; no report written
/// * `Err(ReportError)` - Failed to write the report
pub fn write_report(
    dir: &Path,
    title: &str,
    input: &Path,
    outcome: &BatchOutcome,
) -> ReportResult<Option<PathBuf>> {
    if outcome.is_empty() {
        tracing::info!(title, "No new items, skipping report");
        return Ok(None);
    }

    let path = dir.join(report_file_name(input, &Local::now()));
    let markdown = render_report(title, outcome);

    std::fs::create_dir_all(dir).map_err(|source| ReportError::Write {
        path: dir.display().to_string(),
        source,
    })?;
    File::create(&path)
        .and_then(|mut file| file.write_all(markdown.as_bytes()))
        .map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })?;

    tracing::info!(
        path = %path.display(),
        items = outcome.new_item_count(),
        "Report written"
    );
    Ok(Some(path))
}

/// Report file name for an input list: `<stem>_<dd-mm-YYYY_HH-MM-SS>.md`
pub fn report_file_name(input: &Path, at: &DateTime<Local>) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_else(|| "report".into());
    format!("{}_{}.md", stem, at.format(TIMESTAMP_FORMAT))
}

/// Formats a batch outcome as markdown
///
/// # Arguments
///
/// * `title` - Report heading
/// * `outcome` - New items per query
///
/// # Returns
///
/// A formatted markdown string
pub fn render_report(title: &str, outcome: &BatchOutcome) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", title));
    md.push_str(&format!(
        "{} new item(s) in {} quer{}\n\n",
        outcome.new_item_count(),
        outcome.reports().len(),
        if outcome.reports().len() == 1 { "y" } else { "ies" }
    ));

    for report in outcome.reports() {
        push_query(&mut md, report);
    }

    if !outcome.failures().is_empty() {
        md.push_str("## Failed queries\n\n");
        md.push_str("| Query | Error |\n");
        md.push_str("|-------|-------|\n");
        for failure in outcome.failures() {
            md.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&failure.label),
                escape_cell(&failure.error.to_string())
            ));
        }
        md.push('\n');
    }

    md
}

fn push_query(md: &mut String, report: &QueryReport) {
    md.push_str(&format!(
        "## {} ({} new)\n\n",
        report.label,
        report.items.len()
    ));

    if !report.links.is_empty() {
        md.push_str(&format!("{}\n\n", format_links(&report.links)));
    }

    for item in &report.items {
        push_item(md, item);
    }
}

fn push_item(md: &mut String, item: &Item) {
    let title = if item.title.is_empty() {
        item.id.as_str()
    } else {
        item.title.as_str()
    };
    md.push_str(&format!("### {}\n\n", title));

    md.push_str(&format!("- **Id**: {}\n", item.id));
    if !item.price.is_empty() {
        md.push_str(&format!("- **Price**: {}\n", item.price));
    }
    if !item.links.is_empty() {
        md.push_str(&format!("- **Links**: {}\n", format_links(&item.links)));
    }
    for note in &item.notes {
        md.push_str(&format!("- {}\n", note));
    }
    md.push('\n');

    if let Some(image) = &item.image_url {
        md.push_str(&format!("![{}]({})\n\n", item.id, image));
    }
}

fn format_links(links: &[ItemLink]) -> String {
    links
        .iter()
        .map(|link| format!("[{}]({})", link.label, link.url))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
