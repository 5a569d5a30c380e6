//! Rendering of walk reports for the terminal
//!
//! Every function writes into an `impl Write` so the exact text can be
//! asserted in tests; `main` passes a locked stdout.

use colored::Colorize;
use nbhygiene_notebook::{
    CleanEntry, CleanReport, CleanStatus, Finding, NotebookSummary, ValidationReport,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

/// Format bytes as human-readable size (e.g., "1.5 KB")
#[must_use]
#[allow(clippy::cast_precision_loss)] // display only
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

fn clean_line(entry: &CleanEntry, verbose: bool) -> String {
    let path = entry.path.display();
    let details = if verbose && entry.status != CleanStatus::AlreadyClean {
        format!(
            " ({} outputs, {} execution counts)",
            entry.outputs_cleared, entry.execution_counts_cleared
        )
    } else {
        String::new()
    };

    match &entry.status {
        CleanStatus::Cleaned => format!("{} {path}{details}", "Cleaned:".green()),
        CleanStatus::WouldClean => format!("{} {path}{details}", "Would clean:".yellow()),
        CleanStatus::AlreadyClean => format!("{} {path}", "Already clean:".bright_black()),
        CleanStatus::Failed(reason) => format!("{} {path} ({reason})", "Failed:".red().bold()),
    }
}

/// Per-file clean lines, plus the `Cleaned N notebooks` summary for directories
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_clean_report(
    out: &mut impl Write,
    report: &CleanReport,
    dry_run: bool,
    directory: bool,
    verbose: bool,
) -> io::Result<()> {
    for entry in &report.entries {
        writeln!(out, "{}", clean_line(entry, verbose))?;
    }

    if directory {
        let action = if dry_run { "Would clean" } else { "Cleaned" };
        writeln!(out, "\n{action} {} notebooks", report.changed_count())?;
    }
    Ok(())
}

fn write_findings(out: &mut impl Write, path: &Path, findings: &[Finding]) -> io::Result<()> {
    writeln!(out, "{}", format!("{}:", path.display()).bold())?;
    for finding in findings {
        writeln!(out, "  {}  {finding}", "⚠".yellow())?;
    }
    Ok(())
}

/// Human-readable validation report
///
/// `single_file` is the notebook path when the target was one file; the
/// wording then matches single-file runs rather than directory walks.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_validation_text(
    out: &mut impl Write,
    report: &ValidationReport,
    single_file: Option<&Path>,
) -> io::Result<()> {
    if let Some(path) = single_file {
        return match report.results.get(path) {
            Some(findings) => {
                writeln!(out)?;
                write_findings(out, path, findings)
            }
            None => writeln!(out, "{} {}: No issues found", "✓".green(), path.display()),
        };
    }

    if !report.has_findings() {
        return writeln!(out, "{} All notebooks passed validation", "✓".green());
    }

    writeln!(out, "Validation issues found:\n")?;
    for (path, findings) in &report.results {
        write_findings(out, path, findings)?;
        writeln!(out)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ValidationJson<'a> {
    files_checked: usize,
    finding_count: usize,
    results: BTreeMap<String, &'a [Finding]>,
}

/// JSON validation report keyed by notebook path
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_validation_json(out: &mut impl Write, report: &ValidationReport) -> io::Result<()> {
    let json = ValidationJson {
        files_checked: report.files_checked,
        finding_count: report.finding_count(),
        results: report
            .results
            .iter()
            .map(|(path, findings)| (path.display().to_string(), findings.as_slice()))
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &json)?;
    writeln!(out)
}

/// Notebook table grouped by category
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_inventory_text(out: &mut impl Write, summaries: &[NotebookSummary]) -> io::Result<()> {
    if summaries.is_empty() {
        return writeln!(out, "No notebooks found");
    }

    let mut current_category: Option<&str> = None;
    for summary in summaries {
        if current_category != Some(summary.category.as_str()) {
            if current_category.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "{}", summary.category.bold().cyan())?;
            current_category = Some(summary.category.as_str());
        }

        let status = match (&summary.error, summary.dirty) {
            (Some(_), _) => "unreadable".red(),
            (None, true) => "outputs".yellow(),
            (None, false) => "clean".green(),
        };
        writeln!(
            out,
            "  {:<40} {:>3} cells ({} md, {} code)  {:>10}  {}",
            summary.path.display(),
            summary.cells,
            summary.markdown_cells,
            summary.code_cells,
            format_bytes(summary.size),
            status
        )?;
    }

    let dirty = summaries.iter().filter(|s| s.dirty).count();
    writeln!(
        out,
        "\n{} notebooks, {} with outputs",
        summaries.len(),
        dirty
    )
}

/// Notebook listing as a JSON array
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_inventory_json(out: &mut impl Write, summaries: &[NotebookSummary]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, summaries)?;
    writeln!(out)
}
