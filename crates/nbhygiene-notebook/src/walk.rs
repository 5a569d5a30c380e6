//! Applying the cleaner and validator across a file tree
//!
//! Files are independent: each one is read, processed and (when cleaning)
//! written back on its own, and a failure on one file is recorded in the
//! report instead of stopping the walk. Reports are always ordered by path.

use crate::clean::clean;
use crate::error::{NotebookError, Result};
use crate::ipynb::{parse_notebook, write_notebook, CellType};
use crate::validate::{Finding, Validator};
use chrono::{DateTime, Utc};
use glob::Pattern;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension identifying notebooks
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Options shared by every walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Notebook file extension, without the dot
    pub extension: String,
    /// Glob patterns for paths to skip, matched against the path relative to
    /// the walked directory and against each of its components
    pub exclude: Vec<String>,
    /// Worker threads; `None` uses the global rayon pool, `Some(1)` runs sequentially
    pub jobs: Option<usize>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            extension: NOTEBOOK_EXTENSION.to_string(),
            exclude: Vec::new(),
            jobs: None,
        }
    }
}

/// What a path argument refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single notebook file
    File(PathBuf),
    /// A directory searched recursively
    Directory(PathBuf),
}

impl Target {
    /// The path as given
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Directory(path) => path,
        }
    }

    /// True for directory targets
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Notebook files covered by this target, in lexical path order
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be searched.
    pub fn files(&self, options: &WalkOptions) -> Result<Vec<PathBuf>> {
        match self {
            Self::File(path) => Ok(vec![path.clone()]),
            Self::Directory(root) => discover_notebooks(root, options),
        }
    }
}

/// Check a path argument before doing any work
///
/// # Errors
///
/// Returns [`NotebookError::Usage`] if the path does not exist or is a file
/// without the notebook extension.
pub fn resolve_target(path: &Path, extension: &str) -> Result<Target> {
    if !path.exists() {
        return Err(NotebookError::Usage(format!(
            "Path '{}' does not exist",
            path.display()
        )));
    }

    if path.is_file() {
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            return Err(NotebookError::Usage(format!(
                "'{}' is not a notebook file",
                path.display()
            )));
        }
        return Ok(Target::File(path.to_path_buf()));
    }

    Ok(Target::Directory(path.to_path_buf()))
}

/// Recursively find notebook files under `root`, sorted by path
///
/// # Errors
///
/// Returns [`NotebookError::Walk`] if `root` is not valid UTF-8 or an exclude
/// pattern is malformed.
pub fn discover_notebooks(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>> {
    let root_str = root
        .to_str()
        .ok_or_else(|| NotebookError::Walk(format!("path is not valid UTF-8: {}", root.display())))?;
    let pattern = format!(
        "{}/**/*.{}",
        Pattern::escape(root_str.trim_end_matches('/')),
        Pattern::escape(&options.extension)
    );
    let excludes = options
        .exclude
        .iter()
        .map(|p| Pattern::new(p).map_err(|e| NotebookError::Walk(format!("bad exclude pattern '{p}': {e}"))))
        .collect::<Result<Vec<_>>>()?;

    let entries = glob::glob(&pattern)
        .map_err(|e| NotebookError::Walk(format!("invalid search pattern '{pattern}': {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                if is_excluded(relative, &excludes) {
                    log::debug!("Excluded {}", path.display());
                } else {
                    files.push(path);
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("Skipping {}: {}", e.path().display(), e.error()),
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn is_excluded(relative: &Path, excludes: &[Pattern]) -> bool {
    excludes.iter().any(|pattern| {
        pattern.matches_path(relative)
            || relative
                .components()
                .any(|c| pattern.matches(&c.as_os_str().to_string_lossy()))
    })
}

/// Run `f` over every file, in parallel unless `jobs` is 1; output keeps input order
fn process_files<T, F>(files: &[PathBuf], jobs: Option<usize>, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Path) -> T + Sync + Send,
{
    match jobs {
        Some(n) if n <= 1 => Ok(files.iter().map(|p| f(p.as_path())).collect()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| NotebookError::Walk(format!("failed to start worker pool: {e}")))?;
            Ok(pool.install(|| files.par_iter().map(|p| f(p.as_path())).collect()))
        }
        None => Ok(files.par_iter().map(|p| f(p.as_path())).collect()),
    }
}

/// Outcome of cleaning one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanStatus {
    /// File rewritten without execution state
    Cleaned,
    /// Dry run: file would have been rewritten
    WouldClean,
    /// Nothing to strip
    AlreadyClean,
    /// Parse or write failure; the file was left as it was (writes go
    /// through a temporary file that replaces the notebook only once complete)
    Failed(String),
}

/// Per-file entry of a [`CleanReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanEntry {
    /// Notebook path
    pub path: PathBuf,
    /// What happened
    pub status: CleanStatus,
    /// Code cells whose outputs were (or would be) emptied
    pub outputs_cleared: usize,
    /// Code cells whose execution counter was (or would be) reset
    pub execution_counts_cleared: usize,
}

impl CleanEntry {
    fn failed(path: &Path, reason: String) -> Self {
        Self {
            path: path.to_path_buf(),
            status: CleanStatus::Failed(reason),
            outputs_cleared: 0,
            execution_counts_cleared: 0,
        }
    }
}

/// Result of cleaning a target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// One entry per notebook, ordered by path
    pub entries: Vec<CleanEntry>,
}

impl CleanReport {
    /// Files that were cleaned, or would be in a dry run
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, CleanStatus::Cleaned | CleanStatus::WouldClean))
            .count()
    }

    /// Files that could not be processed
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, CleanStatus::Failed(_)))
            .count()
    }
}

/// Clean a single notebook file; never returns an error, failures become entries
#[must_use]
pub fn clean_file(path: &Path, dry_run: bool) -> CleanEntry {
    let notebook = match parse_notebook(path) {
        Ok(notebook) => notebook,
        Err(e) => {
            log::debug!("Failed to parse {}: {e}", path.display());
            return CleanEntry::failed(path, e.to_string());
        }
    };

    let outcome = clean(&notebook);
    let status = if !outcome.changed {
        CleanStatus::AlreadyClean
    } else if dry_run {
        CleanStatus::WouldClean
    } else {
        match write_notebook(path, &outcome.document) {
            Ok(()) => CleanStatus::Cleaned,
            Err(e) => {
                log::debug!("Failed to write {}: {e}", path.display());
                return CleanEntry::failed(path, e.to_string());
            }
        }
    };
    log::debug!("{}: {status:?}", path.display());

    CleanEntry {
        path: path.to_path_buf(),
        status,
        outputs_cleared: outcome.outputs_cleared,
        execution_counts_cleared: outcome.execution_counts_cleared,
    }
}

/// Clean every notebook covered by `target`
///
/// # Errors
///
/// Returns an error only if the target cannot be walked; per-file failures
/// are reported as [`CleanStatus::Failed`] entries.
pub fn clean_target(target: &Target, dry_run: bool, options: &WalkOptions) -> Result<CleanReport> {
    let files = target.files(options)?;
    let entries = process_files(&files, options.jobs, |path| clean_file(path, dry_run))?;
    Ok(CleanReport { entries })
}

/// Result of validating a target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Findings per notebook; notebooks without findings are omitted
    pub results: BTreeMap<PathBuf, Vec<Finding>>,
    /// Number of notebooks inspected
    pub files_checked: usize,
}

impl ValidationReport {
    /// True when any notebook produced a finding
    #[must_use]
    pub fn has_findings(&self) -> bool {
        !self.results.is_empty()
    }

    /// Total number of findings across all notebooks
    #[must_use]
    pub fn finding_count(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }
}

/// Validate every notebook covered by `target`
///
/// # Errors
///
/// Returns an error only if the target cannot be walked; unreadable or
/// malformed notebooks show up as findings.
pub fn validate_target(
    target: &Target,
    validator: &Validator,
    options: &WalkOptions,
) -> Result<ValidationReport> {
    let files = target.files(options)?;
    let findings = process_files(&files, options.jobs, |path| {
        let findings = validator.validate_file(path);
        log::debug!("{}: {} finding(s)", path.display(), findings.len());
        findings
    })?;

    let files_checked = files.len();
    let results = files
        .into_iter()
        .zip(findings)
        .filter(|(_, findings)| !findings.is_empty())
        .collect();

    Ok(ValidationReport {
        results,
        files_checked,
    })
}

/// One row of a notebook listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookSummary {
    /// Path relative to the listed directory
    pub path: PathBuf,
    /// File name without extension
    pub name: String,
    /// Name of the containing directory, or `root` for top-level notebooks
    pub category: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time (RFC 3339, UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// Total number of cells
    pub cells: usize,
    /// Number of markdown cells
    pub markdown_cells: usize,
    /// Number of code cells
    pub code_cells: usize,
    /// Whether any code cell carries execution state
    pub dirty: bool,
    /// Why the notebook could not be read, if it could not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn summarize(root: &Path, path: &Path) -> NotebookSummary {
    let relative = path
        .strip_prefix(root)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| path.file_name().map(Path::new))
        .unwrap_or(path)
        .to_path_buf();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let category = relative
        .parent()
        .and_then(Path::file_name)
        .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned());

    let metadata = fs::metadata(path).ok();
    let size = metadata.as_ref().map_or(0, fs::Metadata::len);
    let modified = metadata
        .and_then(|m| m.modified().ok())
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339());

    let mut summary = NotebookSummary {
        path: relative,
        name,
        category,
        size,
        modified,
        cells: 0,
        markdown_cells: 0,
        code_cells: 0,
        dirty: false,
        error: None,
    };

    match parse_notebook(path) {
        Ok(notebook) => {
            summary.cells = notebook.cells.len();
            summary.markdown_cells = notebook.count_cells(&CellType::Markdown);
            summary.code_cells = notebook.count_cells(&CellType::Code);
            summary.dirty = notebook.is_dirty();
        }
        Err(e) => summary.error = Some(e.to_string()),
    }
    summary
}

/// List the notebooks covered by `target`, grouped by category then path
///
/// # Errors
///
/// Returns an error only if the target cannot be walked.
pub fn inventory_target(target: &Target, options: &WalkOptions) -> Result<Vec<NotebookSummary>> {
    let files = target.files(options)?;
    let root = match target {
        Target::Directory(root) => root.as_path(),
        Target::File(path) => path.parent().unwrap_or_else(|| Path::new("")),
    };
    let mut summaries = process_files(&files, options.jobs, |path| summarize(root, path))?;
    summaries.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.path.cmp(&b.path)));
    Ok(summaries)
}
