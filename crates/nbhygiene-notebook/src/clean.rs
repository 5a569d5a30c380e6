//! Stripping of execution state from notebooks
//!
//! Cleaning empties the `outputs` of every code cell, resets every code
//! cell's `execution_count` to `null`, and drops the legacy top-level
//! `execution_count`. Markdown, raw and unknown cells are left alone.

use crate::ipynb::{ExecutionCount, NotebookDocument};

/// Result of cleaning one notebook
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutcome {
    /// The cleaned document
    pub document: NotebookDocument,
    /// Whether anything was stripped
    pub changed: bool,
    /// Number of code cells whose outputs were emptied
    pub outputs_cleared: usize,
    /// Number of code cells whose execution counter was reset
    pub execution_counts_cleared: usize,
    /// Whether a top-level `execution_count` was removed
    pub top_level_count_removed: bool,
}

/// Counters produced by [`clean_in_place`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Number of code cells whose outputs were emptied
    pub outputs_cleared: usize,
    /// Number of code cells whose execution counter was reset
    pub execution_counts_cleared: usize,
    /// Whether a top-level `execution_count` was removed
    pub top_level_count_removed: bool,
}

impl CleanStats {
    /// Whether anything was stripped
    #[inline]
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.outputs_cleared > 0 || self.execution_counts_cleared > 0 || self.top_level_count_removed
    }
}

/// Return a cleaned copy of `notebook`; the input is left untouched
#[must_use = "cleaning returns a new document and does not modify the input"]
pub fn clean(notebook: &NotebookDocument) -> CleanOutcome {
    let mut document = notebook.clone();
    let stats = clean_in_place(&mut document);
    CleanOutcome {
        document,
        changed: stats.changed(),
        outputs_cleared: stats.outputs_cleared,
        execution_counts_cleared: stats.execution_counts_cleared,
        top_level_count_removed: stats.top_level_count_removed,
    }
}

/// Strip execution state from an owned document
pub fn clean_in_place(notebook: &mut NotebookDocument) -> CleanStats {
    let mut stats = CleanStats::default();

    for cell in notebook.cells.iter_mut().filter(|c| c.is_code()) {
        if let Some(outputs) = cell.outputs.as_mut() {
            if !outputs.is_empty() {
                outputs.clear();
                stats.outputs_cleared += 1;
            }
        }
        if cell.execution_count.is_set() {
            cell.execution_count = ExecutionCount::Null;
            stats.execution_counts_cleared += 1;
        }
    }

    if notebook.execution_count.take().is_some() {
        stats.top_level_count_removed = true;
    }

    stats
}
