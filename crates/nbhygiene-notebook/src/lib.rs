//! # nbhygiene-notebook
//!
//! Keeps Jupyter notebooks (.ipynb) fit for version control.
//!
//! This crate provides:
//! - A lossless document model: cells are typed, every other field is
//!   carried through untouched
//! - Canonical serialization (sorted keys, 2-space indent, literal Unicode)
//!   so rewritten notebooks diff cleanly
//! - A cleaner that strips outputs and execution counters
//! - A validator that reports structural and style issues
//! - Directory walking that applies either across a tree
//!
//! ## Example
//!
//! ```no_run
//! use nbhygiene_notebook::{clean, parse_notebook, write_notebook, Validator};
//!
//! let notebook = parse_notebook("analysis.ipynb")?;
//! for finding in Validator::default().validate(&notebook) {
//!     println!("{finding}");
//! }
//!
//! let outcome = clean(&notebook);
//! if outcome.changed {
//!     write_notebook("analysis.ipynb", &outcome.document)?;
//! }
//! # Ok::<(), nbhygiene_notebook::NotebookError>(())
//! ```

/// Output and execution-count stripping
pub mod clean;
/// Error types for notebook operations
pub mod error;
/// Jupyter notebook (ipynb) document model
pub mod ipynb;
/// Notebook linting
pub mod validate;
/// Directory traversal and batch reports
pub mod walk;

pub use clean::{clean, clean_in_place, CleanOutcome, CleanStats};
pub use error::{NotebookError, Result};
pub use ipynb::{
    parse_notebook, parse_notebook_from_slice, parse_notebook_from_str, write_notebook, CellType,
    ExecutionCount, NotebookCell, NotebookDocument, Source,
};
pub use validate::{Finding, FindingKind, Severity, Validator, ValidatorConfig};
pub use walk::{
    clean_file, clean_target, discover_notebooks, inventory_target, resolve_target, validate_target,
    CleanEntry, CleanReport, CleanStatus, NotebookSummary, Target, ValidationReport, WalkOptions,
    NOTEBOOK_EXTENSION,
};
