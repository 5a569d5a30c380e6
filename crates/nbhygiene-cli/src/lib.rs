//! Command-line interface for `nbhygiene` notebook hygiene
//!
//! This crate provides the `nbhygiene` command-line tool that strips
//! execution state from Jupyter notebooks and lints them before they are
//! committed.
//!
//! # Installation
//!
//! ```bash
//! # From source
//! cargo install --path crates/nbhygiene-cli
//!
//! # Or build the binary
//! cargo build --release -p nbhygiene-cli
//! ```
//!
//! # Commands
//!
//! ## `clean` - Strip Outputs
//!
//! ```bash
//! # Clean every notebook under notebooks/
//! nbhygiene clean
//!
//! # Show what would change without writing
//! nbhygiene clean analysis/ --dry-run
//!
//! # Clean a single notebook
//! nbhygiene clean analysis/report.ipynb
//! ```
//!
//! ## `validate` - Lint Notebooks
//!
//! ```bash
//! # Report issues, exit 0
//! nbhygiene validate notebooks/
//!
//! # Exit 1 when any issue is found (pre-commit hooks, CI)
//! nbhygiene validate notebooks/ --strict
//!
//! # Machine-readable report
//! nbhygiene validate notebooks/ --json
//! ```
//!
//! ## `list` - Notebook Inventory
//!
//! ```bash
//! nbhygiene list notebooks/
//! nbhygiene list notebooks/ --json
//! ```
//!
//! ## `config` - Configuration Management
//!
//! ```bash
//! nbhygiene config init      # Create .nbhygiene.toml
//! nbhygiene config show      # Display effective configuration
//! nbhygiene config path      # Show configuration file locations
//! ```
//!
//! ## `completion` - Shell Completions
//!
//! ```bash
//! nbhygiene completion bash > ~/.bash_completion.d/nbhygiene
//! ```
//!
//! # Global Options
//!
//! - `-q, --quiet` - Suppress all output except errors
//! - `-v, --verbose` - Per-file details and debug logging
//! - `--config FILE` - Use this configuration file instead of discovery
//!
//! Log output goes to stderr and can be tuned with `RUST_LOG`.
//!
//! # Configuration
//!
//! Settings are read from `~/.nbhygiene.toml` and `./.nbhygiene.toml`
//! (the project file wins); command-line flags override both. See
//! [`config`] for the file format.
//!
//! # Exit Codes
//!
//! - `0` - Success
//! - `1` - Path error, failed clean, or findings under `--strict`
//! - `2` - Invalid arguments

/// `.nbhygiene.toml` loading and merging
pub mod config;
/// Exit codes
pub mod exit_codes;
/// Text and JSON rendering of walk reports
pub mod report;
