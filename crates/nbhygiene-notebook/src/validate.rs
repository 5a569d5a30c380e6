//! Notebook linting
//!
//! The validator never modifies a document. All checks run on every notebook
//! and findings are reported in a fixed order: structure, per-cell checks (by
//! cell index), markdown/code balance, leftover outputs, leading markdown
//! cell, long code cells.
//!
//! The import-order and secret checks are textual heuristics over the raw
//! cell source. They are expected to produce both false positives and false
//! negatives.

use crate::error::{NotebookError, Result};
use crate::ipynb::{parse_notebook_from_slice, CellType, NotebookCell, NotebookDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default line limit for a single code cell
pub const DEFAULT_MAX_CODE_CELL_LINES: usize = 50;

/// Default minimum length of a quoted alphanumeric literal flagged as a secret
pub const DEFAULT_SECRET_MIN_LENGTH: usize = 20;

static DEFAULT_SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    secret_pattern(DEFAULT_SECRET_MIN_LENGTH).expect("default secret pattern is valid")
});

fn secret_pattern(min_length: usize) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(r#"["'][a-zA-Z0-9]{{{min_length},}}["']"#))
}

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory issue; every current check reports at this level
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// Which check produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// The file is not a parseable notebook
    FormatError,
    /// The file could not be read
    ReadError,
    /// The notebook has no cells
    NoCells,
    /// A cell has no `cell_type`
    MissingCellType,
    /// A markdown cell has only whitespace
    EmptyMarkdownCell,
    /// A code cell has only whitespace
    EmptyCodeCell,
    /// An import line follows other code in the same cell
    ImportAfterCode,
    /// A code cell contains a long quoted alphanumeric literal
    PossibleSecret,
    /// Code cells exist but no markdown cells
    NoMarkdownCells,
    /// Some code cell carries outputs or an execution counter
    ContainsOutputs,
    /// The first cell is not markdown
    FirstCellNotMarkdown,
    /// A code cell exceeds the line limit
    LongCodeCell,
}

/// One issue reported by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity level
    pub severity: Severity,
    /// Check that produced the finding
    pub kind: FindingKind,
    /// Index of the offending cell, for per-cell checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_index: Option<usize>,
    /// Human-readable description
    pub message: String,
}

impl Finding {
    fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            cell_index: None,
            message: message.into(),
        }
    }

    fn cell_warning(kind: FindingKind, index: usize, message: impl Into<String>) -> Self {
        Self {
            cell_index: Some(index),
            ..Self::warning(kind, message)
        }
    }

    /// Finding standing in for a notebook that failed to parse
    #[must_use]
    pub fn format_error(error: &NotebookError) -> Self {
        Self::warning(FindingKind::FormatError, error.to_string())
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell_index {
            Some(index) => write!(f, "Cell {index}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Tunable thresholds for the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Code cells with more `\n`-separated segments than this are flagged
    pub max_code_cell_lines: usize,
    /// Minimum run of alphanumerics between quotes treated as a secret
    pub secret_min_length: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_code_cell_lines: DEFAULT_MAX_CODE_CELL_LINES,
            secret_min_length: DEFAULT_SECRET_MIN_LENGTH,
        }
    }
}

/// Notebook validator
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    secret_pattern: Regex,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            config: ValidatorConfig::default(),
            secret_pattern: DEFAULT_SECRET_PATTERN.clone(),
        }
    }
}

impl Validator {
    /// Create a validator with custom thresholds
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Usage`] if `secret_min_length` is zero or
    /// too large to compile into a pattern.
    pub fn with_config(config: ValidatorConfig) -> Result<Self> {
        if config.secret_min_length == 0 {
            return Err(NotebookError::Usage(
                "secret_min_length must be at least 1".to_string(),
            ));
        }
        let secret_pattern = secret_pattern(config.secret_min_length).map_err(|e| {
            NotebookError::Usage(format!(
                "secret_min_length {} is not usable: {e}",
                config.secret_min_length
            ))
        })?;
        Ok(Self {
            config,
            secret_pattern,
        })
    }

    /// Active thresholds
    #[must_use]
    pub const fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run every check against a parsed notebook
    #[must_use]
    pub fn validate(&self, notebook: &NotebookDocument) -> Vec<Finding> {
        let mut findings = Vec::new();

        if notebook.cells.is_empty() {
            findings.push(Finding::warning(FindingKind::NoCells, "Notebook has no cells"));
        }

        let mut markdown_cells = 0;
        let mut code_cells = 0;
        for (index, cell) in notebook.cells.iter().enumerate() {
            match &cell.cell_type {
                // A present but non-string cell_type is not "missing"
                None if cell.extra.contains_key("cell_type") => {}
                None => findings.push(Finding::cell_warning(
                    FindingKind::MissingCellType,
                    index,
                    "Missing cell_type",
                )),
                Some(CellType::Markdown) => {
                    markdown_cells += 1;
                    if cell.text().trim().is_empty() {
                        findings.push(Finding::cell_warning(
                            FindingKind::EmptyMarkdownCell,
                            index,
                            "Empty markdown cell",
                        ));
                    }
                }
                Some(CellType::Code) => {
                    code_cells += 1;
                    self.check_code_cell(index, cell, &mut findings);
                }
                Some(_) => {}
            }
        }

        if code_cells > 0 && markdown_cells == 0 {
            findings.push(Finding::warning(
                FindingKind::NoMarkdownCells,
                "No markdown cells found - consider adding documentation",
            ));
        }

        if notebook.is_dirty() {
            findings.push(Finding::warning(
                FindingKind::ContainsOutputs,
                "Notebook contains outputs - consider cleaning before commit",
            ));
        }

        if notebook.cells.first().is_some_and(|c| !c.is_markdown()) {
            findings.push(Finding::warning(
                FindingKind::FirstCellNotMarkdown,
                "Consider starting with a markdown cell explaining the notebook",
            ));
        }

        for (index, cell) in notebook.cells.iter().enumerate() {
            if cell.is_code() && line_count(&cell.text()) > self.config.max_code_cell_lines {
                findings.push(Finding::cell_warning(
                    FindingKind::LongCodeCell,
                    index,
                    "Very long code cell - consider breaking it up",
                ));
            }
        }

        findings
    }

    /// Parse and validate raw notebook bytes
    ///
    /// A document that fails to parse yields exactly one
    /// [`FindingKind::FormatError`] finding.
    #[must_use]
    pub fn validate_bytes(&self, content: &[u8]) -> Vec<Finding> {
        match parse_notebook_from_slice(content) {
            Ok(notebook) => self.validate(&notebook),
            Err(e) => vec![Finding::format_error(&e)],
        }
    }

    /// Read, parse and validate a notebook file
    ///
    /// An unreadable file yields exactly one [`FindingKind::ReadError`] finding.
    #[must_use]
    pub fn validate_file<P: AsRef<Path>>(&self, path: P) -> Vec<Finding> {
        match fs::read(path.as_ref()) {
            Ok(content) => self.validate_bytes(&content),
            Err(e) => vec![Finding::warning(
                FindingKind::ReadError,
                format!("Error reading file: {e}"),
            )],
        }
    }

    fn check_code_cell(&self, index: usize, cell: &NotebookCell, findings: &mut Vec<Finding>) {
        let source = cell.text();

        if source.trim().is_empty() {
            findings.push(Finding::cell_warning(
                FindingKind::EmptyCodeCell,
                index,
                "Empty code cell",
            ));
            return;
        }

        if has_import_after_code(&source) {
            findings.push(Finding::cell_warning(
                FindingKind::ImportAfterCode,
                index,
                "Import statement after other code",
            ));
        }

        if self.secret_pattern.is_match(&source) {
            findings.push(Finding::cell_warning(
                FindingKind::PossibleSecret,
                index,
                "Possible hardcoded API key or secret",
            ));
        }
    }
}

/// Number of `\n`-separated segments, counting a trailing empty one
fn line_count(source: &str) -> usize {
    source.split('\n').count()
}

fn is_import_line(line: &str) -> bool {
    line.starts_with("import") || line.starts_with("from")
}

/// Line-order heuristic: an `import`/`from` line after a line of other code.
///
/// Only looks at cells whose text contains both `import` and `from`.
fn has_import_after_code(source: &str) -> bool {
    if !(source.contains("import") && source.contains("from")) {
        return false;
    }

    let mut code_seen = false;
    for line in source.split('\n').map(str::trim) {
        if !line.is_empty() && !line.starts_with('#') && !is_import_line(line) {
            code_seen = true;
        } else if code_seen && is_import_line(line) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipynb::parse_notebook_from_str;
    use serde_json::json;

    fn kinds(findings: &[Finding]) -> Vec<FindingKind> {
        findings.iter().map(|f| f.kind).collect()
    }

    fn documented(code: &str) -> NotebookDocument {
        NotebookDocument::new(vec![
            NotebookCell::markdown("# Notes"),
            NotebookCell::code(code),
        ])
    }

    #[test]
    fn test_empty_notebook_single_finding() {
        let findings = Validator::default().validate(&NotebookDocument::new(Vec::new()));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::NoCells);
        assert_eq!(findings[0].to_string(), "Notebook has no cells");
        assert_eq!(findings[0].cell_index, None);
    }

    #[test]
    fn test_clean_documented_notebook_has_no_findings() {
        let findings = Validator::default().validate(&documented("import os\nprint(os.sep)"));
        assert!(findings.is_empty(), "unexpected findings: {findings:?}");
    }

    #[test]
    fn test_code_first_without_markdown() {
        let nb = NotebookDocument::new(vec![NotebookCell::code("x = 1")]);
        let findings = Validator::default().validate(&nb);
        assert_eq!(
            kinds(&findings),
            vec![FindingKind::NoMarkdownCells, FindingKind::FirstCellNotMarkdown]
        );
    }

    #[test]
    fn test_code_first_with_later_markdown() {
        let nb = NotebookDocument::new(vec![
            NotebookCell::code("x = 1"),
            NotebookCell::markdown("explained"),
        ]);
        let findings = Validator::default().validate(&nb);
        assert_eq!(kinds(&findings), vec![FindingKind::FirstCellNotMarkdown]);
    }

    #[test]
    fn test_secret_detection() {
        let findings =
            Validator::default().validate(&documented("api_key = 'abcdefghijklmnopqrstuvwxy'"));
        assert_eq!(kinds(&findings), vec![FindingKind::PossibleSecret]);
        assert_eq!(findings[0].cell_index, Some(1));
        assert_eq!(
            findings[0].to_string(),
            "Cell 1: Possible hardcoded API key or secret"
        );
    }

    #[test]
    fn test_short_or_mixed_literals_are_not_secrets() {
        let v = Validator::default();
        assert!(v.validate(&documented("k = 'abcdefghij123456789'")).is_empty());
        assert!(v.validate(&documented("k = 'abcdefghij-klmnopqrstuvwxyz'")).is_empty());
        assert!(!v.validate(&documented("k = \"ABCDEFGHIJ0123456789\"")).is_empty());
    }

    #[test]
    fn test_import_after_code() {
        let v = Validator::default();
        let flagged = v.validate(&documented("import os\nx = 1\nfrom a import b"));
        assert_eq!(kinds(&flagged), vec![FindingKind::ImportAfterCode]);
        assert_eq!(flagged[0].to_string(), "Cell 1: Import statement after other code");

        assert!(v
            .validate(&documented("import os\nfrom a import b\nx = 1"))
            .is_empty());
        assert!(v
            .validate(&documented("# from the docs\nimport os\nprint(os)"))
            .is_empty());
    }

    #[test]
    fn test_import_check_requires_both_keywords() {
        // No `from` anywhere in the cell, so the heuristic does not run
        let findings = Validator::default().validate(&documented("x = 1\nimport os"));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_import_heuristic_false_positive_is_kept() {
        let findings =
            Validator::default().validate(&documented("x = 1  # taken from below\nimport os"));
        assert_eq!(kinds(&findings), vec![FindingKind::ImportAfterCode]);
    }

    #[test]
    fn test_empty_cells() {
        let nb = NotebookDocument::new(vec![
            NotebookCell::markdown("  \n"),
            NotebookCell::code("\n\t"),
        ]);
        let findings = Validator::default().validate(&nb);
        assert_eq!(
            kinds(&findings),
            vec![FindingKind::EmptyMarkdownCell, FindingKind::EmptyCodeCell]
        );
        assert_eq!(findings[0].to_string(), "Cell 0: Empty markdown cell");
        assert_eq!(findings[1].to_string(), "Cell 1: Empty code cell");
    }

    #[test]
    fn test_empty_code_cell_skips_other_cell_checks() {
        let findings = Validator::default().validate(&documented("   "));
        assert_eq!(kinds(&findings), vec![FindingKind::EmptyCodeCell]);
    }

    #[test]
    fn test_outputs_reported_once() {
        let nb = NotebookDocument::new(vec![
            NotebookCell::markdown("# Run"),
            NotebookCell::code("1").with_outputs(vec![json!({})]),
            NotebookCell::code("2").with_execution_count(2),
        ]);
        let findings = Validator::default().validate(&nb);
        assert_eq!(kinds(&findings), vec![FindingKind::ContainsOutputs]);
    }

    #[test]
    fn test_long_code_cell_boundary() {
        let v = Validator::default();
        let fifty = vec!["x"; 50].join("\n");
        assert!(v.validate(&documented(&fifty)).is_empty());

        // A trailing newline adds an empty 51st segment
        let trailing = format!("{fifty}\n");
        let findings = v.validate(&documented(&trailing));
        assert_eq!(kinds(&findings), vec![FindingKind::LongCodeCell]);
        assert_eq!(findings[0].cell_index, Some(1));
    }

    #[test]
    fn test_custom_thresholds() {
        let v = Validator::with_config(ValidatorConfig {
            max_code_cell_lines: 2,
            secret_min_length: 5,
        })
        .unwrap();
        let findings = v.validate(&documented("a = 'abcde'\nb\nc"));
        assert_eq!(
            kinds(&findings),
            vec![FindingKind::PossibleSecret, FindingKind::LongCodeCell]
        );
        assert!(Validator::with_config(ValidatorConfig {
            max_code_cell_lines: 2,
            secret_min_length: 0,
        })
        .is_err());
    }

    #[test]
    fn test_missing_cell_type() {
        let nb = parse_notebook_from_str(r##"{"cells": [{"cell_type": "markdown", "source": "# t"}, {"source": "x"}]}"##)
            .unwrap();
        let findings = Validator::default().validate(&nb);
        assert_eq!(kinds(&findings), vec![FindingKind::MissingCellType]);
        assert_eq!(findings[0].to_string(), "Cell 1: Missing cell_type");
    }

    #[test]
    fn test_non_string_cell_type_is_not_missing() {
        let nb = parse_notebook_from_str(
            r##"{"cells": [{"cell_type": "markdown", "source": "# t"}, {"cell_type": 7, "source": "x"}]}"##,
        )
        .unwrap();
        assert!(Validator::default().validate(&nb).is_empty());
    }

    #[test]
    fn test_string_execution_count_counts_as_output() {
        let nb = parse_notebook_from_str(
            r##"{"cells": [{"cell_type": "markdown", "source": "# t"}, {"cell_type": "code", "source": "x", "outputs": [], "execution_count": "5"}]}"##,
        )
        .unwrap();
        let findings = Validator::default().validate(&nb);
        assert_eq!(kinds(&findings), vec![FindingKind::ContainsOutputs]);
    }

    #[test]
    fn test_raw_first_cell_is_flagged() {
        let nb = parse_notebook_from_str(
            r##"{"cells": [{"cell_type": "raw", "source": "---"}, {"cell_type": "markdown", "source": "# t"}]}"##,
        )
        .unwrap();
        let findings = Validator::default().validate(&nb);
        assert_eq!(kinds(&findings), vec![FindingKind::FirstCellNotMarkdown]);
    }

    #[test]
    fn test_findings_follow_check_order() {
        let mut long = vec!["y = 2"; 60].join("\n");
        long.push_str("\ntoken = 'ABCDEFGHIJKLMNOPQRSTUVWXYZ'");
        let nb = NotebookDocument::new(vec![
            NotebookCell::code(long).with_execution_count(1),
            NotebookCell::code(""),
        ]);
        let findings = Validator::default().validate(&nb);
        assert_eq!(
            kinds(&findings),
            vec![
                FindingKind::PossibleSecret,
                FindingKind::EmptyCodeCell,
                FindingKind::NoMarkdownCells,
                FindingKind::ContainsOutputs,
                FindingKind::FirstCellNotMarkdown,
                FindingKind::LongCodeCell,
            ]
        );
    }

    #[test]
    fn test_validate_bytes_format_error() {
        let findings = Validator::default().validate_bytes(b"{\"cells\": [");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::FormatError);
        assert_eq!(findings[0].cell_index, None);
        assert!(findings[0].message.starts_with("Invalid JSON"));

        let findings = Validator::default().validate_bytes(b"{\"metadata\": {}}");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.starts_with("Invalid notebook format"));
    }

    #[test]
    fn test_validate_missing_file() {
        let findings = Validator::default().validate_file("/no/such/notebook.ipynb");
        assert_eq!(kinds(&findings), vec![FindingKind::ReadError]);
    }

    #[test]
    fn test_finding_json_shape() {
        let finding = Finding::cell_warning(FindingKind::EmptyCodeCell, 3, "Empty code cell");
        assert_eq!(
            serde_json::to_value(&finding).unwrap(),
            json!({"severity": "warning", "kind": "empty_code_cell", "cell_index": 3, "message": "Empty code cell"})
        );
    }
}
