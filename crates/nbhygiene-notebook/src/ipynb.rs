use crate::error::{NotebookError, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// In-memory notebook document
///
/// Only the fields the cleaner and validator reason about are lifted out of
/// the JSON; everything else is carried in `extra` and written back as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotebookDocument {
    /// Cells in presentation order
    pub cells: Vec<NotebookCell>,
    /// Legacy top-level `execution_count` field, kept as whatever value it held
    pub execution_count: Option<Value>,
    /// All other top-level fields (`metadata`, `nbformat`, unknown keys)
    pub extra: Map<String, Value>,
}

/// Individual notebook cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotebookCell {
    /// Type of cell; `None` when the `cell_type` field is absent or not a string
    pub cell_type: Option<CellType>,
    /// Cell source; `None` when absent or malformed
    pub source: Option<Source>,
    /// Output records of a code cell, never inspected
    pub outputs: Option<Vec<Value>>,
    /// Execution counter of a code cell
    pub execution_count: ExecutionCount,
    /// All other cell fields (`metadata`, `id`, `attachments`, unknown keys)
    pub extra: Map<String, Value>,
}

/// Type of notebook cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Executable code cell
    Code,
    /// Markdown documentation cell
    Markdown,
    /// Raw text cell (no formatting)
    Raw,
    /// Any other `cell_type` string, preserved verbatim
    Other(String),
}

impl CellType {
    /// The `cell_type` string as stored in the file
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Raw => "raw",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for CellType {
    fn from(name: &str) -> Self {
        match name {
            "code" => Self::Code,
            "markdown" => Self::Markdown,
            "raw" => Self::Raw,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for CellType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cell source in either of the two shapes nbformat allows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A single string
    Text(String),
    /// A list of lines, each usually ending in `\n`
    Lines(Vec<String>),
}

impl Source {
    /// Source as one string (lines concatenated without separator)
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Lines(lines) => Cow::Owned(lines.concat()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Lines(lines) => Value::Array(lines.iter().cloned().map(Value::String).collect()),
        }
    }
}

/// State of a code cell's `execution_count` field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExecutionCount {
    /// Field not present
    #[default]
    Absent,
    /// Present and `null` (never executed)
    Null,
    /// Present with a counter value
    Count(i64),
    /// Present with a non-null value that is not an integer counter
    /// (`"5"`, `3.0`, out-of-range numbers); still execution state
    Other(Value),
}

impl ExecutionCount {
    /// True when the cell has been executed
    #[inline]
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Count(_) | Self::Other(_))
    }
}

impl NotebookCell {
    /// Create a markdown cell
    #[must_use]
    pub fn markdown(source: impl Into<String>) -> Self {
        Self {
            cell_type: Some(CellType::Markdown),
            source: Some(Source::Text(source.into())),
            extra: empty_metadata(),
            ..Self::default()
        }
    }

    /// Create an unexecuted code cell
    #[must_use]
    pub fn code(source: impl Into<String>) -> Self {
        Self {
            cell_type: Some(CellType::Code),
            source: Some(Source::Text(source.into())),
            outputs: Some(Vec::new()),
            execution_count: ExecutionCount::Null,
            extra: empty_metadata(),
        }
    }

    /// Attach output records (code cells)
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<Value>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Set the execution counter (code cells)
    #[must_use]
    pub fn with_execution_count(mut self, count: i64) -> Self {
        self.execution_count = ExecutionCount::Count(count);
        self
    }

    /// Joined source text; empty when the cell has no source
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        self.source.as_ref().map_or(Cow::Borrowed(""), Source::text)
    }

    /// True for code cells
    #[inline]
    #[must_use]
    pub fn is_code(&self) -> bool {
        self.cell_type == Some(CellType::Code)
    }

    /// True for markdown cells
    #[inline]
    #[must_use]
    pub fn is_markdown(&self) -> bool {
        self.cell_type == Some(CellType::Markdown)
    }

    /// A code cell that carries outputs or an execution counter
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.is_code()
            && (self.outputs.as_ref().is_some_and(|o| !o.is_empty())
                || self.execution_count.is_set())
    }

    fn from_json(index: usize, value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(NotebookError::InvalidFormat(format!(
                "cell {index} is not a JSON object"
            )));
        };

        let cell_type = take_field(&mut map, "cell_type", |v| match v {
            Value::String(name) => Ok(CellType::from(name.as_str())),
            other => Err(other),
        });

        let source = take_field(&mut map, "source", |v| match v {
            Value::String(text) => Ok(Source::Text(text)),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(Source::Lines(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(line) => Some(line),
                        _ => None,
                    })
                    .collect(),
            )),
            other => Err(other),
        });

        // Non-code cells keep any stray outputs in `extra` so cleaning never touches them
        let (outputs, execution_count) = if cell_type == Some(CellType::Code) {
            let outputs = take_field(&mut map, "outputs", |v| match v {
                Value::Array(items) => Ok(items),
                other => Err(other),
            });
            let execution_count = take_field(&mut map, "execution_count", |v| {
                Ok::<_, Value>(match v {
                    Value::Null => ExecutionCount::Null,
                    Value::Number(n) => match n.as_i64() {
                        Some(count) => ExecutionCount::Count(count),
                        None => ExecutionCount::Other(Value::Number(n)),
                    },
                    other => ExecutionCount::Other(other),
                })
            })
            .unwrap_or_default();
            (outputs, execution_count)
        } else {
            (None, ExecutionCount::Absent)
        };

        Ok(Self {
            cell_type,
            source,
            outputs,
            execution_count,
            extra: map,
        })
    }

    fn to_json(&self) -> Value {
        let mut map = self.extra.clone();
        if let Some(cell_type) = &self.cell_type {
            map.insert("cell_type".into(), Value::String(cell_type.as_str().into()));
        }
        if let Some(source) = &self.source {
            map.insert("source".into(), source.to_json());
        }
        if let Some(outputs) = &self.outputs {
            map.insert("outputs".into(), Value::Array(outputs.clone()));
        }
        match &self.execution_count {
            ExecutionCount::Absent => {}
            ExecutionCount::Null => {
                map.insert("execution_count".into(), Value::Null);
            }
            ExecutionCount::Count(n) => {
                map.insert("execution_count".into(), Value::from(*n));
            }
            ExecutionCount::Other(value) => {
                map.insert("execution_count".into(), value.clone());
            }
        }
        Value::Object(map)
    }
}

impl NotebookDocument {
    /// Create an nbformat 4.5 document holding `cells`
    #[must_use]
    pub fn new(cells: Vec<NotebookCell>) -> Self {
        let mut extra = Map::new();
        extra.insert("metadata".into(), Value::Object(Map::new()));
        extra.insert("nbformat".into(), Value::from(4));
        extra.insert("nbformat_minor".into(), Value::from(5));
        Self {
            cells,
            execution_count: None,
            extra,
        }
    }

    /// `(nbformat, nbformat_minor)` when both are present
    #[must_use]
    pub fn nbformat_version(&self) -> Option<(u64, u64)> {
        let major = self.extra.get("nbformat")?.as_u64()?;
        let minor = self.extra.get("nbformat_minor")?.as_u64()?;
        Some((major, minor))
    }

    /// Number of cells of the given type
    #[must_use]
    pub fn count_cells(&self, cell_type: &CellType) -> usize {
        self.cells
            .iter()
            .filter(|c| c.cell_type.as_ref() == Some(cell_type))
            .count()
    }

    /// True when any code cell carries outputs or an execution counter
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.cells.iter().any(NotebookCell::is_dirty)
    }

    /// Build a document from an already-parsed JSON value
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::InvalidFormat`] if the value is not an object,
    /// has no `cells` array, or contains a cell that is not an object.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(NotebookError::InvalidFormat(
                "top-level value is not a JSON object".to_string(),
            ));
        };

        let cells = match map.remove("cells") {
            Some(Value::Array(cells)) => cells
                .into_iter()
                .enumerate()
                .map(|(i, cell)| NotebookCell::from_json(i, cell))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(NotebookError::InvalidFormat(
                    "'cells' should be a list".to_string(),
                ))
            }
            None => {
                return Err(NotebookError::InvalidFormat(
                    "missing 'cells' key".to_string(),
                ))
            }
        };

        let execution_count = map.remove("execution_count");

        Ok(Self {
            cells,
            execution_count,
            extra: map,
        })
    }

    /// Convert back into a JSON value
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert(
            "cells".into(),
            Value::Array(self.cells.iter().map(NotebookCell::to_json).collect()),
        );
        if let Some(count) = &self.execution_count {
            map.insert("execution_count".into(), count.clone());
        }
        Value::Object(map)
    }

    /// Canonical serialization: sorted keys, 2-space indent, literal
    /// non-ASCII, trailing newline
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_canonical_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"  "));
        Canonical(&self.to_json()).serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Canonical serialization as a string
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_canonical_string(&self) -> Result<String> {
        let bytes = self.to_canonical_vec()?;
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Serializes a JSON value with object keys sorted at every depth
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut state = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    state.serialize_entry(key, &Canonical(value))?;
                }
                state.end()
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical)),
            other => other.serialize(serializer),
        }
    }
}

/// Remove `key` from `map` if `extract` accepts its value; otherwise leave it in place
fn take_field<T>(
    map: &mut Map<String, Value>,
    key: &str,
    extract: impl FnOnce(Value) -> std::result::Result<T, Value>,
) -> Option<T> {
    let value = map.remove(key)?;
    match extract(value) {
        Ok(field) => Some(field),
        Err(original) => {
            map.insert(key.to_string(), original);
            None
        }
    }
}

fn empty_metadata() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("metadata".into(), Value::Object(Map::new()));
    map
}

/// Parse a Jupyter Notebook from a file path
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (I/O error)
/// - The notebook JSON is malformed or lacks a `cells` array
#[must_use = "this function returns a parsed notebook that should be processed"]
pub fn parse_notebook<P: AsRef<Path>>(path: P) -> Result<NotebookDocument> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|e| NotebookError::io(path, e))?;
    parse_notebook_from_slice(&content)
}

/// Parse a Jupyter Notebook from raw bytes
///
/// # Errors
///
/// Returns an error if the notebook JSON is malformed or lacks a `cells` array.
#[must_use = "this function returns a parsed notebook that should be processed"]
pub fn parse_notebook_from_slice(content: &[u8]) -> Result<NotebookDocument> {
    let value: Value = serde_json::from_slice(content)?;
    NotebookDocument::from_json(value)
}

/// Parse a Jupyter Notebook from a string
///
/// # Errors
///
/// Returns an error if the notebook JSON is malformed or lacks a `cells` array.
#[must_use = "this function returns a parsed notebook that should be processed"]
pub fn parse_notebook_from_str(content: &str) -> Result<NotebookDocument> {
    parse_notebook_from_slice(content.as_bytes())
}

/// Write a notebook to `path` in canonical form
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written.
pub fn write_notebook<P: AsRef<Path>>(path: P, notebook: &NotebookDocument) -> Result<()> {
    let path = path.as_ref();
    let bytes = notebook.to_canonical_vec()?;

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(parent).map_err(|e| NotebookError::io(path, e))?;
    if let Ok(metadata) = fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| NotebookError::io(path, e))?;
    }
    file.write_all(&bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| NotebookError::io(path, e))?;
    file.persist(path)
        .map_err(|e| NotebookError::io(path, e.error))?;
    Ok(())
}
