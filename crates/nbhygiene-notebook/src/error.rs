//! Error types for notebook cleaning and validation

use std::path::PathBuf;
use thiserror::Error;

/// Error type for notebook operations
#[derive(Error, Debug)]
pub enum NotebookError {
    /// I/O error when reading or writing a notebook file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File the operation was acting on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON that does not have the shape of a notebook
    #[error("Invalid notebook format: {0}")]
    InvalidFormat(String),

    /// Bad path argument (missing path, non-notebook file)
    #[error("{0}")]
    Usage(String),

    /// Directory traversal failure or malformed exclude pattern
    #[error("Failed to walk notebooks: {0}")]
    Walk(String),
}

impl NotebookError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the document content rather than the filesystem
    #[inline]
    #[must_use]
    pub const fn is_format_error(&self) -> bool {
        matches!(self, Self::Json(_) | Self::InvalidFormat(_))
    }
}

/// Result type alias for notebook operations
pub type Result<T> = std::result::Result<T, NotebookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_classification() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(NotebookError::from(json_err).is_format_error());
        assert!(NotebookError::InvalidFormat("no cells".into()).is_format_error());
        assert!(!NotebookError::Usage("bad".into()).is_format_error());

        let io = NotebookError::io(
            "a.ipynb",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!io.is_format_error());
        assert!(io.to_string().contains("a.ipynb"));
    }
}
