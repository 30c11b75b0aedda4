//! Error types for patch operations.

use std::path::PathBuf;

/// Errors that can occur while collecting updates or patching a tunables file.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// An update record did not have exactly one comma.
    #[error("malformed input on line {line_number}: expected `name,value`, got {parts} field(s) in {line:?}")]
    MalformedInput {
        /// 1-based position of the record in the input stream.
        line_number: usize,
        /// The offending record, without its line terminator.
        line: String,
        /// Number of comma-separated fields found.
        parts: usize,
    },

    /// Tunables file not found.
    #[error("tunables file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Writing the patched file failed. The original file is left in place.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Target path of the write.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error reading input or the tunables file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for patch operations.
pub type Result<T> = std::result::Result<T, PatchError>;
