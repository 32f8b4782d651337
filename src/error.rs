//! Error types for rename invocations.
//!
//! Input validation failures ([`CoreError::CorruptArchive`],
//! [`CoreError::MissingColumns`], [`CoreError::UnparseableMapping`],
//! [`CoreError::InvalidName`]) abort an invocation before any rename is
//! attempted. I/O failures while repacking or managing the working area are
//! fatal as well; no partial output archive is ever returned.
//!
//! Per-pair outcomes such as a missing source file or an occupied
//! destination are not errors, see [`RenameOutcome`](crate::RenameOutcome).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for rename operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure of a whole rename invocation
#[derive(Debug, Error)]
pub enum CoreError {
    /// The archive bytes are not a readable ZIP archive.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// A header-based mapping table lacks a required column.
    #[error("mapping table is missing required column(s): {}", .missing.join(", "))]
    MissingColumns { missing: Vec<&'static str> },

    /// The mapping bytes cannot be decoded as the declared format.
    #[error("unparseable mapping table: {0}")]
    UnparseableMapping(String),

    /// A mapping name would escape its directory or is otherwise unusable.
    #[error("invalid name {name:?} in mapping table: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Entry content could not be read back while building the output archive.
    #[error("cannot repack '{}': {source}", .path.display())]
    RepackIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The working area could not be created, written, or released.
    #[error("working area I/O error: {0}")]
    InternalIo(#[from] io::Error),
}

impl CoreError {
    /// Whether the error stems from the caller's inputs rather than I/O
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CoreError::CorruptArchive(_)
                | CoreError::MissingColumns { .. }
                | CoreError::UnparseableMapping(_)
                | CoreError::InvalidName { .. }
        )
    }

    pub(crate) fn corrupt(err: anyhow::Error) -> Self {
        CoreError::CorruptArchive(format!("{err:#}"))
    }

    pub(crate) fn unparseable(err: impl std::fmt::Display) -> Self {
        CoreError::UnparseableMapping(err.to_string())
    }
}
