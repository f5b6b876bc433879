//! Error types for the `giffler` crate.
//!
//! This module defines [`GifflerError`], the unified error type returned by
//! every fallible operation in the crate. Each variant names the pipeline
//! stage that failed and carries the upstream detail (paths, exit status,
//! the tail of the child's stderr).

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

/// The unified error type for all `giffler` operations.
///
/// None of these are retried: every variant is terminal for the job that
/// produced it, and the pipeline always removes its workspace before
/// handing one back.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GifflerError {
    /// Required configuration is missing or an option is out of range.
    ///
    /// Raised before any side effect; no workspace has been created.
    #[error("{0}")]
    Configuration(String),

    /// The scratch directory could not be created or removed.
    #[error("Could not prepare workspace at {path}: {source}")]
    Workspace {
        /// The workspace directory that was being prepared.
        path: PathBuf,
        /// Underlying I/O failure.
        source: IoError,
    },

    /// The frame-extraction program failed or could not be spawned.
    #[error("Frame extraction failed: {0}")]
    Extraction(String),

    /// The frame-assembly program failed or could not be spawned.
    #[error("convert error: {0}")]
    Assembly(String),

    /// The assembled file could not be moved to the output path.
    #[error("Could not write output to {path}: {source}")]
    Output {
        /// The requested output path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: IoError,
    },

    /// The job was interrupted via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl GifflerError {
    /// Shorthand for a [`GifflerError::Configuration`] with the given message.
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        GifflerError::Configuration(message.into())
    }

    /// Returns `true` if this error came from an interrupt rather than a
    /// failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GifflerError::Cancelled)
    }
}
