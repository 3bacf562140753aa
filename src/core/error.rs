// This module defines the error type for irstage using the thiserror crate. PipelineError
// covers every way a run can stop: an external tool exiting non-zero, a tool that could
// not be launched or located, a destination that already exists when a file is mapped,
// an optimization level outside 0..=3, filesystem and directory-walk failures, invalid
// file filters, nameless paths and misconfigured roots. Each variant carries the paths or names needed
// to act on the message. PipelineResult<T> is the matching Result alias. Every error is
// fatal to the run that produced it; nothing in the crate retries.

//! Error types for irstage.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for pipeline and coverage runs.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{tool} failed ({status}): {diagnostics}")]
    ToolFailed {
        tool: String,
        status: String,
        diagnostics: String,
    },

    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    #[error("invalid optimization level {level}, expected 0..=3")]
    InvalidOptLevel { level: i64 },

    #[error("tool not found: {name} ({reason})")]
    ToolNotFound { name: String, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid file filter '{pattern}': {source}")]
    Filter {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("{} has no file name", path.display())]
    NoFileName { path: PathBuf },

    #[error("{} is not under {}", path.display(), root.display())]
    NotUnderRoot { path: PathBuf, root: PathBuf },

    #[error(
        "output root {} would delete source root {}",
        output_root.display(),
        source_root.display()
    )]
    OverlappingRoots {
        source_root: PathBuf,
        output_root: PathBuf,
    },
}

impl PipelineError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
