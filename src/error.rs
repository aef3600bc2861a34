//! Crate-wide error types.
//!
//! Errors are split by origin so callers can apply the policy table from
//! the specification: configuration errors are fatal before ingest, stat
//! and read errors are logged and drop the offending record, mutation and
//! rollback failures are logged and leave the filesystem in a defined
//! state, and report-write failures are logged and produce a nonzero exit.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by the library API.
#[derive(Debug, Error)]
pub enum DupefindError {
    /// An option value or combination of options is contradictory.
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable description of the contradiction.
        message: String,
    },

    /// `stat`-equivalent metadata lookup failed for a candidate path.
    #[error("failed to read file info on \"{path}\": {source}")]
    Stat {
        /// Path that could not be stat'd.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading file contents for a fingerprint stage failed.
    #[error("failed to read \"{path}\" while fingerprinting: {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A digest primitive behaved inconsistently with its own contract.
    ///
    /// This indicates a programming error, never a transient condition, and
    /// is always treated as fatal.
    #[error("digest primitive failure: {0}")]
    Digest(String),

    /// A destructive mutation (unlink/symlink/hardlink) failed.
    #[error("failed to replace \"{path}\": {source}")]
    Mutation {
        /// Path of the duplicate the action driver tried to replace.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Rolling a failed mutation back to its original state failed.
    ///
    /// The temp file may remain on disk; this is surfaced loudly but never
    /// aborts the run.
    #[error("failed to roll back \"{path}\" from temp \"{temp}\": {source}")]
    Rollback {
        /// Original path that could not be restored.
        path: PathBuf,
        /// Sibling temp path that could not be renamed back.
        temp: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the human-readable results file failed.
    #[error("failed to write results file \"{path}\": {source}")]
    Report {
        /// Destination path for the results file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DupefindError>;
