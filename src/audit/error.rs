//! Error types for the audit pipeline.
//!
//! Errors fall into three groups that the pipeline treats differently:
//!
//! - [`SetupError`] - invalid run configuration; fatal before any source is touched
//! - [`SourceError`] - a single source could not be probed or read; that source is skipped
//! - [`NormalizeError`] - a single record could not be normalized; that record is skipped

use std::path::PathBuf;

/// Problems with the requested run that abort it before querying.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("Invalid range: start date {start} is after end date {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Account list is empty after removing blank entries")]
    EmptyAccountList,

    #[error("Failed to read account list {path}: {reason}")]
    AccountListUnreadable { path: PathBuf, reason: String },

    #[error("No event kinds selected")]
    NoEventKinds,

    #[error("Unknown event ID {id}")]
    UnknownEventKind { id: u32 },

    #[error("Event ID {id} does not belong to {mode} mode")]
    KindModeMismatch { id: u32, mode: &'static str },

    #[error("Live log not found: {path}")]
    LiveSourceMissing { path: PathBuf },

    #[error("Archive directory not found: {path}")]
    ArchiveDirMissing { path: PathBuf },

    #[error("No {selection} source given: pass --live and/or --archive-dir")]
    NoSourceSelected { selection: &'static str },

    #[error("Invalid UTC offset '{input}': expected +HH:MM or -HH:MM")]
    InvalidOffset { input: String },
}

/// Failures reported by an event source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source reported that nothing matched the predicate.
    #[error("No events were found that match the specified selection criteria")]
    NoMatches,

    #[error("Failed to read {source_id}: {reason}")]
    Read { source_id: String, reason: String },

    #[error("{source_id} contains no events")]
    Empty { source_id: String },

    /// One line could not be decoded. The stream continues after it.
    #[error("{source_id} line {line}: {reason}")]
    BadRecord {
        source_id: String,
        line: usize,
        reason: String,
    },
}

impl SourceError {
    pub fn read(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Read {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn bad_record(source_id: impl Into<String>, line: usize, reason: impl ToString) -> Self {
        Self::BadRecord {
            source_id: source_id.into(),
            line,
            reason: reason.to_string(),
        }
    }
}

/// A single raw record that cannot become a row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("record has no EventID")]
    MissingKind,

    #[error("record has unsupported EventID {0}")]
    UnknownKind(u32),

    #[error("record has no TimeCreated")]
    MissingTimestamp,

    #[error("record has malformed TimeCreated '{0}'")]
    MalformedTimestamp(String),
}
