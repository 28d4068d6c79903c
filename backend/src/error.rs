//! Error types for the statjoin decode-and-join pipeline.
//!
//! Errors are split by layer and rolled up into [`JobError`]:
//!
//! - [`DecodeError`] - malformed JSON-stat / SDMX structure (fatal)
//! - [`SourceError`] - HTTP or file transport failures
//! - [`TransformRuleError`] - unreadable transform rule definitions
//! - [`GeographyError`] - geography provider failures (recoverable per row)
//! - [`SinkError`] - output container failures (fatal)
//! - [`WorkspaceError`] - job working directory / intermediate file failures
//! - [`JobError`] - top-level orchestration errors
//!
//! Per-row and per-file recoverable outcomes are not errors at all: see
//! [`crate::cache::Resolution`] and [`crate::transform::pipeline::FileOutcome`].

use std::path::PathBuf;
use thiserror::Error;

pub use crate::parser::CsvError;

// =============================================================================
// Decode Errors
// =============================================================================

/// Structural errors while decoding a cube or an SDMX response.
///
/// Any of these means the upstream schema is not what we expect, so the
/// whole decode is abandoned rather than skipping a row.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON or does not match the expected shape.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// An expected nested member is missing.
    #[error("Missing '{0}' in payload")]
    MissingMember(String),

    /// Category indices of a dimension are not unique and contiguous from 0.
    #[error("Dimension '{dimension}' has non-contiguous category indices: {message}")]
    CategoryIndex { dimension: String, message: String },

    /// Declared dimension size disagrees with its category count.
    #[error("Dimension '{dimension}' declares size {declared} but has {actual} categories")]
    SizeMismatch {
        dimension: String,
        declared: usize,
        actual: usize,
    },

    /// The join dimension could not be found by label.
    #[error("No dimension labelled '{0}'")]
    JoinDimensionNotFound(String),

    /// A composite observation key could not be parsed.
    #[error("Invalid observation key '{key}': {message}")]
    InvalidKey { key: String, message: String },

    /// Two dimensions declare the same key position, or a position is absent.
    #[error("Invalid key positions: {0}")]
    KeyPosition(String),

    /// A category index points outside the dimension or attribute value list.
    #[error("Index {index} out of range for '{id}' ({len} values)")]
    IndexOutOfRange { id: String, index: usize, len: usize },

    /// A TIME_PERIOD label could not be read as a calendar period.
    #[error("Cannot parse time period '{0}'")]
    TimePeriod(String),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors fetching a payload from an upstream source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body was not JSON.
    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    /// Failed to read a local request body or payload file.
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Transform Rule Errors
// =============================================================================

/// Errors loading transform rules.
#[derive(Debug, Error)]
pub enum TransformRuleError {
    /// A `FIND=REPLACE` argument had no `=`.
    #[error("Invalid rule '{0}', expected FIND=REPLACE")]
    InvalidRule(String),

    /// Rule file could not be read.
    #[error("Rule file error: {0}")]
    File(#[from] csv::Error),
}

// =============================================================================
// Geography Errors
// =============================================================================

/// Errors from a geography provider.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// The geography store could not be opened.
    #[error("Failed to open geography source {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// A single lookup query failed. Recoverable: the row gets no geometry.
    #[error("Query {predicate} failed: {message}")]
    Query { predicate: String, message: String },
}

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors from the output sink. Always fatal for the job.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink used before `create`.
    #[error("Sink has not been created")]
    NotCreated,

    /// Field creation failed.
    #[error("Failed to add field '{name}': {message}")]
    AddField { name: String, message: String },

    /// A record was rejected on insert.
    #[error("Record {row} rejected: {message}")]
    Rejected { row: usize, message: String },

    /// Failed writing the output.
    #[error("Sink IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed serializing the output.
    #[error("Sink JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Workspace Errors
// =============================================================================

/// Errors managing the job working directory and intermediate files.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// IO error on the working directory.
    #[error("Workspace IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed writing the intermediate CSV.
    #[error("Intermediate CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Job Errors (top-level)
// =============================================================================

/// Top-level job error. Anything surfacing as a `JobError` aborts the job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Decode error.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Source error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// CSV source error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Transform rule error.
    #[error("Transform rule error: {0}")]
    Rules(#[from] TransformRuleError),

    /// Geography provider could not be opened.
    #[error("Geography error: {0}")]
    Geography(#[from] GeographyError),

    /// Sink error.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Workspace error.
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Join field not present in the decoded fields.
    #[error("Join field '{0}' not found in decoded fields")]
    JoinFieldNotFound(String),

    /// Batch folder could not be listed.
    #[error("Cannot read folder {path}: {source}")]
    Folder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;
