//! File-level failures of the import pipeline
//!
//! Row validation problems are not errors at this level; they are collected
//! as [`RowError`](crate::models::RowError)s. Every variant here aborts the
//! file it was raised for.

use thiserror::Error;

/// Failure reported by a key-value store for one batch request
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("batch request rejected: {0}")]
    Request(String),

    #[error("{0} items left unprocessed by the store")]
    Unprocessed(usize),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Object not found: s3://{bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Transient storage error: {0}")]
    TransientStorage(String),

    #[error("File size {size} exceeds maximum {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Malformed file: {0}")]
    MalformedFile(String),

    #[error("No valid products to insert after validation ({failed} of {total} rows rejected)")]
    NoValidRecords { total: usize, failed: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Batch write failed on chunk {chunk} of {total_chunks} ({written} items already written): {source}")]
    Write {
        chunk: usize,
        total_chunks: usize,
        written: usize,
        #[source]
        source: StoreError,
    },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// One file of an event that failed
#[derive(Error, Debug)]
#[error("s3://{bucket}/{key}: {error}")]
pub struct FileFailure {
    pub bucket: String,
    pub key: String,
    #[source]
    pub error: PipelineError,
}

/// Raised after every file of an event was attempted and at least one failed.
///
/// Files that did complete are reported in `completed`; their records stay
/// written.
#[derive(Error, Debug)]
#[error("{} of {attempted} files failed", .failures.len())]
pub struct EventError {
    pub failures: Vec<FileFailure>,
    pub completed: Vec<crate::pipeline::ProcessingOutcome>,
    pub attempted: usize,
}
