//! Per-file import orchestration
//!
//! Each uploaded object runs through a fixed sequence of stages:
//!
//! 1. Fetching: download the object and enforce the size ceiling
//! 2. Parsing: dispatch on the file extension and read rows
//! 3. Validating: check every row, collecting row errors
//! 4. Assigning: give valid products an id and a creation time
//! 5. Writing: resolve the destination table and write in chunks
//!
//! and ends in `Done`, or in `Failed` from any stage. Row errors never fail a
//! file on their own; a file with no valid rows does.
//!
//! Files of one event are processed one after another. A failed file does not
//! stop the ones after it; the failures are reported together once every file
//! has been attempted.

use std::fmt;
use std::sync::Arc;

use catalog_common::checksum::{processing_id, sha256_hex};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::{IngestConfig, LimitsConfig};
use crate::error::{EventError, FileFailure, PipelineError, PipelineResult};
use crate::event::{ObjectRef, UploadEvent};
use crate::fetcher::{file_extension, ObjectStore};
use crate::identity::IdentityAssigner;
use crate::models::{ProductInput, RowError};
use crate::parser::{FileFormat, RawRow};
use crate::secrets::TableNameResolver;
use crate::validator::validate_row;
use crate::writer::{dedup_by_id, BatchWriter, RecordStore};

/// Processing stage of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetching,
    Parsing,
    Validating,
    Assigning,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Parsing => "parsing",
            Stage::Validating => "validating",
            Stage::Assigning => "assigning",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Stage tracker for one file; `Done` and `Failed` are terminal.
#[derive(Debug)]
struct FileRun {
    stage: Stage,
}

impl FileRun {
    fn new() -> Self {
        debug!(stage = %Stage::Fetching, "Stage entered");
        Self {
            stage: Stage::Fetching,
        }
    }

    fn advance(&mut self, next: Stage) {
        if matches!(self.stage, Stage::Done | Stage::Failed) {
            return;
        }
        debug!(from = %self.stage, to = %next, "Stage entered");
        self.stage = next;
    }
}

/// Summary of one processed file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub bucket: String,
    pub key: String,
    pub processing_id: String,
    /// SHA-256 of the downloaded bytes
    pub file_hash: String,
    pub total_records: usize,
    pub successful_inserts: usize,
    pub failed_validations: usize,
    /// First row errors, in file order
    pub errors: Vec<RowError>,
    /// `None` for dry runs
    pub table_name: Option<String>,
    pub chunks_written: usize,
    /// Nothing was written; `successful_inserts` counts rows that would be
    pub dry_run: bool,
}

/// Validation result for a parsed file
#[derive(Debug, Clone, PartialEq)]
pub struct RowEvaluation {
    pub total: usize,
    pub valid: Vec<ProductInput>,
    pub failed: usize,
    /// At most `sample_size` errors, in row order
    pub errors: Vec<RowError>,
}

/// Fail with [`PipelineError::FileTooLarge`] above `max` bytes.
pub fn check_file_size(size: usize, max: usize) -> PipelineResult<()> {
    if size > max {
        return Err(PipelineError::FileTooLarge { size, max });
    }
    Ok(())
}

/// Parse `data` with the parser registered for `extension`.
pub fn parse_file(data: &[u8], extension: &str) -> PipelineResult<Vec<RawRow>> {
    let parser = FileFormat::from_extension(extension)?.parser();
    let rows = parser.parse(data)?;
    info!(record_count = rows.len(), format = parser.format_name(), "File parsed");
    Ok(rows)
}

/// Validate every row independently. Row indexes in errors are 1-based.
pub fn evaluate_rows(rows: &[RawRow], sample_size: usize) -> RowEvaluation {
    let mut valid = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();
    let mut failed = 0;

    for (index, row) in rows.iter().enumerate() {
        match validate_row(row) {
            Ok(input) => valid.push(input),
            Err(e) => {
                failed += 1;
                if errors.len() < sample_size {
                    errors.push(RowError {
                        row_index: index + 1,
                        message: e.to_string(),
                    });
                }
            },
        }
    }

    if failed > 0 {
        let sample = serde_json::to_string(&errors).unwrap_or_default();
        warn!(error_count = failed, errors = %sample, "Validation errors found");
    }

    info!(valid_count = valid.len(), error_count = failed, "Validation complete");

    RowEvaluation {
        total: rows.len(),
        valid,
        failed,
        errors,
    }
}

/// Run everything short of identity assignment and writing over bytes that
/// are already in hand.
pub fn dry_run(
    object: &ObjectRef,
    data: &[u8],
    limits: &LimitsConfig,
) -> PipelineResult<ProcessingOutcome> {
    let file_hash = sha256_hex(data);
    check_file_size(data.len(), limits.max_file_size)?;

    let rows = parse_file(data, &file_extension(&object.key))?;
    let evaluation = evaluate_rows(&rows, limits.error_sample_size);
    if evaluation.valid.is_empty() {
        return Err(PipelineError::NoValidRecords {
            total: evaluation.total,
            failed: evaluation.failed,
        });
    }

    Ok(ProcessingOutcome {
        bucket: object.bucket.clone(),
        key: object.key.clone(),
        processing_id: processing_id(&object.bucket, &object.key, Utc::now()),
        file_hash,
        total_records: evaluation.total,
        successful_inserts: evaluation.valid.len(),
        failed_validations: evaluation.failed,
        errors: evaluation.errors,
        table_name: None,
        chunks_written: 0,
        dry_run: true,
    })
}

/// Wires the collaborators of the import pipeline
#[derive(Clone)]
pub struct Orchestrator {
    fetcher: Arc<dyn ObjectStore>,
    writer: BatchWriter,
    table_resolver: TableNameResolver,
    limits: LimitsConfig,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn ObjectStore>,
        record_store: Arc<dyn RecordStore>,
        table_resolver: TableNameResolver,
        config: &IngestConfig,
    ) -> Self {
        Self {
            fetcher,
            writer: BatchWriter::new(record_store, config.limits.batch_size),
            table_resolver,
            limits: config.limits.clone(),
        }
    }

    /// Process every object of `event` in order.
    pub async fn process_event(
        &self,
        event: &UploadEvent,
    ) -> Result<Vec<ProcessingOutcome>, EventError> {
        let objects = event.objects();
        info!(file_count = objects.len(), "Processing upload event");

        let mut completed = Vec::with_capacity(objects.len());
        let mut failures = Vec::new();

        for object in &objects {
            match self.process_file(object).await {
                Ok(outcome) => completed.push(outcome),
                Err(error) => failures.push(FileFailure {
                    bucket: object.bucket.clone(),
                    key: object.key.clone(),
                    error,
                }),
            }
        }

        info!(
            file_count = objects.len(),
            succeeded = completed.len(),
            failed = failures.len(),
            "Upload event processed"
        );

        if failures.is_empty() {
            Ok(completed)
        } else {
            Err(EventError {
                failures,
                completed,
                attempted: objects.len(),
            })
        }
    }

    /// Process one uploaded object from download to write.
    pub async fn process_file(&self, object: &ObjectRef) -> PipelineResult<ProcessingOutcome> {
        let processing_id = processing_id(&object.bucket, &object.key, Utc::now());
        let span = info_span!(
            "process_file",
            bucket = %object.bucket,
            key = %object.key,
            processing_id = %processing_id
        );

        async move {
            info!("Processing file");
            let mut run = FileRun::new();

            match self.run_stages(object, processing_id, &mut run).await {
                Ok(outcome) => {
                    run.advance(Stage::Done);
                    info!(
                        total_records = outcome.total_records,
                        successful_inserts = outcome.successful_inserts,
                        failed_validations = outcome.failed_validations,
                        chunks = outcome.chunks_written,
                        "Processing complete"
                    );
                    Ok(outcome)
                },
                Err(e) => {
                    error!(stage = %run.stage, error = %e, "File processing failed");
                    run.advance(Stage::Failed);
                    Err(e)
                },
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        object: &ObjectRef,
        processing_id: String,
        run: &mut FileRun,
    ) -> PipelineResult<ProcessingOutcome> {
        let data = self.fetcher.get_object(&object.bucket, &object.key).await?;
        let extension = file_extension(&object.key);
        let file_hash = sha256_hex(&data);
        info!(
            size = data.len(),
            extension = %extension,
            hash = %file_hash,
            "File downloaded"
        );
        check_file_size(data.len(), self.limits.max_file_size)?;

        run.advance(Stage::Parsing);
        let rows = parse_file(&data, &extension)?;
        drop(data);

        run.advance(Stage::Validating);
        let evaluation = evaluate_rows(&rows, self.limits.error_sample_size);
        drop(rows);
        if evaluation.valid.is_empty() {
            return Err(PipelineError::NoValidRecords {
                total: evaluation.total,
                failed: evaluation.failed,
            });
        }

        run.advance(Stage::Assigning);
        let records = dedup_by_id(IdentityAssigner::new().assign_all(evaluation.valid));

        run.advance(Stage::Writing);
        let table_name = self.table_resolver.resolve().await?;
        info!(table_name = %table_name, "Table name retrieved");
        let summary = self.writer.write(&table_name, &records).await?;

        Ok(ProcessingOutcome {
            bucket: object.bucket.clone(),
            key: object.key.clone(),
            processing_id,
            file_hash,
            total_records: evaluation.total,
            successful_inserts: summary.written,
            failed_validations: evaluation.failed,
            errors: evaluation.errors,
            table_name: Some(table_name),
            chunks_written: summary.chunks,
            dry_run: false,
        })
    }
}
