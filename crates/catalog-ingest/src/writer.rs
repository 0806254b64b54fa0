//! Batched persistence of product records
//!
//! Records are written in chunks of at most [`MAX_BATCH_SIZE`], one request
//! per chunk, in order. A failed chunk stops the write. Chunks already
//! written stay written: there is no rollback across chunks, and a redelivery
//! of the same file writes fresh records again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use chrono::SecondsFormat;
use tracing::{debug, error, info, instrument, warn};

use crate::config::MAX_BATCH_SIZE;
use crate::error::{PipelineError, PipelineResult, StoreError};
use crate::models::ProductRecord;

/// Destination key-value store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Put up to [`MAX_BATCH_SIZE`] records in one request.
    async fn batch_put(&self, table: &str, items: &[ProductRecord]) -> Result<(), StoreError>;
}

/// [`RecordStore`] backed by DynamoDB `BatchWriteItem`
#[derive(Clone)]
pub struct DynamoRecordStore {
    client: Client,
}

impl DynamoRecordStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn batch_put(&self, table: &str, items: &[ProductRecord]) -> Result<(), StoreError> {
        let requests = items
            .iter()
            .map(|record| {
                let put = PutRequest::builder()
                    .set_item(Some(to_item(record)))
                    .build()
                    .map_err(|e| StoreError::Request(e.to_string()))?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| StoreError::Request(DisplayErrorContext(&e).to_string()))?;

        let unprocessed = output
            .unprocessed_items()
            .and_then(|pending| pending.get(table))
            .map(Vec::len)
            .unwrap_or(0);

        if unprocessed > 0 {
            return Err(StoreError::Unprocessed(unprocessed));
        }

        Ok(())
    }
}

/// Flat item for one record; `updatedAt` is stored as an explicit NULL.
pub fn to_item(record: &ProductRecord) -> HashMap<String, AttributeValue> {
    let updated_at = match record.updated_at {
        Some(at) => AttributeValue::S(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => AttributeValue::Null(true),
    };

    HashMap::from([
        ("id".to_string(), AttributeValue::S(record.id.to_string())),
        ("name".to_string(), AttributeValue::S(record.name.clone())),
        (
            "description".to_string(),
            AttributeValue::S(record.description.clone()),
        ),
        ("price".to_string(), AttributeValue::N(record.price.to_string())),
        (
            "quantity".to_string(),
            AttributeValue::N(record.quantity.to_string()),
        ),
        (
            "createdAt".to_string(),
            AttributeValue::S(record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
        ("updatedAt".to_string(), updated_at),
    ])
}

/// Result of a complete write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: usize,
    pub chunks: usize,
}

/// Splits records into fixed-size chunks and writes them one after another
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn RecordStore>,
    chunk_size: usize,
}

impl BatchWriter {
    /// `chunk_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(store: Arc<dyn RecordStore>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn write(&self, table: &str, records: &[ProductRecord]) -> PipelineResult<WriteSummary> {
        let total_chunks = records.len().div_ceil(self.chunk_size);

        info!(
            table_name = %table,
            record_count = records.len(),
            chunks = total_chunks,
            "Writing records in batches"
        );

        let mut written = 0;
        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            let chunk_number = index + 1;

            if let Err(source) = self.store.batch_put(table, chunk).await {
                error!(
                    table_name = %table,
                    chunk = chunk_number,
                    total_chunks,
                    written,
                    error = %source,
                    "Batch write failed, remaining chunks skipped"
                );
                return Err(PipelineError::Write {
                    chunk: chunk_number,
                    total_chunks,
                    written,
                    source,
                });
            }

            written += chunk.len();
            debug!(chunk = chunk_number, total_chunks, size = chunk.len(), "Chunk written");
        }

        Ok(WriteSummary {
            written,
            chunks: total_chunks,
        })
    }
}

/// Keep the first record for every id. A store request may not carry the
/// same key twice.
pub fn dedup_by_id(records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<ProductRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.id))
        .collect();

    if unique.len() < before {
        warn!(
            duplicates = before - unique.len(),
            "Dropped records with duplicate ids"
        );
    }

    unique
}
