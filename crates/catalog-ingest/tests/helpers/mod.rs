//! Test helpers for catalog-ingest integration tests
//!
//! In-memory stand-ins for the three external collaborators of the
//! pipeline, plus a harness that wires them into an [`Orchestrator`].

#![allow(dead_code)]

pub mod fixtures;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_ingest::config::IngestConfig;
use catalog_ingest::error::{PipelineError, PipelineResult, StoreError};
use catalog_ingest::pipeline::Orchestrator;
use catalog_ingest::secrets::{SecretStore, TableNameResolver};
use catalog_ingest::writer::RecordStore;
use catalog_ingest::ProductRecord;

pub use fixtures::*;

pub const BUCKET: &str = "catalog-uploads";
pub const SECRET_NAME: &str = "catalog/test";
pub const TABLE_NAME: &str = "products-test";

// ============================================================================
// Object Store
// ============================================================================

/// Objects keyed by (bucket, key); unknown objects are not found
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fetches: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl catalog_ingest::fetcher::ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> PipelineResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| PipelineError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

// ============================================================================
// Record Store
// ============================================================================

/// Records every batch request. With `fail_on_call(n)` the n-th request
/// (1-based) is rejected and not recorded.
#[derive(Default)]
pub struct RecordingRecordStore {
    calls: Mutex<Vec<(String, Vec<ProductRecord>)>>,
    attempts: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl RecordingRecordStore {
    pub fn fail_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    /// Successful requests, in order
    pub fn calls(&self) -> Vec<(String, Vec<ProductRecord>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Every record from every successful request
    pub fn written(&self) -> Vec<ProductRecord> {
        self.calls()
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect()
    }

    /// Requests issued, including the rejected one
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for RecordingRecordStore {
    async fn batch_put(&self, table: &str, items: &[ProductRecord]) -> Result<(), StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(attempt) {
            return Err(StoreError::Request("ProvisionedThroughputExceededException".to_string()));
        }

        self.calls
            .lock()
            .unwrap()
            .push((table.to_string(), items.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Secret Store
// ============================================================================

/// A single secret holding fixed key/value pairs
pub struct StaticSecretStore {
    values: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// The secret every harness uses unless told otherwise
    pub fn with_table() -> Self {
        Self::new(&[("PRODUCTS_TABLE_NAME", TABLE_NAME), ("CLIENTS_TABLE_NAME", "clients-test")])
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, name: &str) -> PipelineResult<HashMap<String, String>> {
        if name != SECRET_NAME {
            return Err(PipelineError::Configuration(format!("Secret '{}' not found", name)));
        }
        Ok(self.values.clone())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Orchestrator wired to in-memory collaborators
pub struct TestHarness {
    pub objects: Arc<InMemoryObjectStore>,
    pub records: Arc<RecordingRecordStore>,
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_stores(RecordingRecordStore::default(), StaticSecretStore::with_table())
    }

    pub fn with_stores(records: RecordingRecordStore, secrets: StaticSecretStore) -> Self {
        let mut config = IngestConfig::default();
        config.secrets.secret_name = SECRET_NAME.to_string();

        let objects = Arc::new(InMemoryObjectStore::default());
        let records = Arc::new(records);
        let resolver = TableNameResolver::new(
            Arc::new(secrets),
            config.secrets.secret_name.clone(),
            config.secrets.table_key.clone(),
        );

        let orchestrator = Orchestrator::new(objects.clone(), records.clone(), resolver, &config);

        Self {
            objects,
            records,
            orchestrator,
        }
    }
}
