//! Catalog Ingest Library
//!
//! Bulk import of product files into the catalog's key-value store.
//!
//! An upload notification names one or more objects. Each object is
//! downloaded, parsed as CSV or as a workbook, validated row by row, given an
//! identity and written to the destination table in chunks of at most 25.
//! Rows that fail validation are counted and sampled; they never stop the
//! rest of the file.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use catalog_ingest::config::IngestConfig;
//! use catalog_ingest::event::UploadEvent;
//! use catalog_ingest::fetcher::S3ObjectStore;
//! use catalog_ingest::pipeline::Orchestrator;
//! use catalog_ingest::secrets::{SecretsManagerStore, TableNameResolver};
//! use catalog_ingest::writer::DynamoRecordStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let sdk = config.aws_sdk_config().await;
//!
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(S3ObjectStore::new(&sdk, config.force_path_style())),
//!         Arc::new(DynamoRecordStore::new(&sdk)),
//!         TableNameResolver::new(
//!             Arc::new(SecretsManagerStore::new(&sdk)),
//!             config.secrets.secret_name.clone(),
//!             config.secrets.table_key.clone(),
//!         ),
//!         &config,
//!     );
//!
//!     let event: UploadEvent = serde_json::from_str(&std::fs::read_to_string("event.json")?)?;
//!     orchestrator.process_event(&event).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod event;
pub mod fetcher;
pub mod identity;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod secrets;
pub mod validator;
pub mod writer;

pub use error::{EventError, FileFailure, PipelineError, PipelineResult};
pub use event::{ObjectRef, UploadEvent};
pub use models::{ProductInput, ProductRecord, RowError};
pub use pipeline::{Orchestrator, ProcessingOutcome, Stage};
