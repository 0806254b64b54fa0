//! Catalog Common Library
//!
//! Shared error handling, logging setup and content hashing for the catalog
//! workspace.
//!
//! - **Error Handling**: [`CatalogError`] and the [`Result`] alias
//! - **Logging**: [`logging::init_logging`] with console/file and text/JSON output
//! - **Checksums**: content hashes and processing identifiers used to correlate
//!   redelivered uploads
//!
//! # Example
//!
//! ```no_run
//! use catalog_common::checksum::sha256_hex;
//! use catalog_common::Result;
//!
//! fn fingerprint(path: &str) -> Result<String> {
//!     let bytes = std::fs::read(path)?;
//!     Ok(sha256_hex(&bytes))
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CatalogError, Result};
