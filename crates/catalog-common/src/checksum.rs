//! Content hashing for uploaded files
//!
//! Uploads can be redelivered by the notification source, so every run is
//! tagged with a hash of the file content and a processing identifier that
//! operators can search for in the logs.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// SHA-256 of `data` as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// MD5 of `data` as lowercase hex
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Identifier for one processing attempt of `bucket/key` started at `at`.
///
/// Two attempts on the same object get different identifiers; the content
/// hash is what ties them together.
pub fn processing_id(bucket: &str, key: &str, at: DateTime<Utc>) -> String {
    let seed = format!(
        "{}:{}:{}",
        bucket,
        key,
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    md5_hex(seed.as_bytes())
}
