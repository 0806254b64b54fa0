//! Object-created notifications that trigger an import
//!
//! The payload follows the S3 event notification shape; only the fields the
//! pipeline needs are decoded.

use serde::{Deserialize, Serialize};

/// One processing event: an ordered list of uploaded objects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<UploadRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntity {
    /// URL-encoded, as delivered by the notification source
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Location of an uploaded object, with the key already decoded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl UploadEvent {
    /// Event for already-decoded object locations
    pub fn from_objects(objects: impl IntoIterator<Item = ObjectRef>) -> Self {
        let records = objects
            .into_iter()
            .map(|object| UploadRecord {
                s3: S3Entity {
                    bucket: BucketEntity {
                        name: object.bucket,
                    },
                    object: ObjectEntity {
                        key: urlencoding::encode(&object.key).into_owned(),
                        size: None,
                    },
                },
            })
            .collect();

        Self { records }
    }

    /// Uploaded objects in notification order
    pub fn objects(&self) -> Vec<ObjectRef> {
        self.records
            .iter()
            .map(|record| ObjectRef {
                bucket: record.s3.bucket.name.clone(),
                key: decode_key(&record.s3.object.key),
            })
            .collect()
    }
}

/// Decode an object key from a notification: `+` is a space, then
/// percent-escapes. A key that does not decode to UTF-8 is returned as is.
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
