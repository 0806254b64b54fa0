//! Object storage access
//!
//! The pipeline reads each uploaded file once, in full. No retries happen
//! here; a failed fetch fails the file and redelivery is left to whatever
//! invoked the pipeline.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use tracing::{debug, instrument};

use crate::error::{PipelineError, PipelineResult};

/// Read access to uploaded objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Complete content of `bucket/key`.
    ///
    /// Fails with [`PipelineError::ObjectNotFound`] when the object does not
    /// exist and [`PipelineError::TransientStorage`] otherwise.
    async fn get_object(&self, bucket: &str, key: &str) -> PipelineResult<Vec<u8>>;
}

/// [`ObjectStore`] backed by Amazon S3 (or an S3-compatible endpoint)
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig, force_path_style: bool) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(force_path_style)
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> PipelineResult<Vec<u8>> {
        debug!("Downloading from s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify_get_error(err, bucket, key))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| {
                PipelineError::TransientStorage(format!(
                    "Failed to read body of s3://{}/{}: {}",
                    bucket, key, e
                ))
            })?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), bucket, key);

        Ok(data)
    }
}

fn classify_get_error(
    err: SdkError<GetObjectError>,
    bucket: &str,
    key: &str,
) -> PipelineError {
    let no_such_key = err
        .as_service_error()
        .map(GetObjectError::is_no_such_key)
        .unwrap_or(false);
    let status_404 = err
        .raw_response()
        .map(|response| response.status().as_u16() == 404)
        .unwrap_or(false);

    if no_such_key || status_404 {
        PipelineError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        PipelineError::TransientStorage(format!(
            "Failed to download s3://{}/{}: {}",
            bucket,
            key,
            DisplayErrorContext(&err)
        ))
    }
}

/// Lowercased extension of the file name in `key`, or `""` if it has none.
///
/// Only the last path segment is considered, so `exports.v2/products` has no
/// extension.
pub fn file_extension(key: &str) -> String {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rsplit_once('.') {
        Some((_, extension)) => extension.to_lowercase(),
        None => String::new(),
    }
}
