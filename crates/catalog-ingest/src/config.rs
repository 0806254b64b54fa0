//! Configuration management

use aws_config::{BehaviorVersion, Region, SdkConfig};
use catalog_common::{CatalogError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Import Configuration Constants
// ============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-2";

/// Default name of the secret holding the destination table name.
pub const DEFAULT_SECRET_NAME: &str = "hands-on-aws/database";

/// Default key of the table name inside the secret.
pub const DEFAULT_TABLE_KEY: &str = "PRODUCTS_TABLE_NAME";

/// Default maximum accepted file size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum number of items in one store write request.
pub const MAX_BATCH_SIZE: usize = 25;

/// Default number of row errors kept in an outcome and in logs.
pub const DEFAULT_ERROR_SAMPLE_SIZE: usize = 10;

/// Import pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub aws: AwsConfig,
    pub secrets: SecretsConfig,
    pub limits: LimitsConfig,
}

/// AWS client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    /// Override for local stacks; also switches S3 to path-style addressing
    pub endpoint_url: Option<String>,
}

/// Where the destination table name lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    pub secret_name: String,
    pub table_key: String,
}

/// Per-file limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_file_size: usize,
    pub batch_size: usize,
    pub error_sample_size: usize,
}

impl IngestConfig {
    /// Load configuration from environment (and `.env`, if present) and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let number = |name: &str, default: usize| -> Result<usize> {
            match var(name) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    CatalogError::Config(format!("{} must be a whole number, got '{}'", name, raw))
                }),
                None => Ok(default),
            }
        };

        let config = IngestConfig {
            aws: AwsConfig {
                region: var("AWS_REGION")
                    .or_else(|| var("AWS_DEFAULT_REGION"))
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                endpoint_url: var("AWS_ENDPOINT_URL"),
            },
            secrets: SecretsConfig {
                secret_name: var("SECRET_NAME").unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
                table_key: var("PRODUCTS_TABLE_KEY")
                    .unwrap_or_else(|| DEFAULT_TABLE_KEY.to_string()),
            },
            limits: LimitsConfig {
                max_file_size: number("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE)?,
                batch_size: number("BATCH_SIZE", MAX_BATCH_SIZE)?,
                error_sample_size: number("ERROR_SAMPLE_SIZE", DEFAULT_ERROR_SAMPLE_SIZE)?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_file_size == 0 {
            return Err(CatalogError::Config(
                "MAX_FILE_SIZE_BYTES must be greater than 0".to_string(),
            ));
        }

        if !(1..=MAX_BATCH_SIZE).contains(&self.limits.batch_size) {
            return Err(CatalogError::Config(format!(
                "BATCH_SIZE must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.limits.batch_size
            )));
        }

        if self.secrets.secret_name.trim().is_empty() {
            return Err(CatalogError::Config("SECRET_NAME cannot be empty".to_string()));
        }

        if self.secrets.table_key.trim().is_empty() {
            return Err(CatalogError::Config("PRODUCTS_TABLE_KEY cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Shared AWS SDK configuration for every client the pipeline builds
    pub async fn aws_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.aws.region.clone()));

        if let Some(endpoint) = &self.aws.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }

    /// Local S3-compatible stacks generally need path-style addressing.
    pub fn force_path_style(&self) -> bool {
        self.aws.endpoint_url.is_some()
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                region: DEFAULT_REGION.to_string(),
                endpoint_url: None,
            },
            secrets: SecretsConfig {
                secret_name: DEFAULT_SECRET_NAME.to_string(),
                table_key: DEFAULT_TABLE_KEY.to_string(),
            },
            limits: LimitsConfig {
                max_file_size: DEFAULT_MAX_FILE_SIZE,
                batch_size: MAX_BATCH_SIZE,
                error_sample_size: DEFAULT_ERROR_SAMPLE_SIZE,
            },
        }
    }
}
