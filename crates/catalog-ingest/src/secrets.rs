//! Destination table lookup through a secret store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use tracing::{debug, instrument};

use crate::error::{PipelineError, PipelineResult};

/// Key/value secrets by name
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> PipelineResult<HashMap<String, String>>;
}

/// [`SecretStore`] backed by AWS Secrets Manager. Secrets are expected to be
/// JSON objects stored as `SecretString`.
#[derive(Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    #[instrument(skip(self))]
    async fn get_secret(&self, name: &str) -> PipelineResult<HashMap<String, String>> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| {
                PipelineError::Configuration(format!(
                    "Failed to read secret '{}': {}",
                    name,
                    DisplayErrorContext(&e)
                ))
            })?;

        let raw = response.secret_string().ok_or_else(|| {
            PipelineError::Configuration(format!("Secret '{}' has no string value", name))
        })?;

        parse_secret_string(name, raw)
    }
}

/// Flatten a JSON object secret into strings. Non-string values keep their
/// JSON rendering.
pub fn parse_secret_string(name: &str, raw: &str) -> PipelineResult<HashMap<String, String>> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| {
            PipelineError::Configuration(format!("Secret '{}' is not a JSON object: {}", name, e))
        })?;

    Ok(object
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect())
}

/// Resolves the destination table name from one key of one secret
#[derive(Clone)]
pub struct TableNameResolver {
    store: Arc<dyn SecretStore>,
    secret_name: String,
    table_key: String,
}

impl TableNameResolver {
    pub fn new(
        store: Arc<dyn SecretStore>,
        secret_name: impl Into<String>,
        table_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            secret_name: secret_name.into(),
            table_key: table_key.into(),
        }
    }

    pub async fn resolve(&self) -> PipelineResult<String> {
        let secret = self.store.get_secret(&self.secret_name).await?;

        match secret.get(&self.table_key).map(|value| value.trim()) {
            Some(table) if !table.is_empty() => {
                debug!(secret = %self.secret_name, key = %self.table_key, "Resolved table name");
                Ok(table.to_string())
            },
            _ => {
                let mut available: Vec<&str> = secret.keys().map(String::as_str).collect();
                available.sort_unstable();
                Err(PipelineError::Configuration(format!(
                    "{} not found in secret '{}' (available keys: [{}])",
                    self.table_key,
                    self.secret_name,
                    available.join(", ")
                )))
            },
        }
    }
}
