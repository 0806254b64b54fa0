//! Catalog record types flowing through the import pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row that passed validation, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    /// Strictly positive
    pub price: f64,
    /// Non-negative whole number
    pub quantity: i64,
}

/// A validated product with its identity, as written to the key-value store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    pub fn new(input: ProductInput, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            created_at,
            updated_at: None,
        }
    }
}

/// A rejected row. `row_index` is 1-based, counted over data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_index: usize,
    pub message: String,
}
