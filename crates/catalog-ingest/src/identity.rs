//! Identity assignment for validated products

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ProductInput, ProductRecord};

/// Gives each validated product a random v4 id and a creation time.
///
/// Creation times handed out by one assigner never go backwards, even if the
/// wall clock does.
#[derive(Debug, Default)]
pub struct IdentityAssigner {
    last_issued: Option<DateTime<Utc>>,
}

impl IdentityAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, input: ProductInput) -> ProductRecord {
        let now = Utc::now();
        let created_at = match self.last_issued {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_issued = Some(created_at);

        ProductRecord::new(input, Uuid::new_v4(), created_at)
    }

    pub fn assign_all(&mut self, inputs: Vec<ProductInput>) -> Vec<ProductRecord> {
        inputs.into_iter().map(|input| self.assign(input)).collect()
    }
}
