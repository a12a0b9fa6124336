//! Storage collaborator: read-only aggregate counts and plan execution.

pub mod memory_store;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StorageError;
use crate::search::{QueryPlan, Record};
use crate::types::EntityKind;

pub use memory_store::{InMemoryStore, SeedData};

/// One result row: the primary record plus the record it joins to, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub primary: Record,
    pub joined: Option<Record>,
}

impl JoinedRow {
    /// Field lookup that prefers the primary record and falls back to the joined one.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.primary
            .get(name)
            .or_else(|| self.joined.as_ref().and_then(|j| j.get(name)))
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|v| v.as_str())
    }

    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(|v| v.as_f64())
    }
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    /// Live total of one entity kind.
    async fn count_by_kind(&self, kind: EntityKind) -> Result<u64, StorageError>;

    /// Execute a plan: filter, join, sort and limit.
    async fn find_many(&self, plan: &QueryPlan) -> Result<Vec<JoinedRow>, StorageError>;
}
