//! Semantic store port
//!
//! One adapter per knowledge store. Stores are shared, read-mostly
//! resources; the only writes during a query are append-only insight
//! records into the memory store.

use async_trait::async_trait;
use evidence_domain::{ChunkMetadata, StoreId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store timed out")]
    Timeout,

    #[error("Store write failed: {0}")]
    WriteError(String),
}

/// One ranked search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub relevance_score: f64,
}

/// A record to persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Search and append access to one knowledge store
#[async_trait]
pub trait SemanticStore: Send + Sync {
    fn store_id(&self) -> StoreId;

    /// Ranked search, best first, at most `top_k` results.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredRecord>, StoreError>;

    /// Append a record and return its fresh chunk id. Never overwrites.
    async fn store(&self, record: StoreRecord) -> Result<String, StoreError>;
}

/// Store adapters keyed by identifier
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: BTreeMap<StoreId, Arc<dyn SemanticStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own identifier, replacing any previous one.
    pub fn register(&mut self, store: Arc<dyn SemanticStore>) {
        self.stores.insert(store.store_id(), store);
    }

    pub fn with_store(mut self, store: Arc<dyn SemanticStore>) -> Self {
        self.register(store);
        self
    }

    pub fn get(&self, id: StoreId) -> Option<Arc<dyn SemanticStore>> {
        self.stores.get(&id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = StoreId> + '_ {
        self.stores.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}
