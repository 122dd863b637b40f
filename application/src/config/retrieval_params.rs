//! Retrieval parameters for the dispatcher.

use std::time::Duration;

/// How stores are queried within one round
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    /// Result limit passed to every store query.
    pub top_k: usize,
    /// Score a chunk needs to count toward the sequential short-circuit.
    /// `None` disables the short-circuit.
    pub relevance_threshold: Option<f64>,
    /// High-relevance chunks needed before a sequential round stops early.
    pub sufficient_hits: usize,
    /// Timeout applied to each store query.
    pub store_timeout: Duration,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            relevance_threshold: None,
            sufficient_hits: 3,
            store_timeout: Duration::from_secs(10),
        }
    }
}

impl RetrievalParams {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_relevance_threshold(mut self, threshold: f64, hits: usize) -> Self {
        self.relevance_threshold = Some(threshold);
        self.sufficient_hits = hits.max(1);
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}
