//! Retrieval configuration from TOML (`[retrieval]` section)

use evidence_application::RetrievalParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw retrieval configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetrievalConfig {
    /// Chunks requested from each store per round (`RETRIEVAL_TOP_K`)
    pub top_k: usize,
    /// Score at which a sequential round may stop early
    pub relevance_threshold: Option<f64>,
    /// Chunks at or above the threshold needed to stop early
    pub sufficient_hits: usize,
    /// Per-store query timeout
    pub store_timeout_seconds: u64,
}

impl Default for FileRetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            relevance_threshold: None,
            sufficient_hits: 3,
            store_timeout_seconds: 10,
        }
    }
}

impl FileRetrievalConfig {
    pub fn to_params(&self) -> RetrievalParams {
        let params = RetrievalParams::default()
            .with_top_k(self.top_k)
            .with_store_timeout(Duration::from_secs(self.store_timeout_seconds));
        match self.relevance_threshold {
            Some(threshold) => params.with_relevance_threshold(threshold, self.sufficient_hits),
            None => params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_params() {
        let config = FileRetrievalConfig {
            top_k: 8,
            relevance_threshold: Some(0.7),
            sufficient_hits: 2,
            store_timeout_seconds: 3,
        };
        let params = config.to_params();
        assert_eq!(params.top_k, 8);
        assert_eq!(params.relevance_threshold, Some(0.7));
        assert_eq!(params.sufficient_hits, 2);
        assert_eq!(params.store_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_threshold_unset_by_default() {
        let params = FileRetrievalConfig::default().to_params();
        assert_eq!(params.top_k, 5);
        assert!(params.relevance_threshold.is_none());
    }
}
