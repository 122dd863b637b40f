//! Orchestration configuration from TOML (`[orchestration]` section)

use serde::{Deserialize, Serialize};

/// Raw orchestration configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestrationConfig {
    /// Retries after the first round (`MAX_RETRY_ATTEMPTS`)
    pub max_retries: u32,
    /// Confidence ceiling for answers given after retries ran out
    pub degraded_confidence_cap: f64,
    /// Successful rounds after which a store is no longer suggested by default
    pub store_round_cap: u32,
    /// Persist learned insights to the memory store
    pub write_insights: bool,
    /// Minimum answer confidence for an insight to be written
    pub insight_min_confidence: f64,
}

impl Default for FileOrchestrationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            degraded_confidence_cap: 0.5,
            store_round_cap: 1,
            write_insights: true,
            insight_min_confidence: 0.6,
        }
    }
}
