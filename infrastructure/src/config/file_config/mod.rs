//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod logging;
mod oracle;
mod orchestration;
mod output;
mod retrieval;
mod stores;

pub use logging::FileLoggingConfig;
pub use oracle::{FileOracleConfig, OracleProvider};
pub use orchestration::FileOrchestrationConfig;
pub use output::FileOutputConfig;
pub use retrieval::FileRetrievalConfig;
pub use stores::FileStoresConfig;

use evidence_application::OrchestrationParams;
use evidence_domain::{InsightPolicy, StoreId, parse_store_list};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on `orchestration.max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("retrieval.top_k must be greater than 0")]
    InvalidTopK,

    #[error("orchestration.max_retries is {0}; at most {MAX_RETRIES_LIMIT} is allowed")]
    TooManyRetries(u32),

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("orchestration.store_round_cap must be at least 1")]
    InvalidStoreRoundCap,

    #[error("stores.enabled: {0}")]
    UnknownStore(String),

    #[error("stores.enabled must name at least one store")]
    NoStoresEnabled,

    #[error("oracle.endpoint cannot be empty when provider = \"http\"")]
    MissingEndpoint,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Per-store retrieval settings
    pub retrieval: FileRetrievalConfig,
    /// Round budget, confidence cap and insight policy
    pub orchestration: FileOrchestrationConfig,
    /// Reasoning oracle selection
    pub oracle: FileOracleConfig,
    /// Store data location and membership
    pub stores: FileStoresConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Transcript and log file locations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigValidationError::InvalidTopK);
        }
        if self.retrieval.store_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "retrieval.store_timeout_seconds",
            ));
        }
        if let Some(threshold) = self.retrieval.relevance_threshold {
            unit_range("retrieval.relevance_threshold", threshold)?;
        }

        let orchestration = &self.orchestration;
        if orchestration.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigValidationError::TooManyRetries(
                orchestration.max_retries,
            ));
        }
        unit_range(
            "orchestration.degraded_confidence_cap",
            orchestration.degraded_confidence_cap,
        )?;
        unit_range(
            "orchestration.insight_min_confidence",
            orchestration.insight_min_confidence,
        )?;
        if orchestration.store_round_cap == 0 {
            return Err(ConfigValidationError::InvalidStoreRoundCap);
        }

        if self.oracle.timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout("oracle.timeout_seconds"));
        }
        if self.oracle.provider == OracleProvider::Http && self.oracle.endpoint.trim().is_empty() {
            return Err(ConfigValidationError::MissingEndpoint);
        }

        self.enabled_stores()?;
        Ok(())
    }

    /// Parse `stores.enabled` into store identifiers.
    pub fn enabled_stores(&self) -> Result<BTreeSet<StoreId>, ConfigValidationError> {
        let stores = parse_store_list(&self.stores.enabled)
            .map_err(|e| ConfigValidationError::UnknownStore(e.to_string()))?;
        if stores.is_empty() {
            return Err(ConfigValidationError::NoStoresEnabled);
        }
        Ok(stores)
    }

    /// Orchestration parameters for the use cases.
    pub fn to_params(&self) -> OrchestrationParams {
        let orchestration = &self.orchestration;
        OrchestrationParams::default()
            .with_max_retries(orchestration.max_retries)
            .with_degraded_confidence_cap(orchestration.degraded_confidence_cap)
            .with_store_round_cap(orchestration.store_round_cap)
            .with_oracle_timeout(Duration::from_secs(self.oracle.timeout_seconds))
            .with_insight_policy(InsightPolicy {
                enabled: orchestration.write_insights,
                min_confidence: orchestration.insight_min_confidence,
            })
            .with_retrieval(self.retrieval.to_params())
    }
}

fn unit_range(field: &'static str, value: f64) -> Result<(), ConfigValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigValidationError::OutOfUnitRange { field, value })
    }
}
