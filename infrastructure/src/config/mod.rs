//! Configuration file loading for evidence-router
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables (`RETRIEVAL_TOP_K`, `MAX_RETRY_ATTEMPTS`, `EVIDENCE_ROUTER_*`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./evidence-router.toml` or `./.evidence-router.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/evidence-router/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileLoggingConfig, FileOracleConfig,
    FileOrchestrationConfig, FileOutputConfig, FileRetrievalConfig, FileStoresConfig,
    MAX_RETRIES_LIMIT, OracleProvider,
};
pub use loader::ConfigLoader;
