//! Infrastructure layer for evidence-router
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod oracle;
pub mod stores;
mod text;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileOracleConfig, FileOutputConfig,
    OracleProvider,
};
pub use logging::JsonlConversationLogger;
#[cfg(feature = "http-oracle")]
pub use oracle::HttpOracle;
pub use oracle::RuleBasedOracle;
pub use stores::{IngestError, JsonlSemanticStore, read_records};
