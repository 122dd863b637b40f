//! Application layer for evidence-router
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{OrchestrationParams, RetrievalParams};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    oracle::{OracleError, OracleRequest, OracleSchema, ReasoningOracle},
    progress::{NoProgress, ProgressNotifier},
    semantic_store::{ScoredRecord, SemanticStore, StoreError, StoreRecord, StoreRegistry},
};
pub use use_cases::run_query::{
    QueryOutcome, RunQueryError, RunQueryInput, RunQueryUseCase,
};
pub use use_cases::write_insight::InsightOutcome;
