//! Application-level configuration.
//!
//! Parameters that control how the use cases behave:
//!
//! - [`OrchestrationParams`]: round budget, confidence cap, oracle timeout, insight policy
//! - [`RetrievalParams`]: per-store top-k, timeouts and the sequential short-circuit

pub mod orchestration_params;
pub mod retrieval_params;

pub use orchestration_params::OrchestrationParams;
pub use retrieval_params::RetrievalParams;
