//! Reasoning oracle adapters.
//!
//! - [`RuleBasedOracle`]: offline heuristics, always available
//! - `HttpOracle`: OpenAI-compatible endpoint (feature `http-oracle`)

mod rule_based;

#[cfg(feature = "http-oracle")]
mod http;

#[cfg(feature = "http-oracle")]
pub use http::HttpOracle;
pub use rule_based::RuleBasedOracle;
