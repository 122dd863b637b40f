//! Reasoning oracle port
//!
//! The single narrow capability behind classification, routing, evaluation
//! and answer drafting: given a prompt and an expected output schema,
//! return a structured JSON judgment.

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur during an oracle call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle timed out")]
    Timeout,

    #[error("Oracle rate limited")]
    RateLimited,

    #[error("Oracle output does not match the expected schema: {0}")]
    SchemaViolation(String),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

/// Output shape requested from the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleSchema {
    QueryIntent,
    StorePlan,
    SufficiencyVerdict,
    Answer,
}

impl OracleSchema {
    pub fn name(&self) -> &'static str {
        match self {
            OracleSchema::QueryIntent => "query_intent",
            OracleSchema::StorePlan => "store_plan",
            OracleSchema::SufficiencyVerdict => "sufficiency_verdict",
            OracleSchema::Answer => "answer",
        }
    }

    /// JSON Schema for the expected payload.
    pub fn json_schema(&self) -> Value {
        let stores = json!(["docs", "code", "tickets", "memory"]);
        match self {
            OracleSchema::QueryIntent => json!({
                "type": "object",
                "required": ["intent_category", "topic", "complexity", "memory_relevant"],
                "properties": {
                    "intent_category": {"enum": ["explanation", "debugging", "comparison", "how_to"]},
                    "topic": {"type": "string"},
                    "complexity": {"enum": ["low", "medium", "high"]},
                    "memory_relevant": {"type": "boolean"}
                }
            }),
            OracleSchema::StorePlan => json!({
                "type": "object",
                "required": ["selected_stores"],
                "properties": {
                    "selected_stores": {"type": "array", "items": {"enum": stores}, "minItems": 1},
                    "strategy": {"enum": ["parallel", "sequential"]},
                    "retry_allowed": {"type": "boolean"},
                    "reasoning": {"type": "string"}
                }
            }),
            OracleSchema::SufficiencyVerdict => json!({
                "type": "object",
                "required": ["sufficient"],
                "properties": {
                    "sufficient": {"type": "boolean"},
                    "missing_aspects": {"type": "array", "items": {"type": "string"}},
                    "suggested_stores": {"type": "array", "items": {"enum": stores}}
                }
            }),
            OracleSchema::Answer => json!({
                "type": "object",
                "required": ["answer", "confidence"],
                "properties": {
                    "answer": {"type": "string"},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1},
                    "citations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["source_db", "locator"],
                            "properties": {
                                "source_db": {"enum": stores},
                                "locator": {"type": "string"}
                            }
                        }
                    },
                    "learned_insight": {"type": ["string", "null"]}
                }
            }),
        }
    }
}

impl std::fmt::Display for OracleSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A structured prompt
///
/// `system` and `user` carry the rendered prompt text. `context` carries the
/// same inputs as structured JSON for oracles that do not read prose.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub schema: OracleSchema,
    pub system: String,
    pub user: String,
    pub context: Value,
}

impl OracleRequest {
    pub fn new(schema: OracleSchema, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            schema,
            system: system.into(),
            user: user.into(),
            context: Value::Null,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Reasoning capability used by every judgment stage
///
/// Implementations (adapters) live in the infrastructure layer. The
/// returned value is untrusted; callers validate it.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn complete(&self, request: &OracleRequest) -> Result<Value, OracleError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "oracle"
    }
}
