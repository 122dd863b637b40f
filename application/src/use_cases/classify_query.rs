//! Classify Query use case
//!
//! Turns raw query text into a [`QueryIntent`], falling back to a
//! conservative default when the oracle fails or answers off-schema.

use crate::ports::oracle::{OracleRequest, OracleSchema, ReasoningOracle};
use crate::use_cases::shared::{Cancelled, complete_with_timeout};
use evidence_domain::{PromptTemplate, QueryIntent, Question};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of classification
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: QueryIntent,
    /// Why the conservative default was used, if it was
    pub degraded: Option<String>,
}

/// Use case for classifying a query
pub struct ClassifyQueryUseCase {
    oracle: Arc<dyn ReasoningOracle>,
    timeout: Duration,
}

impl ClassifyQueryUseCase {
    pub fn new(oracle: Arc<dyn ReasoningOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub async fn execute(
        &self,
        query: &Question,
        cancellation: &Option<CancellationToken>,
    ) -> Result<Classification, Cancelled> {
        let request = OracleRequest::new(
            OracleSchema::QueryIntent,
            PromptTemplate::classification_system(),
            PromptTemplate::classification_prompt(query.content()),
        )
        .with_context(json!({ "query": query.content() }));

        let response =
            complete_with_timeout(self.oracle.as_ref(), &request, self.timeout, cancellation).await?;

        let parsed = response
            .map_err(|e| e.to_string())
            .and_then(|value| QueryIntent::from_oracle(query, &value).map_err(|e| e.to_string()));

        Ok(match parsed {
            Ok(intent) => {
                debug!(
                    "Classified as {} / {} ({})",
                    intent.intent_category(),
                    intent.topic(),
                    intent.complexity()
                );
                Classification {
                    intent,
                    degraded: None,
                }
            }
            Err(reason) => {
                warn!("Classification degraded, using conservative default: {}", reason);
                Classification {
                    intent: QueryIntent::conservative(query),
                    degraded: Some(reason),
                }
            }
        })
    }
}
