//! Evaluate Sufficiency use case
//!
//! Judges whether the merged evidence supports a grounded answer.
//! Empty evidence is always insufficient and never reaches the oracle.
//! Invalid oracle output is treated as insufficient, suggesting every
//! store that has not yet reached its round cap.

use crate::ports::oracle::{OracleRequest, OracleSchema, ReasoningOracle};
use crate::use_cases::shared::{Cancelled, complete_with_timeout};
use evidence_domain::{
    EvidenceSet, PromptTemplate, QueryIntent, StoreId, SufficiencyVerdict, preview,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub verdict: SufficiencyVerdict,
    /// Why the insufficient-by-default verdict was used, if it was
    pub degraded: Option<String>,
}

/// Use case for judging evidence sufficiency
pub struct EvaluateSufficiencyUseCase {
    oracle: Arc<dyn ReasoningOracle>,
    timeout: Duration,
}

impl EvaluateSufficiencyUseCase {
    pub fn new(oracle: Arc<dyn ReasoningOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Evaluate `evidence` after `round`.
    ///
    /// `at_cap` lists stores excluded from fallback suggestions.
    pub async fn execute(
        &self,
        intent: &QueryIntent,
        evidence: &EvidenceSet,
        round: u32,
        at_cap: &BTreeSet<StoreId>,
        cancellation: &Option<CancellationToken>,
    ) -> Result<Evaluation, Cancelled> {
        if evidence.is_empty() {
            debug!("Round {}: no evidence, insufficient without consulting oracle", round);
            return Ok(Evaluation {
                verdict: fallback_verdict("no evidence retrieved", at_cap),
                degraded: None,
            });
        }

        let request = build_request(intent, evidence, round);
        let response =
            complete_with_timeout(self.oracle.as_ref(), &request, self.timeout, cancellation).await?;

        let parsed = response
            .map_err(|e| e.to_string())
            .and_then(|value| SufficiencyVerdict::from_oracle(&value).map_err(|e| e.to_string()));

        Ok(match parsed {
            Ok(verdict) => Evaluation {
                verdict,
                degraded: None,
            },
            Err(reason) => {
                warn!("Evaluation degraded in round {}, assuming insufficient: {}", round, reason);
                Evaluation {
                    verdict: fallback_verdict("evaluation unavailable", at_cap),
                    degraded: Some(reason),
                }
            }
        })
    }
}

fn fallback_verdict(missing: &str, at_cap: &BTreeSet<StoreId>) -> SufficiencyVerdict {
    let suggested = StoreId::universe().difference(at_cap).copied().collect();
    SufficiencyVerdict::insufficient(vec![missing.to_string()], suggested)
}

fn build_request(intent: &QueryIntent, evidence: &EvidenceSet, round: u32) -> OracleRequest {
    let chunks: Vec<_> = evidence
        .iter()
        .map(|c| {
            json!({
                "source_db": c.source_db(),
                "locator": c.locator(),
                "relevance_score": c.relevance_score,
                "content": preview(c.content()),
            })
        })
        .collect();

    OracleRequest::new(
        OracleSchema::SufficiencyVerdict,
        PromptTemplate::evaluation_system(),
        PromptTemplate::evaluation_prompt(intent, evidence, round),
    )
    .with_context(json!({
        "intent": intent,
        "round": round,
        "evidence": chunks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::oracle::OracleError;
    use crate::use_cases::test_support::ScriptedOracle;
    use evidence_domain::{
        ChunkMetadata, Complexity, DocsMetadata, EVIDENCE_PREVIEW_BYTES, EvidenceChunk,
        IntentCategory, Question,
    };

    fn intent() -> QueryIntent {
        QueryIntent::new(
            &Question::new("How does authentication work?"),
            IntentCategory::Explanation,
            "authentication",
            Complexity::Medium,
            false,
        )
    }

    fn evidence() -> EvidenceSet {
        let mut set = EvidenceSet::new();
        set.merge(vec![EvidenceChunk::new(
            StoreId::Docs,
            "Authentication uses JWT.",
            ChunkMetadata::Docs(DocsMetadata {
                doc_type: "api".to_string(),
                section: "auth".to_string(),
                version: None,
            }),
            0.9,
        )]);
        set
    }

    fn evaluator(oracle: Arc<ScriptedOracle>) -> EvaluateSufficiencyUseCase {
        EvaluateSufficiencyUseCase::new(oracle, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_empty_evidence_is_insufficient_without_oracle() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .respond(OracleSchema::SufficiencyVerdict, json!({"sufficient": true})),
        );
        let at_cap: BTreeSet<_> = [StoreId::Docs].into_iter().collect();
        let evaluation = evaluator(oracle.clone())
            .execute(&intent(), &EvidenceSet::new(), 1, &at_cap, &None)
            .await
            .unwrap();
        assert!(!evaluation.verdict.sufficient);
        assert!(evaluation.degraded.is_none());
        assert!(!evaluation.verdict.suggested_stores.contains(&StoreId::Docs));
        assert_eq!(evaluation.verdict.suggested_stores.len(), 3);
        assert_eq!(oracle.calls(OracleSchema::SufficiencyVerdict), 0);
    }

    #[tokio::test]
    async fn test_oracle_verdict_passed_through() {
        let oracle = Arc::new(ScriptedOracle::new().respond(
            OracleSchema::SufficiencyVerdict,
            json!({"sufficient": false, "missing_aspects": ["code"], "suggested_stores": ["code"]}),
        ));
        let evaluation = evaluator(oracle)
            .execute(&intent(), &evidence(), 1, &BTreeSet::new(), &None)
            .await
            .unwrap();
        assert!(!evaluation.verdict.sufficient);
        assert_eq!(
            evaluation.verdict.suggested_stores,
            [StoreId::Code].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn test_invalid_output_forces_broader_retrieval() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .respond(OracleSchema::SufficiencyVerdict, json!({"sufficient": "maybe"}))
                .fail(OracleSchema::SufficiencyVerdict, OracleError::SchemaViolation("bad".into())),
        );
        let use_case = evaluator(oracle);
        let at_cap: BTreeSet<_> = [StoreId::Docs, StoreId::Code].into_iter().collect();
        for _ in 0..2 {
            let evaluation = use_case
                .execute(&intent(), &evidence(), 2, &at_cap, &None)
                .await
                .unwrap();
            assert!(!evaluation.verdict.sufficient);
            assert!(evaluation.degraded.is_some());
            assert_eq!(
                evaluation.verdict.suggested_stores,
                [StoreId::Tickets, StoreId::Memory].into_iter().collect()
            );
        }
    }

    #[tokio::test]
    async fn test_request_context_truncates_content() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .respond(OracleSchema::SufficiencyVerdict, json!({"sufficient": true})),
        );
        let mut set = EvidenceSet::new();
        set.merge(vec![EvidenceChunk::new(
            StoreId::Docs,
            "z".repeat(1000),
            ChunkMetadata::Docs(DocsMetadata {
                doc_type: "api".to_string(),
                section: "auth".to_string(),
                version: None,
            }),
            0.5,
        )]);
        evaluator(oracle.clone())
            .execute(&intent(), &set, 1, &BTreeSet::new(), &None)
            .await
            .unwrap();
        let requests = oracle.requests(OracleSchema::SufficiencyVerdict);
        let content = requests[0].context["evidence"][0]["content"].as_str().unwrap();
        assert_eq!(content.len(), EVIDENCE_PREVIEW_BYTES);
    }
}
