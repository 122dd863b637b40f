//! Synthesize Answer use case
//!
//! Drafts the final answer from the merged evidence. Citations are checked
//! against the evidence set after the oracle returns; anything pointing at
//! a chunk that is not there is dropped. If the oracle fails, an
//! extractive answer is built from the top chunk of each source.

use crate::ports::oracle::{OracleRequest, OracleSchema, ReasoningOracle};
use crate::use_cases::shared::{Cancelled, complete_with_timeout};
use evidence_domain::{
    Answer, Citation, DraftAnswer, EvidenceSet, PromptTemplate, QueryIntent, bound_confidence,
    excerpt,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Confidence reported for an extractive fallback answer
pub const FALLBACK_CONFIDENCE: f64 = 0.2;

/// Sources quoted in an extractive fallback answer
const FALLBACK_SOURCES: usize = 3;

/// Bytes quoted per chunk in an extractive fallback answer
const FALLBACK_EXCERPT_BYTES: usize = 240;

/// Errors that end synthesis without an answer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("No evidence to ground an answer")]
    NoEvidence,

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<Cancelled> for SynthesisError {
    fn from(_: Cancelled) -> Self {
        SynthesisError::Cancelled
    }
}

/// Result of synthesis
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: Answer,
    /// Citations removed because they did not match the evidence
    pub dropped_citations: usize,
    /// Why the extractive fallback was used, if it was
    pub degraded: Option<String>,
}

/// Use case for drafting the grounded answer
pub struct SynthesizeAnswerUseCase {
    oracle: Arc<dyn ReasoningOracle>,
    timeout: Duration,
}

impl SynthesizeAnswerUseCase {
    pub fn new(oracle: Arc<dyn ReasoningOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Draft an answer; `confidence_cap` applies when the session was exhausted.
    pub async fn execute(
        &self,
        intent: &QueryIntent,
        evidence: &EvidenceSet,
        confidence_cap: Option<f64>,
        cancellation: &Option<CancellationToken>,
    ) -> Result<Synthesis, SynthesisError> {
        if evidence.is_empty() {
            return Err(SynthesisError::NoEvidence);
        }

        let request = build_request(intent, evidence);
        let response =
            complete_with_timeout(self.oracle.as_ref(), &request, self.timeout, cancellation).await?;

        let draft = response
            .map_err(|e| e.to_string())
            .and_then(|value| DraftAnswer::from_oracle(&value).map_err(|e| e.to_string()));

        match draft {
            Ok(draft) => {
                let (answer, dropped) = Answer::finalize(draft, evidence, confidence_cap);
                if dropped > 0 {
                    warn!("Dropped {} citations not present in the evidence", dropped);
                }
                debug!(
                    "Answer drafted: confidence {:.2}, {} citations",
                    answer.confidence,
                    answer.citations.len()
                );
                Ok(Synthesis {
                    answer,
                    dropped_citations: dropped,
                    degraded: None,
                })
            }
            Err(reason) => {
                warn!("Synthesis degraded, answering extractively: {}", reason);
                Ok(Synthesis {
                    answer: extractive_answer(evidence, confidence_cap),
                    dropped_citations: 0,
                    degraded: Some(reason),
                })
            }
        }
    }
}

/// Quote the top chunk of each of the first few sources.
fn extractive_answer(evidence: &EvidenceSet, confidence_cap: Option<f64>) -> Answer {
    let mut text = String::from("Relevant evidence found:\n");
    let mut citations = Vec::new();

    for (store, chunks) in evidence.grouped().into_iter().take(FALLBACK_SOURCES) {
        let Some(top) = chunks.first() else { continue };
        let locator = top.locator();
        text.push_str(&format!(
            "\n- [{}] {}: {}",
            store,
            locator,
            excerpt(top.content(), FALLBACK_EXCERPT_BYTES).trim()
        ));
        citations.push(Citation {
            source_db: store,
            locator,
        });
    }

    Answer {
        answer: text,
        confidence: bound_confidence(FALLBACK_CONFIDENCE, confidence_cap),
        citations,
        learned_insight: None,
    }
}

fn build_request(intent: &QueryIntent, evidence: &EvidenceSet) -> OracleRequest {
    let chunks: Vec<_> = evidence
        .iter()
        .map(|c| {
            json!({
                "source_db": c.source_db(),
                "locator": c.locator(),
                "relevance_score": c.relevance_score,
                "content": c.content(),
            })
        })
        .collect();

    OracleRequest::new(
        OracleSchema::Answer,
        PromptTemplate::answer_system(),
        PromptTemplate::answer_prompt(intent, evidence),
    )
    .with_context(json!({
        "intent": intent,
        "evidence": chunks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::oracle::OracleError;
    use crate::use_cases::test_support::ScriptedOracle;
    use evidence_domain::{
        ChunkMetadata, CodeMetadata, Complexity, DocsMetadata, EvidenceChunk, IntentCategory,
        Question, StoreId,
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
        set.merge(vec![
            EvidenceChunk::new(
                StoreId::Docs,
                "Authentication uses JWT tokens.",
                ChunkMetadata::Docs(DocsMetadata {
                    doc_type: "api".to_string(),
                    section: "auth".to_string(),
                    version: None,
                }),
                0.9,
            ),
            EvidenceChunk::new(
                StoreId::Code,
                "fn verify_token(token: &str) -> bool",
                ChunkMetadata::Code(CodeMetadata {
                    file_path: "src/auth.rs".to_string(),
                    language: "rust".to_string(),
                    function_name: None,
                    line_range: None,
                }),
                0.7,
            ),
        ]);
        set
    }

    fn synthesizer(oracle: ScriptedOracle) -> SynthesizeAnswerUseCase {
        SynthesizeAnswerUseCase::new(Arc::new(oracle), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_citations_filtered_to_evidence() {
        let oracle = ScriptedOracle::new().respond(
            OracleSchema::Answer,
            json!({
                "answer": "JWT tokens verified by verify_token.",
                "confidence": 0.85,
                "citations": [
                    {"source_db": "docs", "locator": "api/auth"},
                    {"source_db": "code", "locator": "src/auth.rs"},
                    {"source_db": "tickets", "locator": "BUG-404"}
                ]
            }),
        );
        let synthesis = synthesizer(oracle)
            .execute(&intent(), &evidence(), None, &None)
            .await
            .unwrap();
        assert_eq!(synthesis.answer.citations.len(), 2);
        assert_eq!(synthesis.dropped_citations, 1);
        assert_eq!(synthesis.answer.confidence, 0.85);
    }

    #[tokio::test]
    async fn test_cap_applied_when_exhausted() {
        let oracle = ScriptedOracle::new().respond(
            OracleSchema::Answer,
            json!({"answer": "Probably JWT.", "confidence": 0.95}),
        );
        let synthesis = synthesizer(oracle)
            .execute(&intent(), &evidence(), Some(0.5), &None)
            .await
            .unwrap();
        assert_eq!(synthesis.answer.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_empty_evidence_is_an_error() {
        let oracle = ScriptedOracle::new()
            .respond(OracleSchema::Answer, json!({"answer": "made up", "confidence": 1.0}));
        let result = synthesizer(oracle)
            .execute(&intent(), &EvidenceSet::new(), None, &None)
            .await;
        assert_eq!(result.unwrap_err(), SynthesisError::NoEvidence);
    }

    #[tokio::test]
    async fn test_oracle_failure_gives_extractive_answer() {
        let oracle = ScriptedOracle::new().fail(OracleSchema::Answer, OracleError::Timeout);
        let evidence = evidence();
        let synthesis = synthesizer(oracle)
            .execute(&intent(), &evidence, None, &None)
            .await
            .unwrap();
        assert!(synthesis.degraded.is_some());
        assert_eq!(synthesis.answer.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(synthesis.answer.citations.len(), 2);
        for citation in &synthesis.answer.citations {
            assert!(evidence.find(citation.source_db, &citation.locator).is_some());
        }
        assert!(synthesis.answer.answer.contains("Authentication uses JWT tokens."));
        assert!(synthesis.answer.learned_insight.is_none());
    }
}
