//! Offline reasoning oracle.
//!
//! Answers every schema from the structured request context with keyword
//! classification, fixed routing principles, a term-coverage sufficiency
//! test and an extractive answer. Needs no network and is deterministic.

use crate::text::{terms, term_list};
use async_trait::async_trait;
use evidence_application::ports::oracle::{
    OracleError, OracleRequest, OracleSchema, ReasoningOracle,
};
use evidence_domain::{IntentCategory, StoreId, excerpt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use tracing::debug;

/// Share of query terms the evidence must mention to count as sufficient
const COVERAGE_THRESHOLD: f64 = 0.6;

/// Chunks quoted in an extractive answer
const ANSWER_CHUNKS: usize = 3;

/// Bytes quoted per chunk
const EXCERPT_BYTES: usize = 200;

const DEBUGGING_CUES: &[&str] = &[
    "error", "errors", "fail", "failed", "fails", "failing", "failure", "bug", "crash", "crashed",
    "broken", "exception", "incident", "outage", "regression", "panic", "timeout",
];
const COMPARISON_CUES: &[&str] = &[
    "compare", "comparison", "versus", "vs", "difference", "differences", "better", "between",
    "tradeoff", "tradeoffs",
];
const HOW_TO_CUES: &[&str] = &[
    "how to", "how do i", "how can i", "steps", "set up", "setup", "configure", "install",
];
const MEMORY_CUES: &[&str] = &[
    "before", "previous", "previously", "again", "last time", "yesterday", "usually", "recurring",
];

#[derive(Debug, Deserialize)]
struct IntentContext {
    raw_query: String,
    intent_category: IntentCategory,
    topic: String,
    memory_relevant: bool,
}

#[derive(Debug, Deserialize)]
struct Feedback {
    #[serde(default)]
    suggested_stores: BTreeSet<StoreId>,
    #[serde(default)]
    covered: BTreeSet<StoreId>,
}

#[derive(Debug, Deserialize)]
struct RoutingContext {
    intent: IntentContext,
    feedback: Option<Feedback>,
}

#[derive(Debug, Deserialize)]
struct EvidenceEntry {
    source_db: StoreId,
    locator: String,
    relevance_score: f64,
    content: String,
}

#[derive(Debug, Deserialize)]
struct EvidenceContext {
    intent: IntentContext,
    #[serde(default)]
    evidence: Vec<EvidenceEntry>,
}

/// Deterministic oracle built from heuristics
#[derive(Debug, Default, Clone)]
pub struct RuleBasedOracle;

impl RuleBasedOracle {
    pub fn new() -> Self {
        Self
    }

    fn classify(&self, context: &Value) -> Result<Value, OracleError> {
        let query = context
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| OracleError::SchemaViolation("context has no query".to_string()))?;
        let lowered = query.to_lowercase();
        let words = term_list(query);
        let has_word = |cues: &[&str]| words.iter().any(|w| cues.contains(&w.as_str()));
        let has_phrase = |cues: &[&str]| cues.iter().any(|cue| lowered.contains(cue));

        let category = if has_word(DEBUGGING_CUES) {
            IntentCategory::Debugging
        } else if has_word(COMPARISON_CUES) {
            IntentCategory::Comparison
        } else if has_phrase(HOW_TO_CUES) {
            IntentCategory::HowTo
        } else {
            IntentCategory::Explanation
        };
        let complexity = match words.len() {
            0..=3 => "low",
            4..=8 => "medium",
            _ => "high",
        };
        let memory_relevant = category == IntentCategory::Debugging || has_phrase(MEMORY_CUES);
        let topic = words
            .iter()
            .find(|w| !DEBUGGING_CUES.contains(&w.as_str()) && !COMPARISON_CUES.contains(&w.as_str()))
            .cloned()
            .unwrap_or_else(|| "general".to_string());

        Ok(json!({
            "intent_category": category,
            "topic": topic,
            "complexity": complexity,
            "memory_relevant": memory_relevant,
        }))
    }

    fn route(&self, context: &Value) -> Result<Value, OracleError> {
        let context: RoutingContext = decode(context)?;
        let intent = &context.intent;
        let preferred = preferred_stores(intent.intent_category, intent.memory_relevant);
        let strategy = if intent.intent_category == IntentCategory::Debugging {
            "sequential"
        } else {
            "parallel"
        };

        let Some(feedback) = context.feedback else {
            return Ok(json!({
                "selected_stores": preferred,
                "strategy": strategy,
                "reasoning": format!("{} questions start from {}", intent.intent_category, join(&preferred)),
            }));
        };

        let suggested: BTreeSet<StoreId> = feedback
            .suggested_stores
            .difference(&feedback.covered)
            .copied()
            .collect();
        let remaining: BTreeSet<StoreId> = StoreId::universe()
            .difference(&feedback.covered)
            .copied()
            .collect();

        if !suggested.is_empty() {
            Ok(json!({
                "selected_stores": suggested,
                "strategy": strategy,
                "reasoning": format!("evaluator suggested {}", join(&suggested)),
            }))
        } else if !remaining.is_empty() {
            Ok(json!({
                "selected_stores": remaining,
                "strategy": "parallel",
                "reasoning": format!("widening to unqueried stores {}", join(&remaining)),
            }))
        } else {
            Ok(json!({
                "selected_stores": preferred,
                "strategy": strategy,
                "retry_allowed": false,
                "reasoning": "every store has already been queried",
            }))
        }
    }

    fn evaluate(&self, context: &Value) -> Result<Value, OracleError> {
        let context: EvidenceContext = decode(context)?;
        let intent = &context.intent;
        let query_terms = terms(&intent.raw_query);
        let evidence_terms: BTreeSet<String> = context
            .evidence
            .iter()
            .flat_map(|e| terms(&format!("{} {}", e.content, e.locator)))
            .collect();

        let missing: Vec<String> = query_terms.difference(&evidence_terms).cloned().collect();
        let coverage = if query_terms.is_empty() {
            1.0
        } else {
            1.0 - missing.len() as f64 / query_terms.len() as f64
        };
        debug!("Rule-based evaluation: term coverage {:.2}", coverage);

        if !context.evidence.is_empty() && coverage >= COVERAGE_THRESHOLD {
            return Ok(json!({"sufficient": true}));
        }

        let seen: BTreeSet<StoreId> = context.evidence.iter().map(|e| e.source_db).collect();
        let mut suggested: BTreeSet<StoreId> =
            preferred_stores(intent.intent_category, intent.memory_relevant)
                .difference(&seen)
                .copied()
                .collect();
        if suggested.is_empty() {
            suggested = StoreId::universe().difference(&seen).copied().collect();
        }

        Ok(json!({
            "sufficient": false,
            "missing_aspects": missing,
            "suggested_stores": suggested,
        }))
    }

    fn answer(&self, context: &Value) -> Result<Value, OracleError> {
        let context: EvidenceContext = decode(context)?;
        let mut ranked: Vec<&EvidenceEntry> = context.evidence.iter().collect();
        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        let quoted: Vec<&EvidenceEntry> = ranked.into_iter().take(ANSWER_CHUNKS).collect();
        if quoted.is_empty() {
            return Err(OracleError::SchemaViolation(
                "no evidence to answer from".to_string(),
            ));
        }

        let mut answer = format!("On {}:", context.intent.topic);
        for entry in &quoted {
            answer.push_str(&format!(
                "\n- {} [{}: {}]",
                first_sentence(&entry.content),
                entry.source_db,
                entry.locator
            ));
        }

        let confidence =
            quoted.iter().map(|e| e.relevance_score).sum::<f64>() / quoted.len() as f64;
        let citations: Vec<Value> = quoted
            .iter()
            .map(|e| json!({"source_db": e.source_db, "locator": e.locator}))
            .collect();
        Ok(json!({
            "answer": answer,
            "confidence": confidence.clamp(0.0, 1.0),
            "citations": citations,
        }))
    }
}

#[async_trait]
impl ReasoningOracle for RuleBasedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        match request.schema {
            OracleSchema::QueryIntent => self.classify(&request.context),
            OracleSchema::StorePlan => self.route(&request.context),
            OracleSchema::SufficiencyVerdict => self.evaluate(&request.context),
            OracleSchema::Answer => self.answer(&request.context),
        }
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// Stores each kind of question is routed to first.
fn preferred_stores(category: IntentCategory, memory_relevant: bool) -> BTreeSet<StoreId> {
    let mut stores: BTreeSet<StoreId> = match category {
        IntentCategory::Explanation | IntentCategory::Comparison => {
            [StoreId::Docs, StoreId::Code].into_iter().collect()
        }
        IntentCategory::Debugging => [StoreId::Tickets, StoreId::Code].into_iter().collect(),
        IntentCategory::HowTo => [StoreId::Docs].into_iter().collect(),
    };
    if memory_relevant {
        stores.insert(StoreId::Memory);
    }
    stores
}

fn decode<T: DeserializeOwned>(context: &Value) -> Result<T, OracleError> {
    serde_json::from_value(context.clone())
        .map_err(|e| OracleError::SchemaViolation(format!("unexpected request context: {}", e)))
}

fn join(stores: &BTreeSet<StoreId>) -> String {
    evidence_domain::format_store_set(stores)
}

fn first_sentence(content: &str) -> &str {
    let trimmed = content.trim();
    let end = [trimmed.find(". ").map(|i| i + 1), trimmed.find('\n')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(trimmed.len());
    excerpt(&trimmed[..end], EXCERPT_BYTES).trim()
}
