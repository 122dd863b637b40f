//! Grounded answers and the insights learned from them.
//!
//! - [`DraftAnswer`]: the oracle's untrusted draft
//! - [`Answer`]: the finalized answer: citations filtered against the
//!   evidence set, confidence clamped and optionally capped
//! - [`insight::InsightRecord`]: what the insight writer persists

pub mod insight;

use crate::evidence::evidence_set::EvidenceSet;
use crate::parsing::{ParseError, decode};
use crate::store::store_id::StoreId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference from an answer to one chunk of evidence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub source_db: StoreId,
    pub locator: String,
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.source_db, self.locator)
    }
}

/// Citation as the oracle wrote it; the store name is not yet validated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCitation {
    pub source_db: String,
    #[serde(alias = "chunk_id")]
    pub locator: String,
}

/// Oracle-drafted answer before grounding checks
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DraftAnswer {
    pub answer: String,
    pub confidence: f64,
    #[serde(default)]
    pub citations: Vec<RawCitation>,
    #[serde(default)]
    pub learned_insight: Option<String>,
}

impl DraftAnswer {
    pub fn from_oracle(value: &Value) -> Result<Self, ParseError> {
        let draft: DraftAnswer = decode(value)?;
        if draft.answer.trim().is_empty() {
            return Err(ParseError::invalid("answer", "must not be empty"));
        }
        Ok(draft)
    }
}

/// Final answer returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    /// Always within `[0, 1]`
    pub confidence: f64,
    /// Only chunks present in the evidence set at synthesis time
    pub citations: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learned_insight: Option<String>,
}

impl Answer {
    /// Ground a draft against the evidence set.
    ///
    /// Citations naming an unknown store, or a chunk not in `evidence`, are
    /// dropped, as are repeats. Confidence is clamped to `[0, 1]` (non-finite
    /// becomes 0) and then limited to `cap` when given. Returns the answer
    /// and the number of citations dropped.
    pub fn finalize(draft: DraftAnswer, evidence: &EvidenceSet, cap: Option<f64>) -> (Self, usize) {
        let mut citations: Vec<Citation> = Vec::new();
        let mut dropped = 0;

        for raw in draft.citations {
            let grounded = raw
                .source_db
                .parse::<StoreId>()
                .ok()
                .filter(|store| evidence.find(*store, raw.locator.trim()).is_some())
                .map(|store| Citation {
                    source_db: store,
                    locator: raw.locator.trim().to_string(),
                });
            match grounded {
                Some(citation) if !citations.contains(&citation) => citations.push(citation),
                _ => dropped += 1,
            }
        }

        let learned_insight = draft
            .learned_insight
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());

        let answer = Self {
            answer: draft.answer,
            confidence: bound_confidence(draft.confidence, cap),
            citations,
            learned_insight,
        };
        (answer, dropped)
    }

    pub fn cites(&self, store: StoreId) -> bool {
        self.citations.iter().any(|c| c.source_db == store)
    }
}

/// Clamp to `[0, 1]` and apply an optional ceiling.
pub fn bound_confidence(confidence: f64, cap: Option<f64>) -> f64 {
    let clamped = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    match cap {
        Some(cap) => clamped.min(cap.clamp(0.0, 1.0)),
        None => clamped,
    }
}
