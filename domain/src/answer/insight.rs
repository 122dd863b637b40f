//! Learned insights written back to the memory store

use super::Answer;
use crate::intent::QueryIntent;
use crate::store::metadata::{ChunkMetadata, MemoryMetadata};
use serde::Serialize;

/// Why an answer did not produce an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightSkip {
    Disabled,
    NoInsight,
    Degraded,
    LowConfidence,
}

impl InsightSkip {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightSkip::Disabled => "insight writing disabled",
            InsightSkip::NoInsight => "answer carries no learned insight",
            InsightSkip::Degraded => "answer was produced from degraded evidence",
            InsightSkip::LowConfidence => "answer confidence below threshold",
        }
    }
}

/// Decides whether an answered query is worth remembering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsightPolicy {
    pub enabled: bool,
    pub min_confidence: f64,
}

impl Default for InsightPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.6,
        }
    }
}

impl InsightPolicy {
    /// Build the record to persist, or the reason for skipping.
    ///
    /// Exhausted or otherwise degraded answers never become insights.
    pub fn evaluate(
        &self,
        intent: &QueryIntent,
        answer: &Answer,
        degraded: bool,
    ) -> Result<InsightRecord, InsightSkip> {
        if !self.enabled {
            return Err(InsightSkip::Disabled);
        }
        let Some(content) = answer.learned_insight.as_deref() else {
            return Err(InsightSkip::NoInsight);
        };
        if degraded {
            return Err(InsightSkip::Degraded);
        }
        if answer.confidence < self.min_confidence {
            return Err(InsightSkip::LowConfidence);
        }
        Ok(InsightRecord::new(content, intent, answer.confidence))
    }
}

/// Structured insight persisted to the memory store (append-only)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightRecord {
    pub content: String,
    pub learned_from: String,
    pub confidence: f64,
    pub tags: Vec<String>,
}

impl InsightRecord {
    pub fn new(content: impl Into<String>, intent: &QueryIntent, confidence: f64) -> Self {
        let mut tags = vec![intent.topic().to_string()];
        let category = intent.intent_category().as_str().to_string();
        if !tags.contains(&category) {
            tags.push(category);
        }
        Self {
            content: content.into().trim().to_string(),
            learned_from: intent.raw_query().to_string(),
            confidence,
            tags,
        }
    }

    /// Memory metadata stamped with `created_at` (RFC 3339).
    pub fn metadata(&self, created_at: impl Into<String>) -> ChunkMetadata {
        ChunkMetadata::Memory(MemoryMetadata {
            learned_from: self.learned_from.clone(),
            confidence: self.confidence,
            tags: self.tags.clone(),
            created_at: Some(created_at.into()),
        })
    }

    /// True when `existing` holds the same insight text.
    pub fn duplicates(&self, existing: &str) -> bool {
        existing.trim() == self.content
    }
}
