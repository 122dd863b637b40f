//! Query intent: the classifier's structured reading of a question.

use crate::core::question::Question;
use crate::parsing::{ParseError, decode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the user is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Understand how something works
    Explanation,
    /// Fix an error or understand why something failed
    Debugging,
    /// Compare approaches or implementations
    Comparison,
    /// Step-by-step instructions
    #[serde(alias = "how-to", alias = "howto")]
    HowTo,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Explanation => "explanation",
            IntentCategory::Debugging => "debugging",
            IntentCategory::Comparison => "comparison",
            IntentCategory::HowTo => "how_to",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estimated breadth of the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[serde(alias = "simple")]
    Low,
    #[serde(alias = "moderate")]
    Medium,
    #[serde(alias = "complex")]
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured intent descriptor for one query (immutable once produced)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryIntent {
    raw_query: String,
    intent_category: IntentCategory,
    topic: String,
    complexity: Complexity,
    memory_relevant: bool,
}

/// Wire shape the classifier asks the oracle for.
#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(alias = "intent")]
    intent_category: IntentCategory,
    topic: String,
    complexity: Complexity,
    #[serde(alias = "needs_memory")]
    memory_relevant: bool,
}

impl QueryIntent {
    pub fn new(
        query: &Question,
        intent_category: IntentCategory,
        topic: impl Into<String>,
        complexity: Complexity,
        memory_relevant: bool,
    ) -> Self {
        Self {
            raw_query: query.content().to_string(),
            intent_category,
            topic: topic.into(),
            complexity,
            memory_relevant,
        }
    }

    /// Default used when classification fails: treat the query as a
    /// medium-complexity explanation that may benefit from memory.
    pub fn conservative(query: &Question) -> Self {
        Self::new(
            query,
            IntentCategory::Explanation,
            "general",
            Complexity::Medium,
            true,
        )
    }

    /// Validate an oracle payload into an intent for `query`.
    pub fn from_oracle(query: &Question, value: &Value) -> Result<Self, ParseError> {
        let raw: RawIntent = decode(value)?;
        let topic = raw.topic.trim();
        if topic.is_empty() {
            return Err(ParseError::invalid("topic", "must not be empty"));
        }
        Ok(Self::new(
            query,
            raw.intent_category,
            topic,
            raw.complexity,
            raw.memory_relevant,
        ))
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn intent_category(&self) -> IntentCategory {
        self.intent_category
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn memory_relevant(&self) -> bool {
        self.memory_relevant
    }
}
