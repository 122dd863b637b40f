//! Routing: which stores to consult in a round, and how.
//!
//! - [`StorePlan`]: the validated, non-empty per-round selection
//! - [`RoutingDecision`]: the oracle's raw proposal, checked against the store universe

use crate::core::error::DomainError;
use crate::parsing::{ParseError, decode};
use crate::store::store_id::{StoreId, format_store_set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// How a plan's stores are queried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    /// All stores concurrently, joined before merging
    #[default]
    Parallel,
    /// One store at a time in canonical order; may stop early
    Sequential,
}

impl RetrievalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStrategy::Parallel => "parallel",
            RetrievalStrategy::Sequential => "sequential",
        }
    }

    fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Some(RetrievalStrategy::Parallel),
            "sequential" => Some(RetrievalStrategy::Sequential),
            _ => None,
        }
    }
}

impl std::fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Store selection for one orchestration round (Value Object)
///
/// `selected_stores` is never empty and `round` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorePlan {
    selected_stores: BTreeSet<StoreId>,
    strategy: RetrievalStrategy,
    round: u32,
}

impl StorePlan {
    pub fn new(
        selected_stores: BTreeSet<StoreId>,
        strategy: RetrievalStrategy,
        round: u32,
    ) -> Result<Self, DomainError> {
        if selected_stores.is_empty() {
            return Err(DomainError::EmptyPlan);
        }
        Ok(Self {
            selected_stores,
            strategy,
            round: round.max(1),
        })
    }

    /// The whole store universe, queried in parallel.
    pub fn full(round: u32) -> Self {
        Self {
            selected_stores: StoreId::universe(),
            strategy: RetrievalStrategy::Parallel,
            round: round.max(1),
        }
    }

    pub fn selected_stores(&self) -> &BTreeSet<StoreId> {
        &self.selected_stores
    }

    pub fn strategy(&self) -> RetrievalStrategy {
        self.strategy
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn contains(&self, store: StoreId) -> bool {
        self.selected_stores.contains(&store)
    }

    /// Stores in canonical query order.
    pub fn ordered(&self) -> impl Iterator<Item = StoreId> + '_ {
        self.selected_stores.iter().copied()
    }

    /// Stores in this plan that are not in `previous`.
    pub fn new_stores(&self, previous: &BTreeSet<StoreId>) -> BTreeSet<StoreId> {
        self.selected_stores
            .difference(previous)
            .copied()
            .collect()
    }
}

impl std::fmt::Display for StorePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "round {} [{}] ({})",
            self.round,
            format_store_set(&self.selected_stores),
            self.strategy
        )
    }
}

/// The oracle's routing proposal after validation
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub selected_stores: BTreeSet<StoreId>,
    /// `None` when the oracle omitted the strategy or named an unknown one
    pub strategy: Option<RetrievalStrategy>,
    /// Whether the oracle considers another round worthwhile
    pub retry_allowed: bool,
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRoutingDecision {
    #[serde(alias = "selected_dbs", alias = "stores")]
    selected_stores: Vec<String>,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    retry_allowed: Option<bool>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl RoutingDecision {
    /// Validate an oracle payload.
    ///
    /// Fails when the selection is empty or names a store outside the universe.
    pub fn from_oracle(value: &Value) -> Result<Self, ParseError> {
        let raw: RawRoutingDecision = decode(value)?;

        let mut selected_stores = BTreeSet::new();
        for name in &raw.selected_stores {
            let store: StoreId = name
                .parse()
                .map_err(|_| ParseError::invalid("selected_stores", format!("unknown store '{}'", name)))?;
            selected_stores.insert(store);
        }
        if selected_stores.is_empty() {
            return Err(ParseError::invalid("selected_stores", "must not be empty"));
        }

        Ok(Self {
            selected_stores,
            strategy: raw
                .strategy
                .as_deref()
                .and_then(RetrievalStrategy::parse_lenient),
            retry_allowed: raw.retry_allowed.unwrap_or(true),
            reasoning: raw.reasoning.filter(|r| !r.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(stores: &[StoreId]) -> BTreeSet<StoreId> {
        stores.iter().copied().collect()
    }

    #[test]
    fn test_empty_plan_rejected() {
        let result = StorePlan::new(BTreeSet::new(), RetrievalStrategy::Parallel, 1);
        assert_eq!(result, Err(DomainError::EmptyPlan));
    }

    #[test]
    fn test_full_plan_covers_universe() {
        let plan = StorePlan::full(2);
        assert_eq!(plan.selected_stores().len(), 4);
        assert_eq!(plan.round(), 2);
        assert_eq!(plan.strategy(), RetrievalStrategy::Parallel);
    }

    #[test]
    fn test_new_stores_difference() {
        let plan = StorePlan::new(
            set(&[StoreId::Docs, StoreId::Code]),
            RetrievalStrategy::Parallel,
            2,
        )
        .unwrap();
        assert_eq!(plan.new_stores(&set(&[StoreId::Docs])), set(&[StoreId::Code]));
        assert!(plan
            .new_stores(&set(&[StoreId::Docs, StoreId::Code, StoreId::Memory]))
            .is_empty());
    }

    #[test]
    fn test_decision_from_oracle() {
        let decision = RoutingDecision::from_oracle(&json!({
            "selected_stores": ["code", "docs"],
            "strategy": "sequential",
            "reasoning": "explanation needs docs and code"
        }))
        .unwrap();
        assert_eq!(decision.selected_stores, set(&[StoreId::Docs, StoreId::Code]));
        assert_eq!(decision.strategy, Some(RetrievalStrategy::Sequential));
        assert!(decision.retry_allowed);
    }

    #[test]
    fn test_decision_unknown_strategy_is_unspecified() {
        let decision = RoutingDecision::from_oracle(&json!({
            "selected_dbs": ["tickets"],
            "strategy": "whenever",
            "retry_allowed": false
        }))
        .unwrap();
        assert_eq!(decision.strategy, None);
        assert!(!decision.retry_allowed);
    }

    #[test]
    fn test_decision_rejects_unknown_or_empty_stores() {
        assert!(RoutingDecision::from_oracle(&json!({"selected_stores": ["wiki"]})).is_err());
        assert!(RoutingDecision::from_oracle(&json!({"selected_stores": []})).is_err());
        assert!(RoutingDecision::from_oracle(&json!({"strategy": "parallel"})).is_err());
    }
}
