//! Plan Routing use case
//!
//! Chooses which stores to query in a round. The oracle proposes a
//! selection; invalid proposals fall back to the whole store universe, so
//! a plan is never empty. On retry rounds the plan keeps the previous
//! selection and adds the evaluator's suggestions, and the planner reports
//! whether another round can still reach a store that has not yet answered.

use crate::ports::oracle::{OracleRequest, OracleSchema, ReasoningOracle};
use crate::use_cases::shared::{Cancelled, complete_with_timeout};
use evidence_domain::{
    PromptTemplate, QueryIntent, RetrievalStrategy, RoutingDecision, StoreId, StorePlan,
    SufficiencyVerdict, format_store_set,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the planner knows about earlier rounds
#[derive(Debug, Clone, Copy)]
pub struct RetryFeedback<'a> {
    pub verdict: &'a SufficiencyVerdict,
    /// Selection of the previous round
    pub last_selection: &'a BTreeSet<StoreId>,
    /// Stores that have answered successfully so far
    pub covered: &'a BTreeSet<StoreId>,
}

/// Input for one planning step
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub intent: &'a QueryIntent,
    pub round: u32,
    pub feedback: Option<RetryFeedback<'a>>,
}

impl<'a> PlanInput<'a> {
    pub fn initial(intent: &'a QueryIntent) -> Self {
        Self {
            intent,
            round: 1,
            feedback: None,
        }
    }

    pub fn retry(intent: &'a QueryIntent, round: u32, feedback: RetryFeedback<'a>) -> Self {
        Self {
            intent,
            round,
            feedback: Some(feedback),
        }
    }
}

/// Result of planning
#[derive(Debug, Clone)]
pub struct RoutingOutcome {
    pub plan: StorePlan,
    /// False when the plan cannot reach any store that has not already answered
    pub progress_possible: bool,
    /// False when the oracle rules out another round after this plan's round
    pub retry_allowed: bool,
    /// Why the full-universe fallback was used, if it was
    pub degraded: Option<String>,
    pub reasoning: Option<String>,
}

/// Use case for planning a round's retrieval
pub struct PlanRoutingUseCase {
    oracle: Arc<dyn ReasoningOracle>,
    timeout: Duration,
}

impl PlanRoutingUseCase {
    pub fn new(oracle: Arc<dyn ReasoningOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub async fn execute(
        &self,
        input: PlanInput<'_>,
        cancellation: &Option<CancellationToken>,
    ) -> Result<RoutingOutcome, Cancelled> {
        let request = Self::build_request(&input);
        let response =
            complete_with_timeout(self.oracle.as_ref(), &request, self.timeout, cancellation).await?;

        let decision = response
            .map_err(|e| e.to_string())
            .and_then(|value| RoutingDecision::from_oracle(&value).map_err(|e| e.to_string()));

        let (mut selection, strategy, retry_allowed, reasoning, degraded) = match decision {
            Ok(decision) => (
                decision.selected_stores,
                decision.strategy.unwrap_or_default(),
                decision.retry_allowed,
                decision.reasoning,
                None,
            ),
            Err(reason) => {
                warn!(
                    "Routing degraded in round {}, selecting every store: {}",
                    input.round, reason
                );
                (
                    StoreId::universe(),
                    RetrievalStrategy::Parallel,
                    true,
                    None,
                    Some(reason),
                )
            }
        };

        if let Some(feedback) = &input.feedback {
            selection.extend(feedback.last_selection.iter().copied());
            selection.extend(feedback.verdict.suggested_stores.iter().copied());
        }
        let plan = match StorePlan::new(selection, strategy, input.round) {
            Ok(plan) => plan,
            Err(_) => StorePlan::full(input.round),
        };
        debug!("Planned {}", plan);

        let progress_possible = match &input.feedback {
            None => true,
            Some(feedback) => {
                let fresh = plan.new_stores(feedback.covered);
                if fresh.is_empty() {
                    info!(
                        "Retry plan [{}] adds no store beyond [{}]",
                        format_store_set(plan.selected_stores()),
                        format_store_set(feedback.covered)
                    );
                }
                !fresh.is_empty()
            }
        };
        if !retry_allowed {
            info!("Oracle allows no retrieval round after round {}", input.round);
        }

        Ok(RoutingOutcome {
            plan,
            progress_possible,
            retry_allowed,
            degraded,
            reasoning,
        })
    }

    fn build_request(input: &PlanInput<'_>) -> OracleRequest {
        let feedback = input.feedback.map(|f| (f.verdict, f.covered));
        let context = json!({
            "intent": input.intent,
            "round": input.round,
            "feedback": input.feedback.map(|f| json!({
                "missing_aspects": f.verdict.missing_aspects,
                "suggested_stores": f.verdict.suggested_stores,
                "last_selection": f.last_selection,
                "covered": f.covered,
            })),
        });

        OracleRequest::new(
            OracleSchema::StorePlan,
            PromptTemplate::routing_system(),
            PromptTemplate::routing_prompt(input.intent, input.round, feedback),
        )
        .with_context(context)
    }
}
