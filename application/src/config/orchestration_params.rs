//! Orchestration parameters: loop control for [`RunQueryUseCase`](crate::use_cases::run_query::RunQueryUseCase).

use super::retrieval_params::RetrievalParams;
use evidence_domain::InsightPolicy;
use std::time::Duration;

/// Loop control parameters.
///
/// | Field | Default |
/// |-------|---------|
/// | `max_retries` | 3 (4 rounds total) |
/// | `degraded_confidence_cap` | 0.5 |
/// | `store_round_cap` | 1 |
/// | `oracle_timeout` | 60s |
#[derive(Debug, Clone)]
pub struct OrchestrationParams {
    /// Extra rounds allowed after the first.
    pub max_retries: u32,
    /// Confidence ceiling for answers produced without a sufficient verdict.
    pub degraded_confidence_cap: f64,
    /// Successful rounds after which a store is no longer suggested by the
    /// evaluator fallback.
    pub store_round_cap: u32,
    /// Timeout applied to every oracle call.
    pub oracle_timeout: Duration,
    pub insight: InsightPolicy,
    pub retrieval: RetrievalParams,
}

impl Default for OrchestrationParams {
    fn default() -> Self {
        Self {
            max_retries: 3,
            degraded_confidence_cap: 0.5,
            store_round_cap: 1,
            oracle_timeout: Duration::from_secs(60),
            insight: InsightPolicy::default(),
            retrieval: RetrievalParams::default(),
        }
    }
}

impl OrchestrationParams {
    /// Total rounds a session may run.
    pub fn max_rounds(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    // ==================== Builder Methods ====================

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_degraded_confidence_cap(mut self, cap: f64) -> Self {
        self.degraded_confidence_cap = cap;
        self
    }

    pub fn with_store_round_cap(mut self, cap: u32) -> Self {
        self.store_round_cap = cap.max(1);
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn with_insight_policy(mut self, policy: InsightPolicy) -> Self {
        self.insight = policy;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalParams) -> Self {
        self.retrieval = retrieval;
        self
    }
}
