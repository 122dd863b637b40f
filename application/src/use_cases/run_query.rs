//! Run Query use case
//!
//! Drives one [`OrchestrationSession`] through the state machine:
//!
//! ```text
//! Classifying → Planning → Retrieving → Merging → Evaluating
//!                  ↑                                 │
//!                  └──────────── Looping ←───────────┤ insufficient, rounds left, retry allowed
//!                                    │ no new store  ↓
//!                                    └─────────→ Synthesizing → WritingMemory → Done
//! ```
//!
//! Every collaborator fault is absorbed at the stage where it happens.
//! The caller receives either a [`QueryOutcome`] or a single
//! [`RunQueryError`]; the only failure produced by the stores and the
//! oracle is [`RunQueryError::NoEvidenceAvailable`].

use crate::config::OrchestrationParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::oracle::ReasoningOracle;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::semantic_store::StoreRegistry;
use crate::use_cases::classify_query::ClassifyQueryUseCase;
use crate::use_cases::dispatch_retrieval::DispatchRetrievalUseCase;
use crate::use_cases::evaluate_sufficiency::EvaluateSufficiencyUseCase;
use crate::use_cases::plan_routing::{PlanInput, PlanRoutingUseCase, RetryFeedback};
use crate::use_cases::shared::{Cancelled, check_cancelled};
use crate::use_cases::synthesize_answer::{SynthesisError, SynthesizeAnswerUseCase};
use crate::use_cases::write_insight::{InsightOutcome, WriteInsightUseCase};
use evidence_domain::{
    Advisory, Answer, Degradation, DomainError, OrchestrationSession, QueryIntent, Question,
    SessionState, StoreId, TerminalState, excerpt,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced to the caller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunQueryError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("No evidence available after {rounds} round(s); the answer cannot be grounded")]
    NoEvidenceAvailable { rounds: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Orchestration invariant violated: {0}")]
    Invariant(#[from] DomainError),
}

impl RunQueryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunQueryError::Cancelled)
    }
}

impl From<Cancelled> for RunQueryError {
    fn from(_: Cancelled) -> Self {
        RunQueryError::Cancelled
    }
}

/// Input for the RunQuery use case
#[derive(Debug, Clone)]
pub struct RunQueryInput {
    pub query: String,
    /// Replaces the configured `max_retries` for this query only
    pub max_retries: Option<u32>,
    pub cancellation: Option<CancellationToken>,
}

impl RunQueryInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_retries: None,
            cancellation: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Answer plus the metadata callers need to judge it
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: Answer,
    /// `answered` (sufficient verdict) or `exhausted` (degraded certainty)
    pub terminal_state: TerminalState,
    pub rounds: u32,
    pub evidence_count: usize,
    pub advisories: Vec<Advisory>,
    /// Every state visited, in order
    pub states: Vec<SessionState>,
    #[serde(skip)]
    pub degradations: Vec<Degradation>,
    #[serde(skip)]
    pub insight: Option<InsightOutcome>,
}

impl QueryOutcome {
    pub fn is_exhausted(&self) -> bool {
        self.terminal_state == TerminalState::Exhausted
    }
}

/// Use case for answering one query from the knowledge stores
pub struct RunQueryUseCase {
    classifier: ClassifyQueryUseCase,
    planner: PlanRoutingUseCase,
    dispatcher: DispatchRetrievalUseCase,
    evaluator: EvaluateSufficiencyUseCase,
    synthesizer: SynthesizeAnswerUseCase,
    insight_writer: WriteInsightUseCase,
    params: OrchestrationParams,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RunQueryUseCase {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        stores: Arc<StoreRegistry>,
        params: OrchestrationParams,
    ) -> Self {
        let timeout = params.oracle_timeout;
        Self {
            classifier: ClassifyQueryUseCase::new(oracle.clone(), timeout),
            planner: PlanRoutingUseCase::new(oracle.clone(), timeout),
            dispatcher: DispatchRetrievalUseCase::new(stores.clone(), params.retrieval.clone()),
            evaluator: EvaluateSufficiencyUseCase::new(oracle.clone(), timeout),
            synthesizer: SynthesizeAnswerUseCase::new(oracle, timeout),
            insight_writer: WriteInsightUseCase::new(
                stores.get(StoreId::Memory),
                params.insight,
                params.retrieval.store_timeout,
            ),
            params,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: RunQueryInput) -> Result<QueryOutcome, RunQueryError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunQueryInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<QueryOutcome, RunQueryError> {
        let question =
            Question::parse(input.query).map_err(|e| RunQueryError::InvalidQuery(e.to_string()))?;
        let max_retries = input.max_retries.unwrap_or(self.params.max_retries);
        let mut session = OrchestrationSession::new(question, max_retries.saturating_add(1));

        info!(
            "Starting query (max {} rounds): {}",
            session.max_rounds(),
            excerpt(session.query().content(), 100)
        );
        progress.on_state_enter(SessionState::Classifying, 0);

        let result = self
            .drive(&mut session, progress, &input.cancellation)
            .await;

        match result {
            Ok((answer, insight)) => {
                let outcome = QueryOutcome {
                    answer,
                    terminal_state: session.terminal_state(),
                    rounds: session.round(),
                    evidence_count: session.evidence().len(),
                    advisories: session.advisories().to_vec(),
                    states: session.trace().to_vec(),
                    degradations: session.degradations().to_vec(),
                    insight: Some(insight),
                };
                self.log_finished(&session, None);
                progress.on_finished(outcome.terminal_state);
                info!(
                    "Query {} after {} round(s)",
                    outcome.terminal_state, outcome.rounds
                );
                Ok(outcome)
            }
            Err(e) => {
                session.fail();
                self.log_finished(&session, Some(&e));
                progress.on_finished(TerminalState::Failed);
                if e.is_cancelled() {
                    info!("Query cancelled in round {}", session.round());
                } else {
                    warn!("Query failed after {} round(s): {}", session.round(), e);
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut OrchestrationSession,
        progress: &dyn ProgressNotifier,
        cancellation: &Option<CancellationToken>,
    ) -> Result<(Answer, InsightOutcome), RunQueryError> {
        // Classifying
        let classification = self.classifier.execute(session.query(), cancellation).await?;
        if let Some(reason) = &classification.degraded {
            session.degrade(Degradation::ClassificationDegraded {
                reason: reason.clone(),
            });
        }
        let intent = classification.intent;
        self.log(
            "query_classified",
            json!({
                "query": session.query().content(),
                "intent": &intent,
                "degraded": classification.degraded,
            }),
        );

        enter(session, SessionState::Planning, progress)?;
        let routing = self
            .planner
            .execute(PlanInput::initial(&intent), cancellation)
            .await?;
        if let Some(reason) = &routing.degraded {
            session.degrade(Degradation::RoutingDegraded {
                round: session.round(),
                reason: reason.clone(),
            });
        }
        self.log_plan(&routing.plan, routing.reasoning.as_deref(), true);
        session.set_pending_plan(routing.plan, routing.retry_allowed);

        loop {
            let plan = session
                .take_pending_plan()
                .ok_or(DomainError::EmptyPlan)?;

            // Retrieving
            enter(session, SessionState::Retrieving, progress)?;
            let retrieval = self
                .dispatcher
                .execute(&plan, session.query(), progress, cancellation)
                .await?;
            session.record_retrieval(plan.selected_stores(), &retrieval.succeeded, &retrieval.failed);
            self.log(
                "retrieval_round",
                json!({
                    "round": session.round(),
                    "strategy": plan.strategy(),
                    "succeeded": &retrieval.succeeded,
                    "failed": &retrieval.failed,
                    "skipped": &retrieval.skipped,
                    "chunks": retrieval.chunks.len(),
                }),
            );

            // Merging
            enter(session, SessionState::Merging, progress)?;
            let stats = session.merge(retrieval.chunks);
            debug!(
                "Merged {} new chunks ({} duplicates), {} total",
                stats.added,
                stats.duplicates,
                session.evidence().len()
            );
            self.log(
                "evidence_merged",
                json!({
                    "round": session.round(),
                    "added": stats.added,
                    "duplicates": stats.duplicates,
                    "total": session.evidence().len(),
                }),
            );

            // Evaluating
            enter(session, SessionState::Evaluating, progress)?;
            let at_cap = session.stores_at_cap(self.params.store_round_cap);
            let evaluation = self
                .evaluator
                .execute(&intent, session.evidence(), session.round(), &at_cap, cancellation)
                .await?;
            if let Some(reason) = &evaluation.degraded {
                session.degrade(Degradation::EvaluationDegraded {
                    round: session.round(),
                    reason: reason.clone(),
                });
            }
            let sufficient = evaluation.verdict.sufficient;
            self.log(
                "verdict",
                json!({
                    "round": session.round(),
                    "verdict": &evaluation.verdict,
                    "degraded": evaluation.degraded,
                }),
            );
            info!(
                "Round {}: {} chunks, {}",
                session.round(),
                session.evidence().len(),
                if sufficient { "sufficient" } else { "insufficient" }
            );
            progress.on_round_complete(session.round(), session.evidence().len(), sufficient);
            session.record_verdict(evaluation.verdict);

            if sufficient {
                session.conclude(true);
                break;
            }
            if !session.has_rounds_left() {
                info!("Round limit reached ({}), answering with available evidence", session.round());
                session.conclude(false);
                break;
            }

            if !session.retry_allowed() {
                info!(
                    "Routing ruled out a round after round {}, answering with available evidence",
                    session.round()
                );
                session.conclude(false);
                break;
            }

            enter(session, SessionState::Looping, progress)?;
            let next = self.plan_retry(session, &intent, cancellation).await?;
            if !next {
                info!("No further progress possible, answering with available evidence");
                session.conclude(false);
                break;
            }
            enter(session, SessionState::Planning, progress)?;
        }

        self.finish(session, &intent, progress, cancellation).await
    }

    /// Plan the next round; returns whether it can make progress.
    ///
    /// A plan that can make progress is left pending on the session.
    async fn plan_retry(
        &self,
        session: &mut OrchestrationSession,
        intent: &QueryIntent,
        cancellation: &Option<CancellationToken>,
    ) -> Result<bool, RunQueryError> {
        let Some(verdict) = session.last_verdict() else {
            return Ok(false);
        };
        let covered = session.covered_stores();
        let next_round = session.round() + 1;
        let routing = self
            .planner
            .execute(
                PlanInput::retry(
                    intent,
                    next_round,
                    RetryFeedback {
                        verdict,
                        last_selection: session.last_selection(),
                        covered: &covered,
                    },
                ),
                cancellation,
            )
            .await?;

        if let Some(reason) = &routing.degraded {
            session.degrade(Degradation::RoutingDegraded {
                round: next_round,
                reason: reason.clone(),
            });
        }
        self.log_plan(&routing.plan, routing.reasoning.as_deref(), routing.progress_possible);

        if routing.progress_possible {
            session.set_pending_plan(routing.plan, routing.retry_allowed);
        }
        Ok(routing.progress_possible)
    }

    async fn finish(
        &self,
        session: &mut OrchestrationSession,
        intent: &QueryIntent,
        progress: &dyn ProgressNotifier,
        cancellation: &Option<CancellationToken>,
    ) -> Result<(Answer, InsightOutcome), RunQueryError> {
        enter(session, SessionState::Synthesizing, progress)?;
        let cap = session
            .is_exhausted()
            .then_some(self.params.degraded_confidence_cap);

        let synthesis = match self
            .synthesizer
            .execute(intent, session.evidence(), cap, cancellation)
            .await
        {
            Ok(synthesis) => synthesis,
            Err(SynthesisError::NoEvidence) => {
                return Err(RunQueryError::NoEvidenceAvailable {
                    rounds: session.round(),
                });
            }
            Err(SynthesisError::Cancelled) => return Err(RunQueryError::Cancelled),
        };
        if let Some(reason) = &synthesis.degraded {
            session.degrade(Degradation::SynthesisDegraded {
                reason: reason.clone(),
            });
        }
        let answer = synthesis.answer;
        self.log(
            "answer",
            json!({
                "confidence": answer.confidence,
                "citations": &answer.citations,
                "dropped_citations": synthesis.dropped_citations,
                "exhausted": session.is_exhausted(),
                "degraded": synthesis.degraded,
            }),
        );

        // The answer is final; nothing below can change it.
        enter(session, SessionState::WritingMemory, progress)?;
        check_cancelled(cancellation)?;
        let degraded = session.is_exhausted() || synthesis.degraded.is_some();
        let insight = self.insight_writer.execute(intent, &answer, degraded).await;
        match &insight {
            InsightOutcome::Written { chunk_id, record } => self.log(
                "insight_written",
                json!({ "chunk_id": chunk_id, "content": record.content, "tags": record.tags }),
            ),
            InsightOutcome::Failed(reason) => {
                session.degrade(Degradation::MemoryWriteFailed {
                    reason: reason.clone(),
                });
            }
            InsightOutcome::Skipped(_) | InsightOutcome::Duplicate => {}
        }

        enter(session, SessionState::Done, progress)?;
        Ok((answer, insight))
    }

    fn log(&self, event_type: &'static str, payload: serde_json::Value) {
        self.conversation_logger
            .log(ConversationEvent::new(event_type, payload));
    }

    fn log_plan(&self, plan: &evidence_domain::StorePlan, reasoning: Option<&str>, progress: bool) {
        self.log(
            "plan_selected",
            json!({
                "round": plan.round(),
                "stores": plan.selected_stores(),
                "strategy": plan.strategy(),
                "reasoning": reasoning,
                "progress_possible": progress,
            }),
        );
    }

    fn log_finished(&self, session: &OrchestrationSession, error: Option<&RunQueryError>) {
        self.log(
            "session_finished",
            json!({
                "terminal_state": session.terminal_state(),
                "rounds": session.round(),
                "states": session.trace(),
                "degradations": session.degradations(),
                "error": error.map(|e| e.to_string()),
            }),
        );
    }
}

/// Transition the session and notify progress.
fn enter(
    session: &mut OrchestrationSession,
    state: SessionState,
    progress: &dyn ProgressNotifier,
) -> Result<(), RunQueryError> {
    session.transition(state)?;
    debug!("State: {} (round {})", state, session.round());
    progress.on_state_enter(state, session.round());
    Ok(())
}
