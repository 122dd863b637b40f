//! Orchestration session (Entity)
//!
//! One session per query execution. It owns the accumulated evidence, the
//! round counter and the state machine; nothing in it is shared with other
//! sessions.

use super::state::{SessionState, TerminalState};
use crate::core::error::DomainError;
use crate::core::question::Question;
use crate::evaluation::SufficiencyVerdict;
use crate::evidence::chunk::EvidenceChunk;
use crate::evidence::evidence_set::{EvidenceSet, MergeStats};
use crate::routing::StorePlan;
use crate::store::store_id::StoreId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A fault absorbed with a safe default; never surfaced as an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    ClassificationDegraded { reason: String },
    RoutingDegraded { round: u32, reason: String },
    EvaluationDegraded { round: u32, reason: String },
    SynthesisDegraded { reason: String },
    MemoryWriteFailed { reason: String },
}

impl Degradation {
    pub fn kind(&self) -> &'static str {
        match self {
            Degradation::ClassificationDegraded { .. } => "classification_degraded",
            Degradation::RoutingDegraded { .. } => "routing_degraded",
            Degradation::EvaluationDegraded { .. } => "evaluation_degraded",
            Degradation::SynthesisDegraded { .. } => "synthesis_degraded",
            Degradation::MemoryWriteFailed { .. } => "memory_write_failed",
        }
    }
}

/// Non-fatal notice returned alongside the answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// Some stores could not be reached in a round
    PartialRetrievalFailure { round: u32, stores: BTreeSet<StoreId> },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::PartialRetrievalFailure { round, stores } => write!(
                f,
                "round {}: unreachable stores: {}",
                round,
                crate::store::store_id::format_store_set(stores)
            ),
        }
    }
}

/// State of one query's orchestration
#[derive(Debug, Clone)]
pub struct OrchestrationSession {
    query: Question,
    max_rounds: u32,
    round: u32,
    state: SessionState,
    terminal_state: TerminalState,
    evidence: EvidenceSet,
    last_verdict: Option<SufficiencyVerdict>,
    /// Successful query rounds per store
    store_rounds: BTreeMap<StoreId, u32>,
    /// Selection of the most recent round
    last_selection: BTreeSet<StoreId>,
    pending_plan: Option<StorePlan>,
    /// Whether the current round's plan permits a following round
    retry_allowed: bool,
    trace: Vec<SessionState>,
    degradations: Vec<Degradation>,
    advisories: Vec<Advisory>,
}

impl OrchestrationSession {
    /// Start a session in `Classifying`. `max_rounds` is at least 1.
    pub fn new(query: Question, max_rounds: u32) -> Self {
        Self {
            query,
            max_rounds: max_rounds.max(1),
            round: 0,
            state: SessionState::Classifying,
            terminal_state: TerminalState::Running,
            evidence: EvidenceSet::new(),
            last_verdict: None,
            store_rounds: BTreeMap::new(),
            last_selection: BTreeSet::new(),
            pending_plan: None,
            retry_allowed: true,
            trace: vec![SessionState::Classifying],
            degradations: Vec::new(),
            advisories: Vec::new(),
        }
    }

    /// Move to `next`, enforcing the state machine.
    ///
    /// Entering `Planning` starts a new round; it fails with
    /// [`DomainError::RoundLimitExceeded`] when that would pass `max_rounds`.
    pub fn transition(&mut self, next: SessionState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        if next == SessionState::Planning {
            let round = self.round + 1;
            if round > self.max_rounds {
                return Err(DomainError::RoundLimitExceeded {
                    round,
                    max: self.max_rounds,
                });
            }
            self.round = round;
        }
        if next == SessionState::Failed {
            self.terminal_state = TerminalState::Failed;
        }
        self.state = next;
        self.trace.push(next);
        Ok(())
    }

    /// Move to `Failed` from wherever the session is.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Failed;
            self.terminal_state = TerminalState::Failed;
            self.trace.push(SessionState::Failed);
        }
    }

    pub fn query(&self) -> &Question {
        &self.query
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn has_rounds_left(&self) -> bool {
        self.round < self.max_rounds
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn terminal_state(&self) -> TerminalState {
        self.terminal_state
    }

    /// Record whether the answer comes from a sufficient verdict.
    pub fn conclude(&mut self, sufficient: bool) {
        self.terminal_state = if sufficient {
            TerminalState::Answered
        } else {
            TerminalState::Exhausted
        };
    }

    pub fn is_exhausted(&self) -> bool {
        self.terminal_state == TerminalState::Exhausted
    }

    pub fn evidence(&self) -> &EvidenceSet {
        &self.evidence
    }

    pub fn merge(&mut self, chunks: Vec<EvidenceChunk>) -> MergeStats {
        self.evidence.merge(chunks)
    }

    pub fn last_verdict(&self) -> Option<&SufficiencyVerdict> {
        self.last_verdict.as_ref()
    }

    pub fn record_verdict(&mut self, verdict: SufficiencyVerdict) {
        self.last_verdict = Some(verdict);
    }

    /// Record which of the round's stores answered and which failed.
    pub fn record_retrieval(
        &mut self,
        selected: &BTreeSet<StoreId>,
        succeeded: &BTreeSet<StoreId>,
        failed: &BTreeSet<StoreId>,
    ) {
        self.last_selection = selected.clone();
        for store in succeeded {
            *self.store_rounds.entry(*store).or_insert(0) += 1;
        }
        if !failed.is_empty() {
            self.advisories.push(Advisory::PartialRetrievalFailure {
                round: self.round,
                stores: failed.clone(),
            });
        }
    }

    /// Stores queried successfully in at least one round.
    pub fn covered_stores(&self) -> BTreeSet<StoreId> {
        self.store_rounds.keys().copied().collect()
    }

    /// Stores that have been queried successfully `cap` times or more.
    pub fn stores_at_cap(&self, cap: u32) -> BTreeSet<StoreId> {
        self.store_rounds
            .iter()
            .filter(|(_, n)| **n >= cap)
            .map(|(store, _)| *store)
            .collect()
    }

    pub fn last_selection(&self) -> &BTreeSet<StoreId> {
        &self.last_selection
    }

    /// Queue the plan for the next round.
    ///
    /// `retry_allowed` is the routing's verdict on a round after that one.
    pub fn set_pending_plan(&mut self, plan: StorePlan, retry_allowed: bool) {
        self.pending_plan = Some(plan);
        self.retry_allowed = retry_allowed;
    }

    /// Whether routing left room for a round after the current one.
    pub fn retry_allowed(&self) -> bool {
        self.retry_allowed
    }

    pub fn take_pending_plan(&mut self) -> Option<StorePlan> {
        self.pending_plan.take()
    }

    pub fn degrade(&mut self, degradation: Degradation) {
        self.degradations.push(degradation);
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Every state visited, in order.
    pub fn trace(&self) -> &[SessionState] {
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RetrievalStrategy;

    fn set(stores: &[StoreId]) -> BTreeSet<StoreId> {
        stores.iter().copied().collect()
    }

    fn session(max_rounds: u32) -> OrchestrationSession {
        OrchestrationSession::new(Question::new("How does authentication work?"), max_rounds)
    }

    fn run_round(s: &mut OrchestrationSession) {
        s.transition(SessionState::Planning).unwrap();
        s.transition(SessionState::Retrieving).unwrap();
        s.transition(SessionState::Merging).unwrap();
        s.transition(SessionState::Evaluating).unwrap();
    }

    #[test]
    fn test_rounds_increase_by_one() {
        let mut s = session(3);
        assert_eq!(s.round(), 0);
        run_round(&mut s);
        assert_eq!(s.round(), 1);
        s.transition(SessionState::Looping).unwrap();
        run_round(&mut s);
        assert_eq!(s.round(), 2);
    }

    #[test]
    fn test_round_limit_enforced() {
        let mut s = session(1);
        run_round(&mut s);
        s.transition(SessionState::Looping).unwrap();
        let err = s.transition(SessionState::Planning).unwrap_err();
        assert_eq!(err, DomainError::RoundLimitExceeded { round: 2, max: 1 });
        assert_eq!(s.round(), 1);
        assert_eq!(s.state(), SessionState::Looping);
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut s = session(3);
        let err = s.transition(SessionState::Merging).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(s.state(), SessionState::Classifying);
        assert_eq!(s.trace(), &[SessionState::Classifying]);
    }

    #[test]
    fn test_failed_stores_are_not_covered() {
        let mut s = session(3);
        run_round(&mut s);
        s.record_retrieval(
            &StoreId::universe(),
            &BTreeSet::new(),
            &StoreId::universe(),
        );
        assert!(s.covered_stores().is_empty());
        assert_eq!(s.advisories().len(), 1);
        assert!(!StorePlan::full(2).new_stores(&s.covered_stores()).is_empty());
    }

    #[test]
    fn test_store_round_counts() {
        let mut s = session(3);
        run_round(&mut s);
        let docs = set(&[StoreId::Docs]);
        s.record_retrieval(&docs, &docs, &BTreeSet::new());

        assert_eq!(s.covered_stores(), docs);
        assert_eq!(s.last_selection(), &docs);
        assert_eq!(s.stores_at_cap(1), docs);
        assert!(s.stores_at_cap(2).is_empty());
    }

    #[test]
    fn test_pending_plan_taken_once() {
        let mut s = session(3);
        let plan = StorePlan::new(set(&[StoreId::Code]), RetrievalStrategy::Sequential, 1).unwrap();
        assert!(s.retry_allowed());
        s.set_pending_plan(plan.clone(), false);
        assert_eq!(s.take_pending_plan(), Some(plan));
        assert!(s.take_pending_plan().is_none());
        assert!(!s.retry_allowed());
    }

    #[test]
    fn test_fail_from_any_state() {
        let mut s = session(3);
        s.transition(SessionState::Planning).unwrap();
        s.fail();
        assert_eq!(s.state(), SessionState::Failed);
        assert_eq!(s.terminal_state(), TerminalState::Failed);
        s.fail();
        assert_eq!(s.trace().len(), 3);
    }

    #[test]
    fn test_conclude_sets_terminal_state() {
        let mut s = session(3);
        s.conclude(false);
        assert!(s.is_exhausted());
        s.conclude(true);
        assert_eq!(s.terminal_state(), TerminalState::Answered);
    }
}
