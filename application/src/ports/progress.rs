//! Progress notification port
//!
//! Defines the interface for reporting progress while a query is orchestrated.

use crate::ports::semantic_store::StoreError;
use evidence_domain::{SessionState, StoreId, TerminalState};

/// Callback for progress updates during query orchestration
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console spinner, web UI, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when the session enters a new state
    fn on_state_enter(&self, state: SessionState, round: u32);

    /// Called when one store finishes during retrieval
    fn on_store_complete(&self, store: StoreId, result: Result<usize, &StoreError>);

    /// Called after a round has been evaluated
    fn on_round_complete(&self, _round: u32, _evidence: usize, _sufficient: bool) {}

    /// Called once the session ends, successfully or not
    fn on_finished(&self, _terminal: TerminalState) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_state_enter(&self, _state: SessionState, _round: u32) {}
    fn on_store_complete(&self, _store: StoreId, _result: Result<usize, &StoreError>) {}
}
