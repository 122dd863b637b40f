//! Orchestration states and the transitions between them

use serde::{Deserialize, Serialize};

/// Step of an orchestration session
///
/// ```text
/// Classifying → Planning → Retrieving → Merging → Evaluating
///                  ↑                                 │
///                  └──────────── Looping ←───────────┤
///                                    │               ↓
///                                    └─────────→ Synthesizing → WritingMemory → Done
/// ```
///
/// `Looping → Synthesizing` is taken when the retry plan cannot reach a new
/// store.
///
/// `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Classifying,
    Planning,
    Retrieving,
    Merging,
    Evaluating,
    Looping,
    Synthesizing,
    WritingMemory,
    Done,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Classifying => "classifying",
            SessionState::Planning => "planning",
            SessionState::Retrieving => "retrieving",
            SessionState::Merging => "merging",
            SessionState::Evaluating => "evaluating",
            SessionState::Looping => "looping",
            SessionState::Synthesizing => "synthesizing",
            SessionState::WritingMemory => "writing_memory",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Classifying => "Classifying query",
            SessionState::Planning => "Planning retrieval",
            SessionState::Retrieving => "Retrieving evidence",
            SessionState::Merging => "Merging evidence",
            SessionState::Evaluating => "Evaluating sufficiency",
            SessionState::Looping => "Expanding search",
            SessionState::Synthesizing => "Synthesizing answer",
            SessionState::WritingMemory => "Writing insight",
            SessionState::Done => "Done",
            SessionState::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }

    /// Check whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Classifying, Planning)
                | (Planning, Retrieving)
                | (Retrieving, Merging)
                | (Merging, Evaluating)
                | (Evaluating, Looping)
                | (Evaluating, Synthesizing)
                | (Looping, Planning)
                | (Looping, Synthesizing)
                | (Synthesizing, WritingMemory)
                | (WritingMemory, Done)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a session ended, as seen by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    #[default]
    Running,
    /// Evidence was judged sufficient
    Answered,
    /// Rounds ran out (or no progress was possible) without a sufficient verdict
    Exhausted,
    Failed,
}

impl TerminalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalState::Running => "running",
            TerminalState::Answered => "answered",
            TerminalState::Exhausted => "exhausted",
            TerminalState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            SessionState::Classifying,
            SessionState::Planning,
            SessionState::Retrieving,
            SessionState::Merging,
            SessionState::Evaluating,
            SessionState::Synthesizing,
            SessionState::WritingMemory,
            SessionState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_loop_reenters_planning() {
        assert!(SessionState::Evaluating.can_transition_to(SessionState::Looping));
        assert!(SessionState::Looping.can_transition_to(SessionState::Planning));
        assert!(!SessionState::Looping.can_transition_to(SessionState::Retrieving));
    }

    #[test]
    fn test_loop_without_progress_goes_to_synthesis() {
        assert!(SessionState::Looping.can_transition_to(SessionState::Synthesizing));
        assert!(!SessionState::Looping.can_transition_to(SessionState::WritingMemory));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        assert!(SessionState::Retrieving.can_transition_to(SessionState::Failed));
        assert!(SessionState::Synthesizing.can_transition_to(SessionState::Failed));
        assert!(!SessionState::Done.can_transition_to(SessionState::Failed));
        assert!(!SessionState::Failed.can_transition_to(SessionState::Failed));
    }

    #[test]
    fn test_skipping_steps_is_rejected() {
        assert!(!SessionState::Classifying.can_transition_to(SessionState::Merging));
        assert!(!SessionState::Evaluating.can_transition_to(SessionState::Done));
        assert!(!SessionState::Done.can_transition_to(SessionState::Planning));
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&SessionState::WritingMemory).unwrap();
        assert_eq!(json, "\"writing_memory\"");
    }
}
