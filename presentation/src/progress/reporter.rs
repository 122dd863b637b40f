//! Progress reporting for query orchestration

use colored::Colorize;
use evidence_application::ports::progress::ProgressNotifier;
use evidence_application::StoreError;
use evidence_domain::{SessionState, StoreId, TerminalState};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Reports progress with a spinner that follows the session state
pub struct ProgressReporter {
    spinner: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.set_prefix("evidence");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn state_display_name(state: SessionState) -> &'static str {
        match state {
            SessionState::Classifying => "Classifying question",
            SessionState::Planning => "Planning stores",
            SessionState::Retrieving => "Retrieving evidence",
            SessionState::Merging => "Merging evidence",
            SessionState::Evaluating => "Evaluating sufficiency",
            SessionState::Looping => "Widening the search",
            SessionState::Synthesizing => "Writing answer",
            SessionState::WritingMemory => "Saving insight",
            SessionState::Done => "Done",
            SessionState::Failed => "Failed",
        }
    }

    fn store_line(store: StoreId, result: Result<usize, &StoreError>) -> String {
        match result {
            Ok(hits) => format!("  {} {} ({} hits)", "v".green(), store, hits),
            Err(e) => format!("  {} {} ({})", "x".red(), store, e),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_state_enter(&self, state: SessionState, round: u32) {
        let name = Self::state_display_name(state);
        if round == 0 {
            self.spinner.set_message(name.to_string());
        } else {
            self.spinner
                .set_message(format!("{} {}", format!("round {}:", round).dimmed(), name));
        }
    }

    fn on_store_complete(&self, store: StoreId, result: Result<usize, &StoreError>) {
        self.spinner.println(Self::store_line(store, result));
    }

    fn on_round_complete(&self, round: u32, evidence: usize, sufficient: bool) {
        let verdict = if sufficient {
            "sufficient".green()
        } else {
            "insufficient".yellow()
        };
        self.spinner.println(format!(
            "{} round {}: {} chunks, {}",
            "->".cyan(),
            round,
            evidence,
            verdict
        ));
    }

    fn on_finished(&self, terminal: TerminalState) {
        match terminal {
            TerminalState::Failed => self.spinner.abandon_with_message("failed".red().to_string()),
            _ => self.spinner.finish_and_clear(),
        }
    }
}

/// Simple text-based progress (no fancy UI)
///
/// Writes to stderr so machine-readable output on stdout stays clean.
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_state_enter(&self, state: SessionState, round: u32) {
        if matches!(state, SessionState::Planning | SessionState::Synthesizing) {
            eprintln!(
                "{} {} (round {})",
                "->".cyan(),
                ProgressReporter::state_display_name(state).bold(),
                round
            );
        }
    }

    fn on_store_complete(&self, store: StoreId, result: Result<usize, &StoreError>) {
        eprintln!("{}", ProgressReporter::store_line(store, result));
    }

    fn on_finished(&self, terminal: TerminalState) {
        eprintln!("{} {}", "->".cyan(), terminal);
    }
}
