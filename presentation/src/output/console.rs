//! Console output formatter for query outcomes

use colored::Colorize;
use evidence_application::{InsightOutcome, QueryOutcome};
use evidence_domain::{OutputFormat, StoreId, TerminalState};
use std::path::PathBuf;

/// Formats query outcomes for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Render an outcome in the requested format
    pub fn render(question: &str, outcome: &QueryOutcome, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format_full(question, outcome),
            OutputFormat::Answer => Self::format_answer(outcome),
            OutputFormat::Json => Self::format_json(outcome),
        }
    }

    /// Answer, confidence, citations, advisories and round summary
    pub fn format_full(question: &str, outcome: &QueryOutcome) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Evidence Router"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Question:".cyan().bold(), question));
        output.push_str(&format!(
            "{} {} after {} round{} ({} chunks)\n",
            "Status:".cyan().bold(),
            Self::terminal_label(outcome.terminal_state),
            outcome.rounds,
            if outcome.rounds == 1 { "" } else { "s" },
            outcome.evidence_count
        ));

        output.push_str(&Self::section_header("Answer"));
        output.push_str(&format!("\n{}\n", outcome.answer.answer));
        output.push_str(&format!(
            "\n{} {:.2}\n",
            "Confidence:".cyan().bold(),
            outcome.answer.confidence
        ));

        output.push_str(&Self::section_header("Citations"));
        if outcome.answer.citations.is_empty() {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        for citation in &outcome.answer.citations {
            output.push_str(&format!(
                "  * {} {}\n",
                format!("[{}]", citation.source_db).yellow(),
                citation.locator
            ));
        }

        if !outcome.advisories.is_empty() {
            output.push_str(&Self::section_header("Advisories"));
            for advisory in &outcome.advisories {
                output.push_str(&format!("  {} {}\n", "!".yellow().bold(), advisory));
            }
        }

        if !outcome.degradations.is_empty() {
            output.push_str(&format!("\n{}\n", "Degraded steps:".dimmed()));
            for degradation in &outcome.degradations {
                output.push_str(&format!("  - {}\n", degradation.kind().dimmed()));
            }
        }

        if let Some(insight) = &outcome.insight {
            output.push_str(&format!(
                "\n{} {}\n",
                "Memory:".dimmed(),
                Self::insight_label(insight)
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Answer text only
    pub fn format_answer(outcome: &QueryOutcome) -> String {
        let mut output = outcome.answer.answer.trim_end().to_string();
        output.push('\n');
        output
    }

    /// Format as JSON
    pub fn format_json(outcome: &QueryOutcome) -> String {
        serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per store: id, chunk count and backing file
    pub fn format_stats(stores: &[(StoreId, usize, PathBuf)]) -> String {
        let mut output = format!("{}\n", "Stores".cyan().bold());
        for (id, chunks, path) in stores {
            output.push_str(&format!(
                "  {:<8} {:>6} chunk{} {}\n",
                id.as_str().yellow(),
                chunks,
                if *chunks == 1 { " " } else { "s" },
                path.display().to_string().dimmed()
            ));
        }
        let total: usize = stores.iter().map(|(_, chunks, _)| chunks).sum();
        output.push_str(&format!("  {:<8} {:>6}\n", "total".bold(), total));
        output
    }

    fn terminal_label(state: TerminalState) -> String {
        match state {
            TerminalState::Answered => state.as_str().green().bold().to_string(),
            TerminalState::Exhausted => state.as_str().yellow().bold().to_string(),
            _ => state.as_str().red().bold().to_string(),
        }
    }

    fn insight_label(insight: &InsightOutcome) -> String {
        match insight {
            InsightOutcome::Written { chunk_id, .. } => format!("insight saved as {}", chunk_id),
            InsightOutcome::Skipped(skip) => format!("no insight ({})", skip.as_str()),
            InsightOutcome::Duplicate => "insight already known".to_string(),
            InsightOutcome::Failed(reason) => format!("insight not saved: {}", reason),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}
