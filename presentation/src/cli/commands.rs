//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use evidence_domain::StoreId;
use std::path::PathBuf;

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Answer, confidence, citations, advisories and rounds
    Full,
    /// Only the answer text
    Answer,
    /// JSON output
    Json,
}

impl From<OutputFormat> for evidence_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => evidence_domain::OutputFormat::Full,
            OutputFormat::Answer => evidence_domain::OutputFormat::Answer,
            OutputFormat::Json => evidence_domain::OutputFormat::Json,
        }
    }
}

/// Knowledge store selector for ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    Docs,
    Code,
    Tickets,
    Memory,
}

impl From<StoreArg> for StoreId {
    fn from(store: StoreArg) -> Self {
        match store {
            StoreArg::Docs => StoreId::Docs,
            StoreArg::Code => StoreId::Code,
            StoreArg::Tickets => StoreId::Tickets,
            StoreArg::Memory => StoreId::Memory,
        }
    }
}

/// CLI arguments for evidence-router
#[derive(Parser, Debug)]
#[command(name = "evidence-router")]
#[command(author, version, about = "Answer questions from docs, code, tickets and memory with citations")]
#[command(long_about = r#"
evidence-router answers a question from four knowledge stores (docs, code,
tickets, memory). Each round it plans which stores to query, retrieves and
merges evidence, and judges whether the evidence is enough. It retries with
a wider plan until the evidence suffices or the retry budget runs out, then
answers with citations to the retrieved chunks.

Configuration files are loaded from (in priority order):
1. Environment         RETRIEVAL_TOP_K, MAX_RETRY_ATTEMPTS, EVIDENCE_ROUTER_*
2. --config <path>     Explicit config file
3. ./evidence-router.toml   Project-level config
4. ~/.config/evidence-router/config.toml   Global config

Example:
  evidence-router ask "How does authentication work?"
  evidence-router ask --max-retries 1 -o full "Why did login fail yesterday?"
  evidence-router ingest --store docs docs.jsonl
  evidence-router stats
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files (environment overrides still apply)
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a question from the knowledge stores
    Ask {
        /// The question to answer
        question: String,

        /// Retries after the first round for this question only
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },

    /// Load JSONL records into a store
    Ingest {
        /// Target store
        #[arg(short, long, value_enum)]
        store: StoreArg,

        /// File with one {"content", "metadata"} object per line
        file: PathBuf,
    },

    /// Show chunk counts per store
    Stats,
}
