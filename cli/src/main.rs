//! CLI entrypoint for evidence-router
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use evidence_application::{
    NoProgress, ProgressNotifier, ReasoningOracle, RunQueryError, RunQueryInput, RunQueryUseCase,
    SemanticStore, StoreRegistry,
};
use evidence_domain::StoreId;
use evidence_infrastructure::{
    ConfigLoader, FileConfig, FileOracleConfig, JsonlConversationLogger, JsonlSemanticStore,
    OracleProvider, RuleBasedOracle, read_records,
};
use evidence_presentation::{Cli, Command, ConsoleFormatter, ProgressReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        show_config_paths(cli.config.as_deref());
        return Ok(());
    }

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_without_files()
    } else {
        ConfigLoader::load(cli.config.as_deref())
    }
    .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    config.validate().context("Invalid configuration")?;

    if !config.output.color {
        colored::control::set_override(false);
    }

    // Held until exit so buffered file logs are flushed
    let _log_guard = init_logging(cli.verbose, config.logging.log_dir.as_deref());

    match cli.command {
        Some(Command::Ask {
            question,
            max_retries,
            output,
        }) => {
            let format = output
                .map(evidence_domain::OutputFormat::from)
                .or(config.output.format)
                .unwrap_or_default();
            ask(&config, question, max_retries, format, cli.quiet).await
        }
        Some(Command::Ingest { store, file }) => ingest(&config, store.into(), &file).await,
        Some(Command::Stats) => stats(&config),
        None => bail!("A command is required. Try `evidence-router ask \"<question>\"`."),
    }
}

/// Initialize logging based on verbosity level
///
/// `RUST_LOG` wins over `-v` when set. With a log directory, a daily
/// rolling file receives the same events without ANSI colors.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "evidence-router.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

async fn ask(
    config: &FileConfig,
    question: String,
    max_retries: Option<u32>,
    format: evidence_domain::OutputFormat,
    quiet: bool,
) -> Result<()> {
    info!("Starting evidence-router");

    // === Dependency Injection ===
    let stores = Arc::new(open_stores(config)?);
    let oracle = build_oracle(&config.oracle)?;
    info!("Oracle: {}, stores: {}", oracle.name(), stores.len());

    let mut use_case = RunQueryUseCase::new(oracle, stores, config.to_params());
    if let Some(dir) = &config.logging.transcript_dir {
        match JsonlConversationLogger::in_dir(dir) {
            Some(logger) => {
                info!("Transcript: {}", logger.path().display());
                use_case = use_case.with_conversation_logger(Arc::new(logger));
            }
            None => warn!("Transcript disabled: cannot write to {}", dir.display()),
        }
    }

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut input = RunQueryInput::new(question.clone()).with_cancellation(cancellation);
    if let Some(max) = max_retries {
        input = input.with_max_retries(max);
    }

    let progress: Box<dyn ProgressNotifier> = if quiet {
        Box::new(NoProgress)
    } else {
        Box::new(ProgressReporter::new())
    };

    match use_case.execute_with_progress(input, progress.as_ref()).await {
        Ok(outcome) => {
            let text = ConsoleFormatter::render(&question, &outcome, format);
            println!("{}", text.trim_end());
            Ok(())
        }
        Err(RunQueryError::Cancelled) => {
            eprintln!("Cancelled.");
            std::process::exit(130);
        }
        Err(e) => Err(e.into()),
    }
}

async fn ingest(config: &FileConfig, store_id: StoreId, file: &Path) -> Result<()> {
    let records = read_records(file)?;
    let store = JsonlSemanticStore::in_dir(&config.stores.data_dir, store_id)
        .with_context(|| format!("Cannot open the {} store", store_id))?;

    let total = records.len();
    for (index, record) in records.into_iter().enumerate() {
        store
            .store(record)
            .await
            .with_context(|| format!("Record {} of {} was not stored", index + 1, total))?;
    }

    println!(
        "Ingested {} record{} into {} ({})",
        total,
        if total == 1 { "" } else { "s" },
        store_id,
        store.path().display()
    );
    Ok(())
}

fn stats(config: &FileConfig) -> Result<()> {
    let mut rows = Vec::new();
    for id in config.enabled_stores()? {
        let store = JsonlSemanticStore::in_dir(&config.stores.data_dir, id)
            .with_context(|| format!("Cannot open the {} store", id))?;
        rows.push((id, store.len(), store.path().to_path_buf()));
    }
    print!("{}", ConsoleFormatter::format_stats(&rows));
    Ok(())
}

fn open_stores(config: &FileConfig) -> Result<StoreRegistry> {
    let mut registry = StoreRegistry::new();
    for id in config.enabled_stores()? {
        let store = JsonlSemanticStore::in_dir(&config.stores.data_dir, id)
            .with_context(|| format!("Cannot open the {} store", id))?;
        info!("Store {}: {} chunks", id, store.len());
        registry.register(Arc::new(store));
    }
    Ok(registry)
}

fn build_oracle(oracle: &FileOracleConfig) -> Result<Arc<dyn ReasoningOracle>> {
    match oracle.provider {
        OracleProvider::Rules => Ok(Arc::new(RuleBasedOracle::new())),
        OracleProvider::Http => http_oracle(oracle),
    }
}

#[cfg(feature = "http-oracle")]
fn http_oracle(oracle: &FileOracleConfig) -> Result<Arc<dyn ReasoningOracle>> {
    let api_key = std::env::var(&oracle.api_key_env).ok();
    if api_key.is_none() {
        warn!("{} is not set; sending requests without a key", oracle.api_key_env);
    }
    let http = evidence_infrastructure::HttpOracle::new(
        &oracle.endpoint,
        &oracle.model,
        api_key,
        std::time::Duration::from_secs(oracle.timeout_seconds),
    )?;
    Ok(Arc::new(http))
}

#[cfg(not(feature = "http-oracle"))]
fn http_oracle(_oracle: &FileOracleConfig) -> Result<Arc<dyn ReasoningOracle>> {
    bail!("This build has no HTTP oracle; rebuild with the `http-oracle` feature")
}

fn show_config_paths(explicit: Option<&Path>) {
    println!("Configuration files (lowest to highest priority):");
    let describe = |label: &str, path: Option<PathBuf>| match path {
        Some(path) => {
            let state = if path.exists() { "found" } else { "missing" };
            println!("  {:<8} {} ({})", label, path.display(), state);
        }
        None => println!("  {:<8} (none)", label),
    };
    describe("global", ConfigLoader::global_config_path());
    describe("project", ConfigLoader::project_config_path());
    describe("explicit", explicit.map(Path::to_path_buf));
    println!("  Environment: RETRIEVAL_TOP_K, MAX_RETRY_ATTEMPTS, EVIDENCE_ROUTER_<SECTION>__<KEY>");
}
