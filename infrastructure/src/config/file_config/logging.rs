//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for per-session JSONL transcripts
    pub transcript_dir: Option<PathBuf>,
    /// Directory for the daily rolling operation log
    pub log_dir: Option<PathBuf>,
}
