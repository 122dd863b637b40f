//! Store configuration from TOML (`[stores]` section)

use evidence_domain::StoreId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw store configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoresConfig {
    /// Directory holding one `<store>.jsonl` file per store
    pub data_dir: PathBuf,
    /// Stores that take part in routing
    pub enabled: Vec<String>,
}

impl Default for FileStoresConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            enabled: StoreId::universe()
                .into_iter()
                .map(|id| id.as_str().to_string())
                .collect(),
        }
    }
}
