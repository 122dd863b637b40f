//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order
const PROJECT_FILES: [&str; 2] = ["evidence-router.toml", ".evidence-router.toml"];

/// Prefix for `EVIDENCE_ROUTER_<SECTION>__<KEY>` overrides
const ENV_PREFIX: &str = "EVIDENCE_ROUTER_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment: `RETRIEVAL_TOP_K`, `MAX_RETRY_ATTEMPTS`, `EVIDENCE_ROUTER_*`
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./evidence-router.toml` or `./.evidence-router.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/evidence-router/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Load defaults plus environment overrides, skipping every config file
    /// (for --no-config)
    pub fn load_without_files() -> Result<FileConfig, Box<figment::Error>> {
        Self::with_env(Self::defaults()).extract().map_err(Box::new)
    }

    /// Build the merged provider chain without extracting it.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Self::defaults();

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        Self::with_env(figment)
    }

    fn defaults() -> Figment {
        Figment::new().merge(Serialized::defaults(FileConfig::default()))
    }

    fn with_env(figment: Figment) -> Figment {
        figment
            .merge(
                Env::raw()
                    .only(&["RETRIEVAL_TOP_K"])
                    .map(|_| "retrieval.top_k".into()),
            )
            .merge(
                Env::raw()
                    .only(&["MAX_RETRY_ATTEMPTS"])
                    .map(|_| "orchestration.max_retries".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/evidence-router/config.toml if set,
    /// otherwise falls back to ~/.config/evidence-router/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("evidence-router").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}
