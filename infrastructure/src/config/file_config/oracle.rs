//! Oracle configuration from TOML (`[oracle]` section)

use serde::{Deserialize, Serialize};

/// Which reasoning oracle backs the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    /// Offline keyword and term-overlap heuristics
    #[default]
    Rules,
    /// OpenAI-compatible chat completions endpoint
    Http,
}

/// Raw oracle configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOracleConfig {
    pub provider: OracleProvider,
    /// Base URL; `/chat/completions` is appended
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for FileOracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::Rules,
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_deserialize() {
        let toml_str = r#"
[oracle]
provider = "http"
model = "local-model"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.oracle.provider, OracleProvider::Http);
        assert_eq!(config.oracle.model, "local-model");
        assert_eq!(config.oracle.api_key_env, "OPENAI_API_KEY");
    }
}
