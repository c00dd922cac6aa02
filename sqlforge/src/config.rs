//! Runtime configuration from the environment.
//!
//! Values come from environment variables, with a `.env` file loaded
//! first when present. Command-line flags override them in the binary.
//!
//! | Variable                | Default                                          |
//! |-------------------------|--------------------------------------------------|
//! | `SQLFORGE_INPUT_FILE`   | `transformation_files/Transformation_logic.xlsx` |
//! | `SQLFORGE_OUTPUT_FILE`  | `output_with_sql.xlsx`                           |
//! | `DATA_PATH`             | `transformation_files`                           |
//! | `SQLFORGE_PROVIDER`     | `ollama`                                         |
//! | `SQLFORGE_MODEL`        | provider default                                 |
//! | `OLLAMA_HOST`           | `http://localhost:11434`                         |
//! | `ANTHROPIC_API_KEY`     | -                                                |
//! | `SQLFORGE_DIALECT`      | `Apache Spark SQL / Databricks SQL`              |
//! | `SQLFORGE_TIMEOUT_SECS` | `120`                                            |
//! | `SQLFORGE_MAX_TOKENS`   | `1024`                                           |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ai::anthropic::{DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};
use crate::ai::ollama::{DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL};
use crate::ai::DEFAULT_DIALECT;
use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_INPUT_FILE: &str = "transformation_files/Transformation_logic.xlsx";
pub const DEFAULT_OUTPUT_FILE: &str = "output_with_sql.xlsx";
pub const DEFAULT_DATA_PATH: &str = "transformation_files";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which collaborator answers instructions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Ollama,
    Anthropic,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Ollama => DEFAULT_OLLAMA_MODEL,
            Provider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Provider::Ollama => "ollama",
            Provider::Anthropic => "anthropic",
        })
    }
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    /// Directory used by the auxiliary save tool.
    pub data_path: PathBuf,
    pub provider: Provider,
    pub model: String,
    pub ollama_host: String,
    pub anthropic_api_key: Option<String>,
    /// SQL dialect named in generation rules.
    pub dialect: String,
    /// Per collaborator request.
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("SQLFORGE_PROVIDER") {
            Some(p) => p.parse()?,
            None => Provider::default(),
        };

        let timeout_secs = match get("SQLFORGE_TIMEOUT_SECS") {
            Some(v) => parse_number::<u64>("SQLFORGE_TIMEOUT_SECS", &v)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_tokens = match get("SQLFORGE_MAX_TOKENS") {
            Some(v) => parse_number::<u32>("SQLFORGE_MAX_TOKENS", &v)?,
            None => DEFAULT_MAX_TOKENS,
        };

        Ok(Self {
            input_file: get("SQLFORGE_INPUT_FILE")
                .unwrap_or_else(|| DEFAULT_INPUT_FILE.to_string())
                .into(),
            output_file: get("SQLFORGE_OUTPUT_FILE")
                .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string())
                .into(),
            data_path: get("DATA_PATH")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            provider,
            model: get("SQLFORGE_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            ollama_host: get("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            dialect: get("SQLFORGE_DIALECT").unwrap_or_else(|| DEFAULT_DIALECT.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            max_tokens,
        })
    }

    /// Switch provider, resetting the model to that provider's default.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        if self.provider != provider {
            self.model = provider.default_model().to_string();
        }
        self.provider = provider;
        self
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: "expected a positive integer".to_string(),
    })
}
