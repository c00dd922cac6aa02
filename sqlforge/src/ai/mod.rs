//! Text-generation collaborator.
//!
//! The pipeline only sees the [`SqlGenerator`] trait: one free-text
//! instruction in, one free-text reply out. Two HTTP clients implement it:
//!
//! - [`OllamaClient`] - local Ollama server (`/api/chat`)
//! - [`AnthropicClient`] - Anthropic Messages API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sqlforge::ai::{GenerateOptions, OllamaClient, SqlGenerator};
//!
//! let client = OllamaClient::new("http://localhost:11434", "gemma3:4b");
//! let reply = client.generate("...", &GenerateOptions::default()).await?;
//! ```

pub mod anthropic;
pub mod ollama;
pub mod prompt;

use async_trait::async_trait;

use crate::config::{Config, Provider};
use crate::error::{AiError, AiResult};

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use prompt::{aggregate_instruction, scalar_instruction, DEFAULT_DIALECT};

/// Sampling settings passed with every instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    /// `0.0` disables sampling randomness.
    pub temperature: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { temperature: 0.0 }
    }
}

/// Something that turns an instruction into SQL text.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Short name used in logs (`ollama`, `anthropic`, ...).
    fn name(&self) -> &str;

    /// Send one instruction and return the raw reply text.
    async fn generate(&self, instruction: &str, options: &GenerateOptions) -> AiResult<String>;
}

/// Build the collaborator selected by `config.provider`.
pub fn build_generator(config: &Config) -> AiResult<Box<dyn SqlGenerator>> {
    match config.provider {
        Provider::Ollama => Ok(Box::new(
            OllamaClient::new(&config.ollama_host, &config.model).with_timeout(config.timeout),
        )),
        Provider::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| AiError::MissingApiKey("ANTHROPIC_API_KEY not set".to_string()))?;
            Ok(Box::new(
                AnthropicClient::new(api_key)
                    .with_model(&config.model)
                    .with_max_tokens(config.max_tokens)
                    .with_timeout(config.timeout),
            ))
        }
    }
}
