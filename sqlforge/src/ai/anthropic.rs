//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use super::{GenerateOptions, SqlGenerator};
use crate::error::{AiError, AiResult};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Default model for the anthropic provider.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Default reply budget; one SQL expression fits easily.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic API client
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Option<Duration>,
}

/// Anthropic API response structure
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Anthropic API error response
#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl AnthropicClient {
    /// Create a new client with explicit API key
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn request_body(&self, instruction: &str, options: &GenerateOptions) -> Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": options.temperature,
            "messages": [{ "role": "user", "content": instruction }]
        })
    }
}

/// Concatenate the text blocks of a successful response body.
fn parse_reply(body: &str) -> AiResult<String> {
    let response: AnthropicResponse =
        serde_json::from_str(body).map_err(|e| AiError::InvalidJson(e.to_string()))?;

    let text = response
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(AiError::EmptyReply("anthropic".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl SqlGenerator for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, instruction: &str, options: &GenerateOptions) -> AiResult<String> {
        debug!(model = %self.model, max_tokens = self.max_tokens, prompt_chars = instruction.len(), "calling anthropic");
        trace!(prompt = instruction);

        let mut request = self
            .http
            .post(API_URL)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request_body(instruction, options));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<AnthropicError>(&body) {
                return Err(AiError::ApiError(error.error.message));
            }
            return Err(AiError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let reply = parse_reply(&body)?;
        debug!(reply_chars = reply.len(), "anthropic replied");
        trace!(reply = %reply);
        Ok(reply)
    }
}
