//! Ollama chat client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use super::{GenerateOptions, SqlGenerator};
use crate::error::{AiError, AiResult};

/// Default Ollama server.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default local model.
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3:4b";

/// Client for a local Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    model: String,
    timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

impl OllamaClient {
    pub fn new(host: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout: None,
        }
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.host)
    }

    fn request_body(&self, instruction: &str, options: &GenerateOptions) -> Value {
        serde_json::json!({
            "model": self.model,
            "stream": false,
            "options": { "temperature": options.temperature },
            "messages": [{ "role": "user", "content": instruction }]
        })
    }
}

/// Extract the reply text from a successful `/api/chat` body.
fn parse_reply(body: &str) -> AiResult<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| AiError::InvalidJson(e.to_string()))?;
    if response.message.content.trim().is_empty() {
        return Err(AiError::EmptyReply("ollama".to_string()));
    }
    Ok(response.message.content)
}

#[async_trait]
impl SqlGenerator for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, instruction: &str, options: &GenerateOptions) -> AiResult<String> {
        debug!(model = %self.model, prompt_chars = instruction.len(), "calling ollama");
        trace!(prompt = instruction);

        let mut request = self.http.post(self.endpoint()).json(&self.request_body(instruction, options));
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
            if let Ok(error) = serde_json::from_str::<OllamaError>(&body) {
                return Err(AiError::ApiError(error.error));
            }
            return Err(AiError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let reply = parse_reply(&body)?;
        debug!(reply_chars = reply.len(), "ollama replied");
        trace!(reply = %reply);
        Ok(reply)
    }
}
