pub mod anthropic;
pub mod client;
pub mod ollama;
pub mod openai;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub use anthropic::AnthropicAdapter;
pub use client::CompletionClient;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Generation parameters applied uniformly to every provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub params: GenerationParams,
}

/// Token accounting, normalized across provider schemas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub usage: Usage,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub name: String,
    /// Base URL of the provider API.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Only enabled providers are ever attempted.
    pub enabled: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// One completion backend. Adapters translate the universal request into the
/// provider's wire format and normalize its reply; they never retry.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn config(&self) -> &ProviderConfig;

    fn name(&self) -> &str {
        &self.config().name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))
}

/// Send a request and return the parsed JSON body.
///
/// Non-2xx replies become `Transport` errors carrying the provider's own
/// error message when one can be found in the body.
pub(crate) async fn send_json(
    provider: &str,
    req: reqwest::RequestBuilder,
) -> Result<serde_json::Value> {
    let resp = req.send().await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(Error::Transport(format!(
            "{} returned {}: {}",
            provider,
            status,
            error_detail(&text)
        )));
    }

    debug!(provider, status = %status, len = text.len(), "provider replied");
    serde_json::from_str(&text)
        .map_err(|e| Error::Decode(format!("{} sent malformed JSON: {}", provider, e)))
}

/// Best-effort extraction of an error message from the known error shapes:
/// `{"error": {"message": ..}}`, `{"error": ".."}` and `{"message": ..}`.
fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let message = json["error"]["message"]
            .as_str()
            .or_else(|| json["error"].as_str())
            .or_else(|| json["message"].as_str());
        if let Some(m) = message {
            return m.to_string();
        }
    }
    let snippet: String = body.chars().take(200).collect();
    if snippet.is_empty() {
        "<empty body>".to_string()
    } else {
        snippet
    }
}

pub(crate) fn missing_field(provider: &str, path: &str) -> Error {
    Error::Decode(format!("{} reply has no {}", provider, path))
}
