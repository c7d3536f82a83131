use std::time::Duration;

use async_trait::async_trait;

use super::{
    http_client, missing_field, send_json, CompletionRequest, CompletionResponse, ProviderAdapter,
    ProviderConfig, Usage,
};
use crate::error::Result;

/// Ollama's native `/api/chat` endpoint, non-streaming.
pub struct OllamaAdapter {
    client: reqwest::Client,
    config: ProviderConfig,
    keep_alive: Option<String>,
}

impl OllamaAdapter {
    pub fn new(config: ProviderConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
            keep_alive: None,
        })
    }

    /// How long Ollama keeps the model loaded after the call, e.g. `5m`.
    pub fn with_keep_alive(mut self, keep_alive: Option<String>) -> Self {
        self.keep_alive = keep_alive.filter(|k| !k.is_empty());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": request.messages,
            "stream": false,
            "options": {
                "temperature": request.params.temperature,
                "num_predict": request.params.max_tokens,
            },
        });
        if let Some(keep_alive) = &self.keep_alive {
            body["keep_alive"] = serde_json::Value::String(keep_alive.clone());
        }

        let json = send_json(&self.config.name, self.client.post(self.endpoint()).json(&body)).await?;

        let content = json["message"]["content"]
            .as_str()
            .ok_or_else(|| missing_field(&self.config.name, "message.content"))?
            .to_string();

        Ok(CompletionResponse {
            content,
            provider: self.config.name.clone(),
            model: json["model"]
                .as_str()
                .unwrap_or(&self.config.model)
                .to_string(),
            usage: Usage {
                input_tokens: json["prompt_eval_count"].as_u64(),
                output_tokens: json["eval_count"].as_u64(),
            },
        })
    }
}
