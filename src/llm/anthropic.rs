use std::time::Duration;

use async_trait::async_trait;

use super::{
    http_client, missing_field, send_json, CompletionRequest, CompletionResponse, Message,
    ProviderAdapter, ProviderConfig, Usage,
};
use crate::error::Result;

pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API.
///
/// System messages are lifted into the top-level `system` field; all other
/// messages keep their order.
pub struct AnthropicAdapter {
    client: reqwest::Client,
    config: ProviderConfig,
    version: String,
}

impl AnthropicAdapter {
    pub fn new(config: ProviderConfig, version: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
            version: version.into(),
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        if base.ends_with("/messages") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/messages", base)
        } else {
            format!("{}/v1/messages", base)
        }
    }
}

fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();
    let rest = messages.iter().filter(|m| m.role != "system").collect();
    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, rest)
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let (system, messages) = split_system(&request.messages);
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": request.params.temperature,
            "max_tokens": request.params.max_tokens,
        });
        if let Some(system) = system {
            body["system"] = serde_json::Value::String(system);
        }

        let mut req = self
            .client
            .post(self.endpoint())
            .header("anthropic-version", &self.version)
            .json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.header("x-api-key", key);
        }

        let json = send_json(&self.config.name, req).await?;

        let blocks = json["content"]
            .as_array()
            .ok_or_else(|| missing_field(&self.config.name, "content"))?;
        let text: Vec<&str> = blocks
            .iter()
            .filter(|b| b["type"].as_str().unwrap_or("text") == "text")
            .filter_map(|b| b["text"].as_str())
            .collect();
        if text.is_empty() {
            return Err(missing_field(&self.config.name, "content[].text"));
        }

        Ok(CompletionResponse {
            content: text.concat(),
            provider: self.config.name.clone(),
            model: json["model"]
                .as_str()
                .unwrap_or(&self.config.model)
                .to_string(),
            usage: Usage {
                input_tokens: json["usage"]["input_tokens"].as_u64(),
                output_tokens: json["usage"]["output_tokens"].as_u64(),
            },
        })
    }
}
