use std::time::Duration;

use async_trait::async_trait;

use super::{
    http_client, missing_field, send_json, CompletionRequest, CompletionResponse, ProviderAdapter,
    ProviderConfig, Usage,
};
use crate::error::Result;

/// OpenAI chat completions, also used for OpenAI-compatible servers such as vLLM.
pub struct OpenAiAdapter {
    client: reqwest::Client,
    config: ProviderConfig,
    organization: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(config: ProviderConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
            organization: None,
        })
    }

    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization.filter(|o| !o.is_empty());
        self
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": request.messages,
            "temperature": request.params.temperature,
            "max_tokens": request.params.max_tokens,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        if let Some(org) = &self.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let json = send_json(&self.config.name, req).await?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| missing_field(&self.config.name, "choices[0].message.content"))?
            .to_string();

        let usage = Usage {
            input_tokens: json["usage"]["prompt_tokens"].as_u64(),
            output_tokens: json["usage"]["completion_tokens"].as_u64(),
        };

        Ok(CompletionResponse {
            content,
            provider: self.config.name.clone(),
            model: json["model"]
                .as_str()
                .unwrap_or(&self.config.model)
                .to_string(),
            usage,
        })
    }
}
