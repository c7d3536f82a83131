use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{
    AnthropicAdapter, CompletionRequest, CompletionResponse, GenerationParams, Message,
    OllamaAdapter, OpenAiAdapter, ProviderAdapter, ProviderConfig,
};
use crate::config::Settings;
use crate::error::{Error, ProviderFailure, Result};

/// Routes completion calls to a registry of provider adapters with ordered
/// fallback.
///
/// Providers are tried one at a time, each at most once per call. Fallback
/// only happens when the caller did not name a provider and fallback is
/// enabled.
pub struct CompletionClient {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    primary: String,
    fallback_order: Vec<String>,
    fallback_enabled: bool,
    params: GenerationParams,
    attempt_timeout: Duration,
}

impl CompletionClient {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            primary: primary.into(),
            fallback_order: Vec::new(),
            fallback_enabled: true,
            params: GenerationParams::default(),
            attempt_timeout: Duration::from_secs(30),
        }
    }

    /// Register an adapter under its provider name, replacing any previous one.
    pub fn with_provider(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.insert(adapter.name().to_string(), adapter);
        self
    }

    pub fn with_fallback(mut self, order: Vec<String>, enabled: bool) -> Self {
        self.fallback_order = order;
        self.fallback_enabled = enabled;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Upper bound on a single provider attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Build the four stock adapters from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = settings.request_timeout;
        let p = &settings.providers;

        let openai = OpenAiAdapter::new(p.openai.clone(), timeout)?
            .with_organization(p.openai_organization.clone());
        let anthropic =
            AnthropicAdapter::new(p.anthropic.clone(), p.anthropic_version.clone(), timeout)?;
        let ollama =
            OllamaAdapter::new(p.ollama.clone(), timeout)?.with_keep_alive(p.ollama_keep_alive.clone());
        let vllm = OpenAiAdapter::new(p.vllm.clone(), timeout)?;

        let client = Self::new(settings.primary_provider.clone())
            .with_provider(Arc::new(openai))
            .with_provider(Arc::new(anthropic))
            .with_provider(Arc::new(ollama))
            .with_provider(Arc::new(vllm))
            .with_fallback(settings.fallback_order.clone(), settings.fallback_enabled)
            .with_params(settings.generation)
            .with_timeout(timeout);

        info!(
            primary = %client.primary,
            available = ?client.available_providers(),
            fallback = client.fallback_enabled,
            "Completion client initialized"
        );
        Ok(client)
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Names of enabled providers, sorted.
    pub fn available_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .values()
            .filter(|a| a.config().enabled)
            .map(|a| a.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn provider_info(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name).map(|a| a.config())
    }

    /// All registered providers, sorted by name.
    pub fn providers(&self) -> Vec<&ProviderConfig> {
        let mut configs: Vec<&ProviderConfig> =
            self.providers.values().map(|a| a.config()).collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    /// Complete `messages`, using `provider` if given, else the primary with
    /// fallback.
    pub async fn complete(
        &self,
        messages: &[Message],
        provider: Option<&str>,
    ) -> Result<CompletionResponse> {
        let request = CompletionRequest {
            messages: messages.to_vec(),
            params: self.params,
        };
        let target = provider.unwrap_or(self.primary.as_str());
        let mut failures = Vec::new();

        match self.attempt(target, &request).await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                warn!(provider = target, "Provider failed: {}", e);
                failures.push(ProviderFailure {
                    provider: target.to_string(),
                    error: e,
                });
            }
        }

        if provider.is_none() && self.fallback_enabled {
            let mut tried: HashSet<&str> = HashSet::from([target]);
            for name in &self.fallback_order {
                if !tried.insert(name.as_str()) {
                    continue;
                }
                let Some(adapter) = self.providers.get(name) else {
                    debug!(provider = %name, "fallback provider not registered, skipping");
                    continue;
                };
                if !adapter.config().enabled {
                    debug!(provider = %name, "fallback provider disabled, skipping");
                    continue;
                }

                info!(provider = %name, "Trying fallback provider");
                match self.call(adapter.as_ref(), &request).await {
                    Ok(resp) => return Ok(resp),
                    Err(e) => {
                        warn!(provider = %name, "Fallback provider failed: {}", e);
                        failures.push(ProviderFailure {
                            provider: name.clone(),
                            error: e,
                        });
                    }
                }
            }
        }

        Err(Error::AllProvidersFailed(failures))
    }

    async fn attempt(&self, name: &str, request: &CompletionRequest) -> Result<CompletionResponse> {
        let adapter = self
            .providers
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown provider '{}'", name)))?;
        if !adapter.config().enabled {
            return Err(Error::Config(format!(
                "provider '{}' is not configured or disabled",
                name
            )));
        }
        self.call(adapter.as_ref(), request).await
    }

    async fn call(
        &self,
        adapter: &dyn ProviderAdapter,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        debug!(provider = adapter.name(), model = %adapter.config().model, "calling provider");
        match tokio::time::timeout(self.attempt_timeout, adapter.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transport(format!(
                "{} did not reply within {:?}",
                adapter.name(),
                self.attempt_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Usage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Succeed(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedProvider {
        config: ProviderConfig,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(name: &str, enabled: bool, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                config: ProviderConfig {
                    name: name.to_string(),
                    endpoint: format!("http://{}.invalid", name),
                    model: format!("{}-model", name),
                    api_key: None,
                    enabled,
                },
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedProvider {
        fn config(&self) -> &ProviderConfig {
            &self.config
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed(text) => Ok(CompletionResponse {
                    content: format!("{} ({} messages)", text, request.messages.len()),
                    provider: self.config.name.clone(),
                    model: self.config.model.clone(),
                    usage: Usage::default(),
                }),
                Behavior::Fail => Err(Error::Transport(format!("{} is down", self.config.name))),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(Error::Transport("unreachable".to_string()))
                }
            }
        }
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn messages() -> Vec<Message> {
        vec![Message::user("how do I build it")]
    }

    #[tokio::test]
    async fn test_primary_success_short_circuits() {
        let a = ScriptedProvider::new("a", true, Behavior::Succeed("from a"));
        let b = ScriptedProvider::new("b", true, Behavior::Succeed("from b"));
        let client = CompletionClient::new("a")
            .with_provider(a.clone())
            .with_provider(b.clone())
            .with_fallback(order(&["a", "b"]), true);

        let resp = client.complete(&messages(), None).await.unwrap();
        assert_eq!(resp.provider, "a");
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_skips_disabled_provider() {
        let a = ScriptedProvider::new("a", true, Behavior::Fail);
        let b = ScriptedProvider::new("b", false, Behavior::Succeed("from b"));
        let c = ScriptedProvider::new("c", true, Behavior::Succeed("from c"));
        let client = CompletionClient::new("a")
            .with_provider(a.clone())
            .with_provider(b.clone())
            .with_provider(c.clone())
            .with_fallback(order(&["a", "b", "c"]), true);

        let resp = client.complete(&messages(), None).await.unwrap();
        assert_eq!(resp.provider, "c");
        assert!(resp.content.starts_with("from c"));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        assert_eq!(c.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_lists_every_attempt_in_order() {
        let a = ScriptedProvider::new("a", true, Behavior::Fail);
        let b = ScriptedProvider::new("b", true, Behavior::Fail);
        let c = ScriptedProvider::new("c", true, Behavior::Fail);
        let client = CompletionClient::new("b")
            .with_provider(a.clone())
            .with_provider(b.clone())
            .with_provider(c.clone())
            .with_fallback(order(&["a", "b", "c"]), true);

        let err = client.complete(&messages(), None).await.unwrap_err();
        let attempted: Vec<&str> = err.failures().iter().map(|f| f.provider.as_str()).collect();
        assert_eq!(attempted, vec!["b", "a", "c"]);
        assert!(matches!(err, Error::AllProvidersFailed(_)));
        // Each provider at most once per call
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_explicit_provider_never_falls_back() {
        let a = ScriptedProvider::new("a", true, Behavior::Succeed("from a"));
        let b = ScriptedProvider::new("b", true, Behavior::Fail);
        let client = CompletionClient::new("a")
            .with_provider(a.clone())
            .with_provider(b.clone())
            .with_fallback(order(&["a", "b"]), true);

        let err = client.complete(&messages(), Some("b")).await.unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(a.calls(), 0);

        let ok = client.complete(&messages(), Some("a")).await.unwrap();
        assert_eq!(ok.provider, "a");
    }

    #[tokio::test]
    async fn test_fallback_disabled() {
        let a = ScriptedProvider::new("a", true, Behavior::Fail);
        let b = ScriptedProvider::new("b", true, Behavior::Succeed("from b"));
        let client = CompletionClient::new("a")
            .with_provider(a.clone())
            .with_provider(b.clone())
            .with_fallback(order(&["a", "b"]), false);

        let err = client.complete(&messages(), None).await.unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_or_unknown_target_is_recorded_without_call() {
        let a = ScriptedProvider::new("a", false, Behavior::Succeed("from a"));
        let c = ScriptedProvider::new("c", true, Behavior::Succeed("from c"));
        let client = CompletionClient::new("a")
            .with_provider(a.clone())
            .with_provider(c.clone())
            .with_fallback(order(&["ghost", "a", "c"]), true);

        let resp = client.complete(&messages(), None).await.unwrap();
        assert_eq!(resp.provider, "c");
        assert_eq!(a.calls(), 0);

        let err = client.complete(&messages(), Some("ghost")).await.unwrap_err();
        assert!(matches!(&err.failures()[0].error, Error::Config(msg) if msg.contains("ghost")));
    }

    #[tokio::test]
    async fn test_timeout_advances_fallback() {
        let slow = ScriptedProvider::new("slow", true, Behavior::Hang);
        let fast = ScriptedProvider::new("fast", true, Behavior::Succeed("from fast"));
        let client = CompletionClient::new("slow")
            .with_provider(slow.clone())
            .with_provider(fast.clone())
            .with_fallback(order(&["slow", "fast"]), true)
            .with_timeout(Duration::from_millis(50));

        let resp = client.complete(&messages(), None).await.unwrap();
        assert_eq!(resp.provider, "fast");
        assert_eq!(slow.calls(), 1);
    }

    #[test]
    fn test_from_settings_registers_stock_providers() {
        let settings = Settings::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "PRIMARY_LLM_PROVIDER" => Some("ollama".to_string()),
            _ => None,
        })
        .unwrap();
        let client = CompletionClient::from_settings(&settings).unwrap();

        assert_eq!(client.primary(), "ollama");
        assert_eq!(client.available_providers(), vec!["ollama", "openai", "vllm"]);
        assert_eq!(client.providers().len(), 4);
        let info = client.provider_info("anthropic").unwrap();
        assert!(!info.enabled);
        assert_eq!(info.model, "claude-3-5-sonnet-20241022");
    }
}
