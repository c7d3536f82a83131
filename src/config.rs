use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::docs::chunker::DEFAULT_MIN_CHUNK_CHARS;
use crate::docs::source::DEFAULT_EXTENSIONS;
use crate::error::{Error, Result};
use crate::index::{DEFAULT_BATCH_SIZE, DEFAULT_EMBED_CONCURRENCY, DEFAULT_MAX_CHUNKS};
use crate::llm::anthropic::DEFAULT_ANTHROPIC_VERSION;
use crate::llm::{GenerationParams, ProviderConfig};

pub const KNOWN_PROVIDERS: &[&str] = &["openai", "anthropic", "ollama", "vllm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
    /// Offline feature-hashing embedder.
    Hash,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub batch_size: usize,
    /// Embedding batches in flight at once.
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub max_chunks: usize,
    pub min_chunk_chars: usize,
    pub top_k: usize,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct DocsSettings {
    pub root: PathBuf,
    pub path_prefix: String,
    pub extensions: Vec<String>,
    pub url_template: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub openai: ProviderConfig,
    pub openai_organization: Option<String>,
    pub anthropic: ProviderConfig,
    pub anthropic_version: String,
    pub ollama: ProviderConfig,
    pub ollama_keep_alive: Option<String>,
    pub vllm: ProviderConfig,
}

impl ProviderSettings {
    pub fn all(&self) -> [&ProviderConfig; 4] {
        [&self.openai, &self.anthropic, &self.ollama, &self.vllm]
    }

    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.all().into_iter().find(|p| p.name == name)
    }
}

/// Everything the pipeline needs, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub primary_provider: String,
    pub fallback_enabled: bool,
    pub fallback_order: Vec<String>,
    pub generation: GenerationParams,
    pub request_timeout: Duration,
    pub providers: ProviderSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub docs: DocsSettings,
    pub log_level: String,
}

impl Settings {
    /// Load from the process environment and an optional `.env` file.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Load using an arbitrary key lookup. Empty values count as unset, except
    /// for the Ollama and vLLM base URLs where an empty value disables the
    /// provider.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let openai_key = env.opt("OPENAI_API_KEY");
        let openai = ProviderConfig {
            name: "openai".to_string(),
            endpoint: env.or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            model: env.or("OPENAI_MODEL", "gpt-4o-mini"),
            enabled: openai_key.is_some(),
            api_key: openai_key,
        };

        let anthropic_key = env.opt("ANTHROPIC_API_KEY");
        let anthropic = ProviderConfig {
            name: "anthropic".to_string(),
            endpoint: env.or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
            model: env.or("ANTHROPIC_MODEL", "claude-3-5-sonnet-20241022"),
            enabled: anthropic_key.is_some(),
            api_key: anthropic_key,
        };

        let ollama_url = env.url_or("OLLAMA_BASE_URL", "http://localhost:11434");
        let ollama = ProviderConfig {
            name: "ollama".to_string(),
            enabled: !ollama_url.is_empty(),
            endpoint: ollama_url,
            model: env.or("OLLAMA_MODEL", "deepseek-coder:33b"),
            api_key: None,
        };

        let vllm_url = env.url_or("VLLM_BASE_URL", "http://localhost:8000");
        let vllm = ProviderConfig {
            name: "vllm".to_string(),
            enabled: !vllm_url.is_empty(),
            endpoint: vllm_url,
            model: env.or("VLLM_MODEL", "meta-llama/Llama-3.1-8B-Instruct"),
            api_key: env.opt("VLLM_API_KEY"),
        };

        let primary_provider = env.or("PRIMARY_LLM_PROVIDER", "openai").to_lowercase();
        check_provider_name("PRIMARY_LLM_PROVIDER", &primary_provider)?;

        let fallback_order: Vec<String> = env
            .or("FALLBACK_ORDER", "openai,anthropic,ollama")
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        for name in &fallback_order {
            check_provider_name("FALLBACK_ORDER", name)?;
        }

        let backend = match env.or("EMBEDDING_BACKEND", "http").to_lowercase().as_str() {
            "http" => EmbeddingBackend::Http,
            "hash" => EmbeddingBackend::Hash,
            other => {
                return Err(Error::Config(format!(
                    "EMBEDDING_BACKEND must be 'http' or 'hash', got '{}'",
                    other
                )))
            }
        };

        let extensions = env
            .opt("DOCS_EXTENSIONS")
            .map(|s| {
                s.split(',')
                    .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect());

        Ok(Self {
            primary_provider,
            fallback_enabled: env.parse_bool("ENABLE_LLM_FALLBACK", true)?,
            fallback_order,
            generation: GenerationParams {
                temperature: env.parse("TEMPERATURE", 0.7)?,
                max_tokens: env.parse("MAX_TOKENS", 2000)?,
            },
            request_timeout: Duration::from_secs(env.parse("REQUEST_TIMEOUT", 30)?),
            providers: ProviderSettings {
                openai,
                openai_organization: env.opt("OPENAI_ORGANIZATION"),
                anthropic,
                anthropic_version: env.or("ANTHROPIC_VERSION", DEFAULT_ANTHROPIC_VERSION),
                ollama,
                ollama_keep_alive: env.opt("OLLAMA_KEEP_ALIVE").or_else(|| Some("5m".to_string())),
                vllm,
            },
            embedding: EmbeddingSettings {
                backend,
                base_url: env.or("EMBEDDING_BASE_URL", "http://localhost:1234/v1"),
                model: env.or("EMBEDDING_MODEL", "all-minilm-l6-v2"),
                api_key: env.opt("EMBEDDING_API_KEY"),
                dimensions: env.parse("EMBEDDING_DIMENSIONS", 384)?,
                batch_size: env.parse("EMBED_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
                concurrency: env.parse("EMBED_CONCURRENCY", DEFAULT_EMBED_CONCURRENCY)?,
            },
            index: IndexSettings {
                max_chunks: env.parse("MAX_CHUNKS", DEFAULT_MAX_CHUNKS)?,
                min_chunk_chars: env.parse("MIN_CHUNK_CHARS", DEFAULT_MIN_CHUNK_CHARS)?,
                top_k: env.parse("TOP_K", 3)?,
                cache_path: PathBuf::from(env.or("CACHE_PATH", "./data/index-cache.json")),
                cache_ttl: Duration::from_secs(env.parse("CACHE_TTL_SECS", 86_400)?),
            },
            docs: DocsSettings {
                root: PathBuf::from(env.or("DOCS_ROOT", "./docs")),
                path_prefix: env.or("DOCS_PATH_PREFIX", ""),
                extensions,
                url_template: env.opt("DOCS_URL_TEMPLATE"),
            },
            log_level: env.or("LOG_LEVEL", "info"),
        })
    }

    /// Non-fatal problems worth logging at startup.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let enabled: Vec<&str> = self
            .providers
            .all()
            .into_iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.as_str())
            .collect();
        if enabled.is_empty() {
            warnings.push("no completion provider is enabled".to_string());
        }

        if let Some(primary) = self.providers.get(&self.primary_provider) {
            if !primary.enabled {
                warnings.push(format!(
                    "primary provider '{}' is not enabled (missing credentials or endpoint)",
                    primary.name
                ));
            }
        }

        if !self.fallback_enabled && !enabled.contains(&self.primary_provider.as_str()) {
            warnings.push("fallback is disabled and the primary provider cannot be used".to_string());
        }

        if let Some(key) = &self.providers.openai.api_key {
            if !key.starts_with("sk-") {
                warnings.push("OPENAI_API_KEY does not look like an OpenAI key (expected 'sk-' prefix)".to_string());
            }
        }
        if let Some(key) = &self.providers.anthropic.api_key {
            if !key.starts_with("sk-ant-") {
                warnings.push("ANTHROPIC_API_KEY does not look like an Anthropic key (expected 'sk-ant-' prefix)".to_string());
            }
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            warnings.push(format!(
                "TEMPERATURE {} is outside the usual 0.0-2.0 range",
                self.generation.temperature
            ));
        }
        if self.index.top_k == 0 {
            warnings.push("TOP_K is 0, every question will be answered without documentation".to_string());
        }

        warnings
    }
}

fn check_provider_name(key: &str, name: &str) -> Result<()> {
    if KNOWN_PROVIDERS.contains(&name) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} contains unknown provider '{}' (known: {})",
            key,
            name,
            KNOWN_PROVIDERS.join(", ")
        )))
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn opt(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    /// Like `or`, but a key that is set to a blank value stays blank, which
    /// disables the provider behind it.
    fn url_or(&self, key: &str, default: &str) -> String {
        match (self.0)(key) {
            Some(v) => v.trim().to_string(),
            None => default.to_string(),
        }
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.opt(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("{} has invalid value '{}'", key, raw))),
        }
    }

    fn parse_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.opt(key).map(|v| v.to_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => Ok(false),
            Some(v) => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, v))),
        }
    }
}
