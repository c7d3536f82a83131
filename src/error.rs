use std::fmt;

use thiserror::Error;

/// One failed provider attempt inside a `complete` call.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: Error,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed credentials, endpoints or settings. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure, timeout or non-2xx reply from a remote service.
    #[error("transport error: {0}")]
    Transport(String),

    /// A cache file or provider payload that could not be understood.
    #[error("decode error: {0}")]
    Decode(String),

    /// Every eligible completion provider failed; causes are in attempt order.
    #[error("all completion providers failed: {}", format_failures(.0))]
    AllProvidersFailed(Vec<ProviderFailure>),

    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no provider was eligible".to_string();
    }
    failures
        .iter()
        .map(ProviderFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Short message suitable for showing to the person who asked the question.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::AllProvidersFailed(_) => {
                "The completion backend is unavailable right now. Please try again later."
            }
            // Completion failures always arrive wrapped, so a bare transport or
            // decode error comes from the embedding service.
            Error::Transport(_) | Error::Decode(_) => {
                "Documentation search is unavailable right now. Please try again later."
            }
            Error::InvalidQuestion(_) => "That question can't be processed. Please rephrase it.",
            _ => "Something went wrong while answering. Please try again later.",
        }
    }

    /// Underlying causes of an `AllProvidersFailed`, empty for other kinds.
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Error::AllProvidersFailed(failures) => failures,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Transport(format!("request timed out: {}", err))
        } else if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_providers_failed_lists_causes_in_order() {
        let err = Error::AllProvidersFailed(vec![
            ProviderFailure {
                provider: "openai".to_string(),
                error: Error::Transport("503".to_string()),
            },
            ProviderFailure {
                provider: "ollama".to_string(),
                error: Error::Decode("missing message.content".to_string()),
            },
        ]);
        let text = err.to_string();
        let openai = text.find("openai").unwrap();
        let ollama = text.find("ollama").unwrap();
        assert!(openai < ollama);
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn test_backend_unavailable_message_is_distinct() {
        let err = Error::AllProvidersFailed(vec![]);
        assert!(err.user_message().contains("unavailable"));
        assert!(err.to_string().contains("no provider was eligible"));
    }

    #[test]
    fn test_embedding_failures_blame_search_not_backend() {
        let backend = Error::AllProvidersFailed(vec![]).user_message();
        for err in [
            Error::Transport("connection refused".to_string()),
            Error::Decode("embedder returned 1 vectors for 2 texts".to_string()),
        ] {
            assert!(err.user_message().starts_with("Documentation search is unavailable"));
            assert_ne!(err.user_message(), backend);
        }
    }
}
