use serde::{Deserialize, Serialize};

/// A source file as handed over by a `DocumentSource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub content: String,
    pub source_url: String,
}

impl Document {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            source_url: source_url.into(),
        }
    }
}

/// A retrievable paragraph of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_path: String,
    pub source_url: String,
    /// Position among the retained chunks of `source_path`, starting at 0.
    pub ordinal: usize,
}
