use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::types::Document;
use crate::error::{Error, Result};

pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "txt", "rst", "py", "json", "yaml", "yml"];

/// Supplies the corpus to index. Must be safe to call repeatedly.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Document>>;
}

/// Maps a relative file path to a browsable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    /// Everything before the `{filepath}` placeholder.
    pub prefix: String,
    /// Everything after it (usually empty, sometimes an anchor).
    pub suffix: String,
}

impl UrlTemplate {
    /// Parses `https://host/blob/main/{filepath}` style templates. A template
    /// without a placeholder is used as a base URL and the path is appended
    /// after a `/`. Returns `None` when no http(s) URL is present.
    pub fn parse(template: &str) -> Option<Self> {
        let template = template.trim();
        if let Some(pos) = template.find("{filepath}") {
            let before = &template[..pos];
            let after = &template[pos + "{filepath}".len()..];
            let start = before.rfind("https://").or_else(|| before.rfind("http://"))?;
            let suffix: String = after.chars().take_while(|c| !c.is_whitespace()).collect();
            return Some(Self {
                prefix: before[start..].to_string(),
                suffix,
            });
        }

        let start = template.find("https://").or_else(|| template.find("http://"))?;
        let url = template[start..]
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        Some(Self {
            prefix: format!("{}/", url),
            suffix: String::new(),
        })
    }

    pub fn resolve(&self, filepath: &str) -> String {
        format!("{}{}{}", self.prefix, filepath, self.suffix)
    }
}

/// Reads documentation files from a local directory tree.
///
/// Only files whose root-relative path starts with `path_prefix` and whose
/// extension is allow-listed are returned, sorted by path.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    path_prefix: String,
    extensions: Vec<String>,
    url_template: Option<UrlTemplate>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            path_prefix: String::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            url_template: None,
        }
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn with_url_template(mut self, template: Option<UrlTemplate>) -> Self {
        self.url_template = template;
        self
    }

    fn is_allowed(&self, rel_path: &str) -> bool {
        if !rel_path.starts_with(&self.path_prefix) {
            return false;
        }
        Path::new(rel_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    fn source_url(&self, rel_path: &str, abs_path: &Path) -> String {
        match &self.url_template {
            Some(template) => template.resolve(rel_path),
            None => format!("file://{}", abs_path.display()),
        }
    }

    fn scan(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(Error::Config(format!(
                "documentation root {} is not a directory",
                self.root.display()
            )));
        }

        let mut docs = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let rel_path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !self.is_allowed(&rel_path) {
                continue;
            }

            match std::fs::read_to_string(entry.path()) {
                Ok(content) => {
                    let source_url = self.source_url(&rel_path, entry.path());
                    docs.push(Document::new(rel_path, content, source_url));
                }
                Err(e) => {
                    warn!(path = %rel_path, "Skipping document: {}", e);
                }
            }
        }

        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(docs)
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn fetch_all(&self) -> Result<Vec<Document>> {
        let source = self.clone();
        // Directory walking is blocking I/O
        let docs = tokio::task::spawn_blocking(move || source.scan())
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        debug!(root = %self.root.display(), "directory scanned");
        info!(count = docs.len(), "Documents loaded");
        Ok(docs)
    }
}

/// A fixed in-memory corpus, handy for callers that already hold the documents.
pub struct StaticSource(pub Vec<Document>);

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch_all(&self) -> Result<Vec<Document>> {
        Ok(self.0.clone())
    }
}
