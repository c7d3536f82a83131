use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    written_at: DateTime<Utc>,
    /// Embedding model the payload was produced with.
    model: String,
    payload: T,
}

/// JSON snapshot on disk with age-based invalidation.
///
/// A snapshot is valid while `now - written_at < ttl` and the stored model tag
/// equals this cache's tag. Content is never hashed or compared.
#[derive(Debug, Clone)]
pub struct IndexCache {
    path: PathBuf,
    ttl: Duration,
    model: String,
}

impl IndexCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, model: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ttl,
            model: model.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_fresh(&self, written_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return true;
        };
        now.signed_duration_since(written_at) < ttl
    }

    pub fn load_if_valid<T: DeserializeOwned>(&self) -> Option<T> {
        self.load_if_valid_at(Utc::now())
    }

    /// Cached payload if present, readable, fresh at `now` and from the same model.
    pub fn load_if_valid_at<T: DeserializeOwned>(&self, now: DateTime<Utc>) -> Option<T> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cache file");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Cache unreadable, rebuilding: {}", e);
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
            Ok(env) => env,
            Err(e) => {
                let err = Error::from(e);
                warn!(path = %self.path.display(), "Cache corrupt, rebuilding: {}", err);
                return None;
            }
        };

        if envelope.model != self.model {
            info!(
                cached = %envelope.model,
                current = %self.model,
                "Cache built with a different embedding model, rebuilding"
            );
            return None;
        }
        if !self.is_fresh(envelope.written_at, now) {
            info!(written_at = %envelope.written_at, "Cache expired, rebuilding");
            return None;
        }

        debug!(path = %self.path.display(), written_at = %envelope.written_at, "cache hit");
        Some(envelope.payload)
    }

    pub fn save<T: Serialize>(&self, payload: &T) -> Result<()> {
        self.save_at(payload, Utc::now())
    }

    /// Write the snapshot stamped with `written_at`. The file is written to a
    /// sibling temp file first and renamed into place.
    pub fn save_at<T: Serialize>(&self, payload: &T, written_at: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let envelope = Envelope {
            written_at,
            model: self.model.clone(),
            payload,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), size = bytes.len(), "cache written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_ttl_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(dir.path().join("c.json"), Duration::from_secs(3600), "m");
        cache.save_at(&vec![1, 2, 3], t0()).unwrap();

        let ttl = chrono::Duration::seconds(3600);
        let one = chrono::Duration::seconds(1);

        let before: Option<Vec<i32>> = cache.load_if_valid_at(t0() + ttl - one);
        assert_eq!(before, Some(vec![1, 2, 3]));
        let after: Option<Vec<i32>> = cache.load_if_valid_at(t0() + ttl + one);
        assert_eq!(after, None);
        let exactly: Option<Vec<i32>> = cache.load_if_valid_at(t0() + ttl);
        assert_eq!(exactly, None);
    }

    #[test]
    fn test_missing_file_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(dir.path().join("none.json"), Duration::from_secs(60), "m");
        assert!(cache.load_if_valid::<Vec<i32>>().is_none());
    }

    #[test]
    fn test_corrupt_file_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, b"{not json").unwrap();
        let cache = IndexCache::new(&path, Duration::from_secs(60), "m");
        assert!(cache.load_if_valid::<Vec<i32>>().is_none());
    }

    #[test]
    fn test_model_change_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        IndexCache::new(&path, Duration::from_secs(60), "hash:64")
            .save(&vec![1])
            .unwrap();
        let other = IndexCache::new(&path, Duration::from_secs(60), "http:mini");
        assert!(other.load_if_valid::<Vec<i32>>().is_none());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/c.json");
        let cache = IndexCache::new(&path, Duration::from_secs(60), "m");
        cache.save(&"payload").unwrap();
        assert_eq!(cache.load_if_valid::<String>().as_deref(), Some("payload"));
        assert!(path.exists());
    }

    #[test]
    fn test_save_to_unwritable_location_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // Parent "directory" is a regular file
        let cache = IndexCache::new(file.path().join("c.json"), Duration::from_secs(60), "m");
        assert!(cache.save(&vec![1]).is_err());
    }
}
