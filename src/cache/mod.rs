//! Response cache
//!
//! Maps a (namespace, instrument, filename) key to a JSON or text payload.
//! Each payload may carry a `<filename>.meta.json` sidecar recording when it
//! was written and when it should be purged. Entries without a sidecar never
//! expire. Reads never fail: anything unreadable is reported as a miss.

pub mod store;

pub use store::{CacheStore, DiskStore, MemoryStore};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

const META_SUFFIX: &str = ".meta.json";

/// Location of one cached payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub namespace: String,
    pub instrument: Option<String>,
    pub filename: String,
}

impl CacheKey {
    pub fn new(namespace: &str, instrument: &str, filename: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            instrument: Some(instrument.to_string()),
            filename: filename.to_string(),
        }
    }

    /// A key that lives directly under its namespace.
    pub fn shared(namespace: &str, filename: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            instrument: None,
            filename: filename.to_string(),
        }
    }

    /// Relative path: `<namespace>/<instrument>/<filename>`.
    pub fn path(&self) -> String {
        match &self.instrument {
            Some(instrument) => format!("{}/{}/{}", self.namespace, instrument, self.filename),
            None => format!("{}/{}", self.namespace, self.filename),
        }
    }

    fn meta_path(&self) -> String {
        format!("{}{}", self.path(), META_SUFFIX)
    }
}

/// Expiry rule for a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgePolicy {
    Never,
    At(DateTime<Utc>),
}

impl PurgePolicy {
    /// Expire `ttl` from now.
    pub fn after(ttl: Duration) -> Self {
        Self::At(Utc::now() + ttl)
    }

    fn purge_at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Never => None,
            Self::At(at) => Some(at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryMeta {
    written_at: DateTime<Utc>,
    purge_at: Option<DateTime<Utc>>,
}

impl EntryMeta {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.purge_at.is_some_and(|at| at <= now)
    }
}

/// Cache with purge policies on top of a [`CacheStore`].
pub struct Cache {
    store: Box<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self::new(DiskStore::new(root))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Cached text, or `None` on a miss.
    pub fn read_text(&self, key: &CacheKey) -> Option<String> {
        let bytes = self.read_bytes(key)?;
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Ignoring non UTF-8 cache entry {}: {}", key.path(), e);
                None
            }
        }
    }

    /// Cached JSON decoded as `T`, or `None` on a miss.
    pub fn read_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let bytes = self.read_bytes(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring undecodable cache entry {}: {}", key.path(), e);
                None
            }
        }
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.read_bytes(key).is_some()
    }

    pub fn write_text(&self, key: &CacheKey, text: &str, policy: PurgePolicy) -> Result<()> {
        self.write_bytes(key, text.as_bytes(), policy)
    }

    /// Pretty-printed JSON (2-space indent).
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        policy: PurgePolicy,
    ) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)
            .with_context(|| format!("Failed to encode {}", key.path()))?;
        self.write_bytes(key, &json, policy)
    }

    pub fn remove(&self, key: &CacheKey) -> Result<()> {
        self.store.delete(&key.path())?;
        self.store.delete(&key.meta_path())
    }

    /// Remove every expired entry below `namespace`. Returns how many were removed.
    pub fn prune(&self, namespace: &str) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        for meta_path in self.store.list(namespace)? {
            let Some(payload_path) = meta_path.strip_suffix(META_SUFFIX) else {
                continue;
            };
            let Some(bytes) = self.store.get(&meta_path)? else {
                continue;
            };
            let meta: EntryMeta = match serde_json::from_slice(&bytes) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Skipping unreadable cache metadata {}: {}", meta_path, e);
                    continue;
                }
            };

            if meta.is_expired(now) {
                self.store.delete(payload_path)?;
                self.store.delete(&meta_path)?;
                debug!("[CACHE PRUNE] {}", payload_path);
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Pruned {} expired entries from {}", removed, namespace);
        }
        Ok(removed)
    }

    fn read_bytes(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = key.path();

        match self.read_meta(key) {
            Some(meta) if meta.is_expired(Utc::now()) => {
                debug!("[CACHE EXPIRED] {}", path);
                return None;
            }
            _ => {}
        }

        match self.store.get(&path) {
            Ok(Some(bytes)) => {
                debug!("[CACHE HIT] {}", path);
                Some(bytes)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Treating unreadable cache entry {} as a miss: {:#}", path, e);
                None
            }
        }
    }

    fn read_meta(&self, key: &CacheKey) -> Option<EntryMeta> {
        let bytes = self.store.get(&key.meta_path()).ok()??;
        serde_json::from_slice(&bytes).ok()
    }

    fn write_bytes(&self, key: &CacheKey, bytes: &[u8], policy: PurgePolicy) -> Result<()> {
        let meta = EntryMeta {
            written_at: Utc::now(),
            purge_at: policy.purge_at(),
        };
        let meta = serde_json::to_vec_pretty(&meta)
            .with_context(|| format!("Failed to encode {}", key.meta_path()))?;

        for (path, bytes) in [(key.path(), bytes), (key.meta_path(), meta.as_slice())] {
            self.store
                .put(&path, bytes)
                .map_err(|e| PipelineError::cache_write(&path, &e))?;
        }
        Ok(())
    }
}
