//! Storage backends for the response cache.
//!
//! A store only moves bytes around under '/'-separated relative paths.
//! Expiry and encoding live in [`super::Cache`].

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// Byte-level key-value storage keyed by relative path.
pub trait CacheStore: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under `path`.
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Deleting a missing path is not an error.
    fn delete(&self, path: &str) -> Result<()>;

    /// All stored paths below `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Filesystem store rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl CacheStore for DiskStore {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.resolve(path);
        match fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", full.display())),
        }
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;
        }

        let file_name = full
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = full.with_file_name(format!("{}.tmp", file_name));
        fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &full)
            .with_context(|| format!("Failed to finalize cache file {}", full.display()))?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", full.display())),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let start = self.resolve(prefix);
        let mut found = Vec::new();
        if !start.is_dir() {
            return Ok(found);
        }

        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    found.push(key.join("/"));
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries().get(path).cloned())
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.entries().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.entries().remove(path);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir_prefix = format!("{}/", prefix.trim_end_matches('/'));
        Ok(self
            .entries()
            .keys()
            .filter(|key| key.starts_with(&dir_prefix))
            .cloned()
            .collect())
    }
}
