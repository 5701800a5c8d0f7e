//! Result cache.
//!
//! Entries are keyed by a hash of the query and every option that changes its
//! result. Entries never expire here; a refresh replaces the whole entry.
//! [`FileCache`] keeps one JSON file per key under a cache directory, written
//! atomically (temp file, then rename).

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{ExecutionMode, Result, SearchError, SearchQuery, SearchReport};

/// Environment variable overriding the default cache directory.
pub const CACHE_DIR_ENV: &str = "CSEARCH_CACHE_DIR";

/// Hex length of a cache key.
const KEY_LEN: usize = 32;

/// Deterministic hash of a query and its result-affecting options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct KeyMaterial<'a> {
    query: &'a str,
    engines: Vec<String>,
    limit: usize,
    locale: Option<String>,
    mode: ExecutionMode,
}

impl CacheKey {
    /// Derives the key for a query.
    ///
    /// Engine names are compared case-insensitively and without regard to
    /// order; the query text is trimmed.
    pub fn derive(query: &SearchQuery) -> Self {
        let mut engines: Vec<String> = query
            .engines
            .iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .collect();
        engines.sort();
        engines.dedup();

        let material = KeyMaterial {
            query: query.query.trim(),
            engines,
            limit: query.limit,
            locale: query.locale().map(str::to_ascii_lowercase),
            mode: query.mode,
        };
        // Serializing a struct of strings and integers cannot fail.
        let encoded = serde_json::to_vec(&material).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(KEY_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a search uses the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Serve hits; run and store on a miss.
    #[default]
    Default,
    /// Always run; replace any existing entry.
    ForceRefresh,
    /// Serve hits; a miss is an error and nothing runs.
    ReadOnly,
}

impl CachePolicy {
    /// Whether lookups are performed.
    pub fn reads(self) -> bool {
        !matches!(self, CachePolicy::ForceRefresh)
    }

    /// Whether fresh results are stored.
    pub fn writes(self) -> bool {
        !matches!(self, CachePolicy::ReadOnly)
    }
}

/// A stored search report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: SearchReport,
    pub written_at: DateTime<Utc>,
}

/// Storage backend for cached reports.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the entry for `key`, if any.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Stores `payload` under `key`, replacing any previous entry.
    async fn store(&self, key: &CacheKey, payload: &SearchReport) -> Result<CacheEntry>;

    /// Removes the entry for `key`. Missing entries are not an error.
    async fn invalidate(&self, key: &CacheKey) -> Result<()>;
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Cache of JSON files, one per key.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Creates a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$CSEARCH_CACHE_DIR`, or `csearch-cache` under the system temp dir.
    pub fn default_dir() -> PathBuf {
        std::env::var_os(CACHE_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("csearch-cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Removes every entry. Returns the number of entries removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_entry = name.ends_with(".json") && !name.starts_with('.');
            if is_entry || name.ends_with(".tmp") {
                tokio::fs::remove_file(&path).await?;
                if is_entry {
                    removed += 1;
                }
            }
        }
        debug!("Cleared {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) if entry.key == *key => Ok(Some(entry)),
            Ok(_) => {
                warn!("Cache entry {} belongs to another key, ignoring", path.display());
                Ok(None)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &CacheKey, payload: &SearchReport) -> Result<CacheEntry> {
        let entry = CacheEntry {
            key: key.clone(),
            payload: payload.clone(),
            written_at: Utc::now(),
        };
        let json = serde_json::to_vec(&entry)?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            SearchError::Cache(format!(
                "failed to create cache directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self
            .dir
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), seq));
        tokio::fs::write(&tmp_path, &json).await.map_err(|e| {
            SearchError::Cache(format!("failed to write {}: {e}", tmp_path.display()))
        })?;

        let path = self.entry_path(key);
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(SearchError::Cache(format!(
                "failed to replace {}: {e}",
                path.display()
            )));
        }

        debug!("Stored cache entry {}", path.display());
        Ok(entry)
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<()> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| SearchError::Cache("memory cache lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    async fn store(&self, key: &CacheKey, payload: &SearchReport) -> Result<CacheEntry> {
        let entry = CacheEntry {
            key: key.clone(),
            payload: payload.clone(),
            written_at: Utc::now(),
        };
        self.entries
            .lock()
            .map_err(|_| SearchError::Cache("memory cache lock poisoned".into()))?
            .insert(key.clone(), entry.clone());
        Ok(entry)
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| SearchError::Cache("memory cache lock poisoned".into()))?
            .remove(key);
        Ok(())
    }
}
