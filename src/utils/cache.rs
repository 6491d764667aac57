//! Local time-bounded cache for extracted full text.
//!
//! Adapters receive the cache as an injected [`ContentCache`]. The default
//! backing store is a directory of JSON files:
//!
//! ```text
//! ~/.cache/paper-scout/fulltext/
//!   <md5 of key>.json
//! ```
//!
//! Keys are `{source}_{id}` (see [`PaperRecord::cache_key`]). Entries older
//! than the TTL (24 hours by default) are ignored, not deleted; the next
//! successful fetch overwrites them. Storage errors never reach the caller:
//! they are logged and behave like a miss.
//!
//! [`PaperRecord::cache_key`]: crate::models::PaperRecord::cache_key

use crate::config::{default_cache_dir, CacheConfig};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default freshness window for cached content
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Key-value store for fetched content with a freshness window
pub trait ContentCache: Send + Sync + std::fmt::Debug {
    /// Return the content for `key` if an entry exists and is still fresh
    fn get(&self, key: &str) -> Option<String>;

    /// Store `content` under `key` with the current time, replacing any prior entry
    fn put(&self, key: &str, content: &str);
}

/// A cached piece of content and when it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key the entry was stored under
    pub key: String,

    /// Cached content
    pub content: String,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the given time
    pub fn new(key: impl Into<String>, content: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            fetched_at,
        }
    }

    /// Whether the entry is younger than `ttl` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// File-backed cache: one JSON file per key in a directory
#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// Create a cache rooted at `directory`
    pub fn new(directory: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            directory: directory.into(),
            ttl,
        }
    }

    /// Create a cache from configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        let directory = config
            .directory
            .clone()
            .unwrap_or_else(default_cache_dir)
            .join("fulltext");
        Self::new(directory, Duration::from_secs(config.ttl_seconds))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = md5::compute(key.as_bytes());
        self.directory.join(format!("{:x}.json", digest))
    }

    /// Look up `key` as if the current time were `now`
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let path = self.entry_path(key);
        let entry = match read_entry(&path) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!("Cache MISS for {}", key);
                return None;
            }
            Err(e) => {
                tracing::warn!("Unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.key != key {
            tracing::debug!("Cache key collision for {}", key);
            return None;
        }

        if entry.is_fresh(now, self.ttl) {
            tracing::debug!("Cache HIT for {}", key);
            Some(entry.content)
        } else {
            tracing::debug!("Cache expired for {}", key);
            None
        }
    }

    /// Store `content` under `key` stamped with `fetched_at`
    pub fn put_at(&self, key: &str, content: &str, fetched_at: DateTime<Utc>) {
        let entry = CacheEntry::new(key, content, fetched_at);
        match self.write_entry(&entry) {
            Ok(()) => tracing::debug!("Cached content for {}", key),
            Err(e) => tracing::warn!("Failed to cache content for {}: {}", key, e),
        }
    }

    fn write_entry(&self, entry: &CacheEntry) -> std::io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        let body = serde_json::to_vec(entry)?;

        // write-then-rename so a reader never sees a partial file
        let mut file = tempfile::NamedTempFile::new_in(&self.directory)?;
        file.write_all(&body)?;
        file.persist(self.entry_path(&entry.key))
            .map_err(|e| e.error)?;
        Ok(())
    }

    /// Number of entries and total size on disk (expired entries included)
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            directory: self.directory.clone(),
            entries: 0,
            total_bytes: 0,
            ttl: self.ttl,
        };

        if let Ok(entries) = fs::read_dir(&self.directory) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    stats.entries += 1;
                    stats.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
            }
        }

        stats
    }

    /// Remove every cached entry
    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_dir_all(&self.directory) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tracing::info!("Cache cleared: {}", self.directory.display());
        Ok(())
    }
}

impl ContentCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Utc::now())
    }

    fn put(&self, key: &str, content: &str) {
        self.put_at(key, content, Utc::now())
    }
}

fn read_entry(path: &Path) -> std::io::Result<Option<CacheEntry>> {
    let body = match fs::read(path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Statistics about the file cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Cache directory path
    pub directory: PathBuf,

    /// Number of entry files
    pub entries: usize,

    /// Total size in bytes
    pub total_bytes: u64,

    /// Freshness window
    pub ttl: Duration,
}

/// In-process cache with the same freshness rule, for tests and short-lived sessions
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCache {
    /// Create an empty in-memory cache
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up `key` as if the current time were `now`
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.content.clone())
    }

    /// Number of stored entries (fresh or not)
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ContentCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Utc::now())
    }

    fn put(&self, key: &str, content: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), CacheEntry::new(key, content, Utc::now()));
        }
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ContentCache for NoCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn put(&self, _key: &str, _content: &str) {}
}

/// Build the cache described by the configuration
pub fn cache_from_config(config: &CacheConfig) -> Arc<dyn ContentCache> {
    if config.enabled {
        Arc::new(FileCache::from_config(config))
    } else {
        tracing::debug!("Cache is disabled");
        Arc::new(NoCache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::new(temp_dir.path(), DEFAULT_TTL);

        cache.put("k", "X");
        assert_eq!(cache.get("k"), Some("X".to_string()));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn test_expired_after_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::new(temp_dir.path(), DEFAULT_TTL);

        cache.put("k", "X");
        let later = Utc::now() + ChronoDuration::hours(25);
        assert_eq!(cache.get_at("k", later), None);

        // expired entries are ignored, not purged
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_overwrite_refreshes_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::new(temp_dir.path(), DEFAULT_TTL);

        let stale = Utc::now() - ChronoDuration::hours(30);
        cache.put_at("PubMed_1", "old", stale);
        assert_eq!(cache.get("PubMed_1"), None);

        cache.put("PubMed_1", "new");
        assert_eq!(cache.get("PubMed_1"), Some("new".to_string()));
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_keys_with_slashes() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::new(temp_dir.path(), DEFAULT_TTL);

        cache.put("bioRxiv_10.1101/2024.01.01.123456", "body");
        assert_eq!(
            cache.get("bioRxiv_10.1101/2024.01.01.123456"),
            Some("body".to_string())
        );
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::new(temp_dir.path(), DEFAULT_TTL);

        cache.put("k", "X");
        fs::write(cache.entry_path("k"), b"not json").unwrap();

        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_unwritable_directory_degrades_to_noop() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"a file, not a directory").unwrap();

        let cache = FileCache::new(blocker.join("cache"), DEFAULT_TTL);
        cache.put("k", "X");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::new(temp_dir.path().join("fulltext"), DEFAULT_TTL);

        cache.put("a", "1");
        cache.put("b", "2");
        assert_eq!(cache.stats().entries, 2);

        cache.clear().unwrap();
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.get("a"), None);

        // clearing a missing directory is fine
        cache.clear().unwrap();
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::default();
        assert!(cache.is_empty());

        cache.put("k", "X");
        assert_eq!(cache.get("k"), Some("X".to_string()));
        assert_eq!(cache.get_at("k", Utc::now() + ChronoDuration::hours(24)), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_no_cache() {
        let cache = NoCache;
        cache.put("k", "X");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_cache_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig {
            enabled: true,
            directory: Some(temp_dir.path().to_path_buf()),
            ttl_seconds: 60,
        };

        let cache = cache_from_config(&config);
        cache.put("k", "X");
        assert_eq!(cache.get("k"), Some("X".to_string()));
        assert!(temp_dir.path().join("fulltext").is_dir());

        let disabled = cache_from_config(&CacheConfig {
            enabled: false,
            ..config
        });
        disabled.put("k", "Y");
        assert_eq!(disabled.get("k"), None);
    }
}
