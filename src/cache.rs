//! Time-to-live file cache for fetched listings
//!
//! One JSON file per resource, holding nothing but the pretty-printed item array.
//! Freshness comes from the file's modification time:
//!
//! - no file: [`CacheState::Missing`]
//! - `now - mtime >= ttl`: [`CacheState::Stale`]
//! - otherwise: [`CacheState::Fresh`]
//!
//! A refresh that yields no items never touches the file, so whatever is on disk is
//! always the last successful fetch. Writes go through a temporary sibling file and
//! a rename. There is no cross-process locking.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Freshness of a cache file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// The cache file does not exist
    Missing,
    /// The cache file is younger than the TTL
    Fresh,
    /// The cache file is at least as old as the TTL
    Stale,
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// A cached listing on disk
#[derive(Clone, Debug)]
pub struct FileCache {
    path: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// Cache at `path` (with `~` expanded) that goes stale after `ttl`
    pub fn new(path: impl AsRef<Path>, ttl: Duration) -> Self {
        Self {
            path: expand_home(path),
            ttl,
        }
    }

    /// Cache with the TTL given in minutes
    pub fn with_ttl_minutes(path: impl AsRef<Path>, minutes: u64) -> Self {
        Self::new(path, Duration::from_secs(minutes * 60))
    }

    /// Resolved cache file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time to live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Freshness of the cache file right now
    pub async fn state(&self) -> Result<CacheState> {
        self.state_at(SystemTime::now()).await
    }

    /// Freshness of the cache file as of `now`
    pub async fn state_at(&self, now: SystemTime) -> Result<CacheState> {
        let modified = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheState::Missing),
            Err(e) => return Err(e.into()),
        };
        // A timestamp in the future counts as brand new
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        Ok(if age >= self.ttl {
            CacheState::Stale
        } else {
            CacheState::Fresh
        })
    }

    /// Read the cached items; a file that does not parse is an error
    pub async fn read(&self) -> Result<Vec<Value>> {
        let bytes = tokio::fs::read(&self.path).await?;
        serde_json::from_slice(&bytes).map_err(|source| Error::CacheCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the cached items
    pub async fn write(&self, items: &[Value]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        items.serialize(&mut serializer)?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &buf).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Serve fresh cached items, or run `refresh` and persist a non-empty result
    ///
    /// An empty refresh leaves the file alone and returns an empty list, whether the
    /// cache was missing or stale.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Vec<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Value>>>,
    {
        let state = self.state().await?;
        if state == CacheState::Fresh {
            tracing::debug!(path = %self.path.display(), "serving cached listing");
            return self.read().await;
        }

        tracing::debug!(path = %self.path.display(), ?state, "refreshing cached listing");
        let items = refresh().await?;
        if items.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                ?state,
                "refresh returned nothing, cache left untouched"
            );
            return Ok(items);
        }

        self.write(&items).await?;
        tracing::info!(path = %self.path.display(), items = items.len(), "cache refreshed");
        Ok(items)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn age_file(path: &Path, by: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::with_ttl_minutes(temp_dir.path().join("items.json"), 10);

        assert_eq!(cache.state().await.unwrap(), CacheState::Missing);

        cache.write(&[json!({"id": 1})]).await.unwrap();
        assert_eq!(cache.state().await.unwrap(), CacheState::Fresh);

        age_file(cache.path(), Duration::from_secs(10 * 60));
        assert_eq!(cache.state().await.unwrap(), CacheState::Stale);
    }

    #[tokio::test]
    async fn test_future_mtime_is_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::with_ttl_minutes(temp_dir.path().join("items.json"), 1);
        cache.write(&[json!(1)]).await.unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        assert_eq!(cache.state_at(past).await.unwrap(), CacheState::Fresh);
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_pretty_prints() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("items.json");
        let cache = FileCache::with_ttl_minutes(&path, 10);

        cache.write(&[json!({"id": 1})]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n    {"));
        assert!(!path.with_file_name("items.json.tmp").exists());
        assert_eq!(cache.read().await.unwrap(), vec![json!({"id": 1})]);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_refresh() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::with_ttl_minutes(temp_dir.path().join("items.json"), 10);
        let calls = Arc::new(AtomicU32::new(0));

        let refresh = || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![json!({"id": 1}), json!({"id": 2})])
            }
        };

        let first = cache.get_or_refresh(refresh).await.unwrap();
        let second = cache.get_or_refresh(refresh).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_refreshes() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::with_ttl_minutes(temp_dir.path().join("items.json"), 10);
        cache.write(&[json!({"id": "old"})]).await.unwrap();
        age_file(cache.path(), Duration::from_secs(11 * 60));

        let items = cache
            .get_or_refresh(|| async { Ok(vec![json!({"id": "new"})]) })
            .await
            .unwrap();

        assert_eq!(items, vec![json!({"id": "new"})]);
        assert_eq!(cache.read().await.unwrap(), vec![json!({"id": "new"})]);
        assert_eq!(cache.state().await.unwrap(), CacheState::Fresh);
    }

    #[tokio::test]
    async fn test_empty_refresh_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::with_ttl_minutes(temp_dir.path().join("items.json"), 10);
        cache.write(&[json!({"id": "kept"})]).await.unwrap();
        age_file(cache.path(), Duration::from_secs(20 * 60));
        let before = std::fs::read(cache.path()).unwrap();

        let items = cache
            .get_or_refresh(|| async { Ok(Vec::new()) })
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(std::fs::read(cache.path()).unwrap(), before);
        assert_eq!(cache.state().await.unwrap(), CacheState::Stale);
    }

    #[tokio::test]
    async fn test_empty_refresh_without_cache_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::with_ttl_minutes(temp_dir.path().join("items.json"), 10);

        let items = cache
            .get_or_refresh(|| async { Ok(Vec::new()) })
            .await
            .unwrap();

        assert!(items.is_empty());
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cache = FileCache::with_ttl_minutes(&path, 10);

        let result = cache
            .get_or_refresh(|| async { Ok(vec![json!(1)]) })
            .await;

        match result {
            Err(Error::CacheCorrupt { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected CacheCorrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_error_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileCache::with_ttl_minutes(temp_dir.path().join("items.json"), 10);

        let result = cache
            .get_or_refresh(|| async { Err(Error::InvalidTarget("bad".to_string())) })
            .await;

        assert!(matches!(result, Err(Error::InvalidTarget(_))));
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_expand_home() {
        let plain = expand_home("/var/cache/items.json");
        assert_eq!(plain, PathBuf::from("/var/cache/items.json"));

        if let Some(home) = std::env::var_os("HOME") {
            let expanded = expand_home("~/.api-gate/items.json");
            assert_eq!(expanded, PathBuf::from(home).join(".api-gate/items.json"));
        }
    }
}
