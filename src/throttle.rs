//! Persistent "last checked" timestamps
//!
//! Lets a command-line tool run an occasional check (for example, "is a newer
//! release out?") at most once per interval across invocations. Entries are kept in
//! a small JSON file mapping a key to an RFC 3339 timestamp.

use crate::cache::expand_home;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Key → last-checked timestamp store backed by a JSON file
#[derive(Clone, Debug)]
pub struct CheckStore {
    path: PathBuf,
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl CheckStore {
    /// Load the store at `path` (with `~` expanded); a missing file is an empty store
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path);
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When `key` was last checked
    pub fn last_checked(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).copied()
    }

    /// Whether `key` was never checked or last checked at least `interval` before `now`
    pub fn is_due_at(&self, key: &str, interval: Duration, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_checked(key) else {
            return true;
        };
        match chrono::Duration::from_std(interval) {
            Ok(interval) => last
                .checked_add_signed(interval)
                .is_some_and(|due| due <= now),
            // An interval too large to represent never comes due
            Err(_) => false,
        }
    }

    /// [`is_due_at`](Self::is_due_at) against the current time
    pub fn is_due(&self, key: &str, interval: Duration) -> bool {
        self.is_due_at(key, interval, Utc::now())
    }

    /// Record a check of `key` at `at`
    pub fn touch_at(&mut self, key: impl Into<String>, at: DateTime<Utc>) {
        self.entries.insert(key.into(), at);
    }

    /// Record a check of `key` now
    pub fn touch(&mut self, key: impl Into<String>) {
        self.touch_at(key, Utc::now());
    }

    /// Write the store back to disk, creating parent directories
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&self.entries)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "check store saved");
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_missing_file_is_empty_and_due() {
        let temp_dir = TempDir::new().unwrap();
        let store = CheckStore::load(temp_dir.path().join("checks.json"))
            .await
            .unwrap();

        assert_eq!(store.last_checked("my-cli"), None);
        assert!(store.is_due("my-cli", HOUR));
    }

    #[tokio::test]
    async fn test_touch_then_due_after_interval() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CheckStore::load(temp_dir.path().join("checks.json"))
            .await
            .unwrap();
        let checked = Utc::now();
        store.touch_at("my-cli", checked);

        assert!(!store.is_due_at("my-cli", HOUR, checked + chrono::Duration::minutes(59)));
        assert!(store.is_due_at("my-cli", HOUR, checked + chrono::Duration::minutes(60)));
        assert!(store.is_due_at("other-cli", HOUR, checked));
    }

    #[tokio::test]
    async fn test_interval_past_calendar_range_never_comes_due() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CheckStore::load(temp_dir.path().join("checks.json"))
            .await
            .unwrap();
        store.touch_at("my-cli", DateTime::<Utc>::MAX_UTC - chrono::Duration::days(1));

        let two_days = Duration::from_secs(2 * 24 * 3600);
        assert!(!store.is_due_at("my-cli", two_days, DateTime::<Utc>::MAX_UTC));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("checks.json");
        let checked = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut store = CheckStore::load(&path).await.unwrap();
        store.touch_at("my-cli", checked);
        store.save().await.unwrap();

        let reloaded = CheckStore::load(&path).await.unwrap();
        assert_eq!(reloaded.last_checked("my-cli"), Some(checked));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checks.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(CheckStore::load(&path).await.is_err());
    }
}
