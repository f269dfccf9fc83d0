//! File-based store of past scan results, keyed by page URL.
//!
//! Each URL maps to one JSON file named by the hash of its normalized
//! form; saving a new result for a URL replaces the old one.
//!
//! # Store Location
//!
//! - Linux: `~/.cache/pagescan/results/`
//! - macOS: `~/Library/Caches/pagescan/results/`
//! - Windows: `%LOCALAPPDATA%\pagescan\results\`
//!
//! # Example
//!
//! ```no_run
//! use pagescan::{ResultStore, ScanResult};
//!
//! let store = ResultStore::new();
//! store.save("https://example.com/", &ScanResult::new(Vec::new())).unwrap();
//!
//! let previous = store.load("https://example.com/");
//! assert!(previous.is_some());
//! ```

use crate::model::ScanResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// On-disk entry. The key URL is kept so a lookup can verify it.
#[derive(Serialize, Deserialize)]
struct StoredResult {
    url: String,
    result: ScanResult,
}

pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Opens the store in the platform cache directory.
    pub fn new() -> Self {
        Self::at(default_dir())
    }

    /// Opens a store rooted at `dir`.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File for a key: SHA-256 of the normalized URL, so distinct URLs never
    /// share a file and names stay short.
    fn result_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Returns the stored result for `url`, if any. Unreadable entries and
    /// entries stored under a different URL are treated as absent.
    pub fn load(&self, url: &str) -> Option<ScanResult> {
        let key = normalize_url(url);
        let path = self.result_path(&key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<StoredResult>(&content) {
            Ok(stored) if stored.url == key => Some(stored.result),
            Ok(stored) => {
                debug!(requested = %key, stored = %stored.url, "stored result belongs to another URL");
                None
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "discarding unreadable result");
                None
            }
        }
    }

    /// Stores `result` for `url`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be created or the
    /// file cannot be written.
    pub fn save(&self, url: &str, result: &ScanResult) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create result store: {:?}", self.dir))?;
        let key = normalize_url(url);
        let path = self.result_path(&key);
        let entry = StoredResult {
            url: key,
            result: result.clone(),
        };
        let content = serde_json::to_string_pretty(&entry)?;
        fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        debug!(url = %entry.url, path = %path.display(), "stored scan result");
        Ok(())
    }

    /// Removes every stored result.
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)?.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let _ = fs::remove_file(path);
                }
            }
        }
        Ok(())
    }
}

/// Canonical form of a URL as the host reports it, e.g. `https://example.com`
/// becomes `https://example.com/`. Unparseable input is kept verbatim.
pub fn normalize_url(url: &str) -> String {
    Url::parse(url.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

fn default_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagescan")
        .join("results")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Finding, Severity};

    #[test]
    fn test_save_and_load_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        let result = ScanResult::new(vec![Finding::new("HSTS Missing", "", Severity::Medium)])
            .with_url("https://example.com/");

        store.save("https://example.com/", &result).unwrap();

        let loaded = store.load("https://example.com/").unwrap();
        assert_eq!(loaded.findings, result.findings);
        assert_eq!(loaded.url.as_deref(), Some("https://example.com/"));
        assert!(store.load("https://other.example/").is_none());
    }

    #[test]
    fn test_newer_result_replaces_older() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());

        store
            .save("https://example.com/", &ScanResult::new(vec![Finding::scan_error()]))
            .unwrap();
        store
            .save("https://example.com/", &ScanResult::new(Vec::new()))
            .unwrap();

        assert!(store.load("https://example.com/").unwrap().findings.is_empty());
    }

    #[test]
    fn test_clear_removes_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        store.save("https://a.example/", &ScanResult::new(Vec::new())).unwrap();
        store.save("https://b.example/", &ScanResult::new(Vec::new())).unwrap();

        store.clear().unwrap();

        assert!(store.load("https://a.example/").is_none());
        assert!(store.load("https://b.example/").is_none());
    }

    #[test]
    fn test_similar_urls_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        store
            .save("https://a.example/x?y", &ScanResult::new(vec![Finding::scan_error()]))
            .unwrap();

        assert!(store.load("https://a.example/x_y").is_none());
        assert!(store.load("https://a.example/x?y").is_some());
    }

    #[test]
    fn test_entry_for_other_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        store
            .save("https://a.example/", &ScanResult::new(Vec::new()))
            .unwrap();
        // Simulate a file that ended up under the wrong key.
        fs::copy(
            store.result_path("https://a.example/"),
            store.result_path("https://b.example/"),
        )
        .unwrap();

        assert!(store.load("https://b.example/").is_none());
    }

    #[test]
    fn test_unnormalized_url_finds_normalized_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        store
            .save("https://example.com/", &ScanResult::new(Vec::new()))
            .unwrap();

        assert!(store.load("https://example.com").is_some());
        assert!(store.load("HTTPS://Example.COM").is_some());
    }

    #[test]
    fn test_long_url_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        let url = format!("https://example.com/search?q={}", "a".repeat(300));

        store.save(&url, &ScanResult::new(Vec::new())).unwrap();

        assert!(store.load(&url).is_some());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com/");
        assert_eq!(normalize_url("not a url"), "not a url");
    }

    #[test]
    fn test_corrupt_entry_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.result_path(&normalize_url("https://x.example/")), "not json").unwrap();
        assert!(store.load("https://x.example/").is_none());
    }
}
