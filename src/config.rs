//! Configuration file handling.
//!
//! This module provides loading and saving of pagescan configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/pagescan/config.toml`
//! - macOS: `~/Library/Application Support/pagescan/config.toml`
//! - Windows: `%APPDATA%\pagescan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! inspection_timeout_secs = 10
//! request_timeout_secs = 30
//! user_agent = "pagescan/0.1.0"
//! default_format = "table"
//! store_results = true
//!
//! [ignore]
//! findings = ["HSTS Missing", "Cookie*"]
//! ```

use crate::model::ScanResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use pagescan::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Inspection timeout: {}s", config.inspection_timeout_secs);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on the page inspection step, in seconds.
    ///
    /// Default: 10
    pub inspection_timeout_secs: u64,

    /// Timeout for loading a page over HTTP, in seconds.
    ///
    /// Default: 30
    pub request_timeout_secs: u64,

    /// User agent sent when loading pages.
    pub user_agent: String,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json", "sarif"
    /// Default: "table"
    pub default_format: String,

    /// Whether each scan result is persisted keyed by page URL.
    ///
    /// Default: true
    pub store_results: bool,

    /// Ignore list for suppressing accepted findings.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Findings to suppress from displayed and stored results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Finding titles to drop. Supports `*` wildcards (e.g. "Cookie*").
    pub findings: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a finding with this title should be suppressed.
    pub fn should_ignore_finding(&self, title: &str) -> bool {
        self.findings.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, title)
            } else {
                pattern == title
            }
        })
    }

    /// Drops ignored findings, keeping the order of the rest.
    pub fn apply(&self, mut result: ScanResult) -> ScanResult {
        if !self.findings.is_empty() {
            result
                .findings
                .retain(|f| !self.should_ignore_finding(&f.title));
        }
        result
    }
}

/// `*` matches any run of characters; everything else matches literally.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut segments: Vec<&str> = pattern.split('*').collect();
    let head = segments.remove(0);
    let Some(mut rest) = text.strip_prefix(head) else {
        return false;
    };
    let Some(tail) = segments.pop() else {
        return rest.is_empty();
    };

    for segment in segments {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(tail)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inspection_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: format!("pagescan/{}", env!("CARGO_PKG_VERSION")),
            default_format: "table".to_string(),
            store_results: true,
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Invalid config: {:?}", path))?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagescan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
