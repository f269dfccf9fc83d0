use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How serious a finding is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Finding {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    /// Fallback finding used when page inspection could not run or timed out.
    pub fn content_script_error() -> Self {
        Self::new(
            "Content Script Error",
            "Could not analyze the page's content. The page might be protected.",
            Severity::Info,
        )
    }

    /// Sole finding of a scan that failed as a whole.
    pub fn scan_error() -> Self {
        Self::new("Scan Error", "Could not complete the scan.", Severity::High)
    }
}

/// Output of one orchestrated scan.
///
/// `findings` keeps insertion order: header findings first, then page
/// findings (or the fallback that replaced them).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub scan_time: DateTime<Utc>,
    pub findings: Vec<Finding>,
}

impl ScanResult {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self {
            url: None,
            scan_time: Utc::now(),
            findings,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    pub fn has_finding(&self, title: &str) -> bool {
        self.findings.iter().any(|f| f.title == title)
    }
}
