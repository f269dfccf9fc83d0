//! Scan orchestration.
//!
//! One scan reads the session's header snapshot once, evaluates the header
//! rules, asks the host to run the page rules inside the document, and
//! concatenates the two. The page step may fail or stall without failing
//! the scan, and `scan` itself always returns a [`ScanResult`].

use crate::cache::HeaderCache;
use crate::checker::evaluate_headers;
use crate::error::HostError;
use crate::host::PageHost;
use crate::model::{Finding, ScanResult, SessionId};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on the page inspection step.
pub const DEFAULT_INSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of the page inspection step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page rules ran and produced these findings.
    Complete(Vec<Finding>),
    /// The page rules could not run; this fallback stands in for them.
    Degraded(Finding),
}

impl PageOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, PageOutcome::Degraded(_))
    }

    pub fn into_findings(self) -> Vec<Finding> {
        match self {
            PageOutcome::Complete(findings) => findings,
            PageOutcome::Degraded(fallback) => vec![fallback],
        }
    }
}

/// Coordinates scans over a shared header cache and a page host.
pub struct Orchestrator<H> {
    cache: Arc<HeaderCache>,
    host: Arc<H>,
    inspection_timeout: Duration,
}

impl<H: PageHost> Orchestrator<H> {
    pub fn new(cache: Arc<HeaderCache>, host: Arc<H>) -> Self {
        Self {
            cache,
            host,
            inspection_timeout: DEFAULT_INSPECTION_TIMEOUT,
        }
    }

    pub fn with_inspection_timeout(mut self, timeout: Duration) -> Self {
        self.inspection_timeout = timeout;
        self
    }

    /// Scans `session`. Never fails: an unexpected error yields a result
    /// holding a single "Scan Error" finding.
    pub async fn scan(&self, session: SessionId) -> ScanResult {
        match AssertUnwindSafe(self.try_scan(session)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(%session, error = %err, "scan failed");
                ScanResult::new(vec![Finding::scan_error()])
            }
            Err(_) => {
                warn!(%session, "scan panicked");
                ScanResult::new(vec![Finding::scan_error()])
            }
        }
    }

    async fn try_scan(&self, session: SessionId) -> Result<ScanResult, HostError> {
        // Snapshot is read once; records racing with the scan are not seen.
        let headers = self.cache.lookup(session);
        let page = self.host.resolve(session).await?;
        info!(%session, url = %page.url, headers = headers.len(), "scanning page");

        let mut findings = evaluate_headers(&headers);
        debug!(%session, count = findings.len(), "header rules evaluated");

        let outcome = self.inspect_page(session).await;
        let degraded = outcome.is_degraded();
        findings.extend(outcome.into_findings());

        info!(%session, count = findings.len(), degraded, "scan complete");
        Ok(ScanResult::new(findings).with_url(page.url))
    }

    /// Runs the page rules through the host, bounded by the inspection
    /// timeout. Denial, failure and timeout all degrade to the
    /// "Content Script Error" finding.
    pub async fn inspect_page(&self, session: SessionId) -> PageOutcome {
        match tokio::time::timeout(self.inspection_timeout, self.host.inspect(session)).await {
            Ok(Ok(findings)) => {
                debug!(%session, count = findings.len(), "page rules evaluated");
                PageOutcome::Complete(findings)
            }
            Ok(Err(err)) => {
                warn!(%session, error = %err, "page inspection failed");
                PageOutcome::Degraded(Finding::content_script_error())
            }
            Err(_) => {
                warn!(
                    %session,
                    timeout_ms = self.inspection_timeout.as_millis() as u64,
                    "page inspection timed out"
                );
                PageOutcome::Degraded(Finding::content_script_error())
            }
        }
    }
}
