//! Host capabilities the scanner depends on.
//!
//! A host owns the loaded pages. It tells the orchestrator which URL a
//! session currently shows and runs the page rules inside that session's
//! document. A browser extension host would inject a script here; the
//! bundled [`HttpPageHost`] loads pages itself with an HTTP client.
//!
//! # Example
//!
//! ```no_run
//! use pagescan::host::{HttpPageHost, PageHost};
//! use pagescan::HeaderCache;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(HeaderCache::new());
//!     let host = HttpPageHost::new(Arc::clone(&cache));
//!
//!     let session = host.navigate("https://example.com/").await?;
//!     let findings = host.inspect(session).await?;
//!     println!("{} page findings", findings.len());
//!     Ok(())
//! }
//! ```

mod http;

pub use http::{document_cookie, HttpPageHost};

use crate::error::HostError;
use crate::model::{Finding, SessionId};
use async_trait::async_trait;

/// What the host knows about a session's current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub url: String,
}

#[async_trait]
pub trait PageHost: Send + Sync {
    /// Returns the page currently loaded in `session`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::SessionNotFound`] if the session no longer exists.
    async fn resolve(&self, session: SessionId) -> Result<PageInfo, HostError>;

    /// Runs the page rules inside the session's document and returns what
    /// they found.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Denied`] when the host will not run code in that
    /// document, or any other error when the inspection cannot complete.
    async fn inspect(&self, session: SessionId) -> Result<Vec<Finding>, HostError>;
}
