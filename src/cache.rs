//! In-memory header observation cache.
//!
//! Holds, per session, the response headers of the most recent top-level
//! document load. Each record overwrites the previous snapshot for that
//! session; nothing is merged and nothing expires.
//!
//! # Example
//!
//! ```
//! use pagescan::{HeaderCache, HeaderEntry, SessionId};
//!
//! let cache = HeaderCache::new();
//! let session = SessionId(7);
//!
//! cache.record(session, vec![HeaderEntry::new("x-frame-options", "DENY")]);
//! assert_eq!(cache.lookup(session).len(), 1);
//!
//! // Unknown sessions read as an empty header set.
//! assert!(cache.lookup(SessionId(8)).is_empty());
//! ```

use crate::model::{HeaderEntry, SessionId};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Kind of response carried by a network event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// The top-level document of a session.
    MainFrame,
    /// Anything loaded by the document: scripts, images, frames, XHR.
    SubResource,
}

/// A "response headers received" event from the network layer.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub session: SessionId,
    pub resource: ResourceType,
    pub headers: Vec<HeaderEntry>,
}

/// Session-keyed store of the latest top-level response headers.
///
/// Safe to share across threads. Each `record` replaces the whole snapshot
/// under a write lock, so a concurrent `lookup` sees either the old or the
/// new snapshot, never a mix.
#[derive(Debug, Default)]
pub struct HeaderCache {
    snapshots: RwLock<HashMap<SessionId, Vec<HeaderEntry>>>,
}

impl HeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot for `session`.
    pub fn record(&self, session: SessionId, headers: Vec<HeaderEntry>) {
        debug!(%session, count = headers.len(), "recording header snapshot");
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.insert(session, headers);
    }

    /// Returns a copy of the snapshot for `session`, or an empty set.
    pub fn lookup(&self, session: SessionId) -> Vec<HeaderEntry> {
        let snapshots = self
            .snapshots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.get(&session).cloned().unwrap_or_default()
    }

    /// Feeds a network event into the cache. Sub-resource responses are
    /// ignored. Returns whether the event was recorded.
    pub fn observe(&self, event: ResponseEvent) -> bool {
        match event.resource {
            ResourceType::MainFrame => {
                self.record(event.session, event.headers);
                true
            }
            ResourceType::SubResource => {
                debug!(session = %event.session, "ignoring sub-resource response");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
