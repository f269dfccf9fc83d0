pub mod cache;
pub mod checker;
pub mod config;
pub mod error;
pub mod host;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod store;

pub use cache::HeaderCache;
pub use config::Config;
pub use error::HostError;
pub use model::{Finding, HeaderEntry, ScanResult, SessionId, Severity};
pub use orchestrator::{Orchestrator, PageOutcome};
pub use store::ResultStore;
