//! Core data types for findings, observed headers and scan results.
//!
//! - [`Finding`] - A single reported issue
//! - [`Severity`] - How serious a finding is
//! - [`HeaderEntry`] - One observed response header
//! - [`SessionId`] - A page-load context
//! - [`ScanResult`] - Output of one scan
//!
//! # Example
//!
//! ```
//! use pagescan::{Finding, ScanResult, Severity};
//!
//! let result = ScanResult::new(vec![Finding::new("CSP Missing", "", Severity::Medium)]);
//! assert_eq!(result.max_severity(), Some(Severity::Medium));
//! ```

mod finding;
mod header;

pub use finding::*;
pub use header::*;
