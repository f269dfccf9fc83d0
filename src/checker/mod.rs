//! Rule evaluators.
//!
//! - [`evaluate_headers`] inspects the top-level response headers.
//! - [`evaluate_page`] inspects the loaded document from inside the page.

mod headers;
mod page;

pub use headers::evaluate_headers;
pub use page::{evaluate_page, PageDocument};
