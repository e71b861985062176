//! Connection management
//!
//! - `endpoint`: endpoint normalization and transport URL rewriting
//! - `manager`: cached connections with single-flight deduplication,
//!   retries, and disconnect-driven eviction

pub mod endpoint;
pub mod manager;

pub use endpoint::{http_base_url, normalize_endpoint, rewrite_transport_url, ws_page_url};
pub use manager::{Connection, ConnectionManager, RetryPolicy};
