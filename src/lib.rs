//! tabtether: session layer for remote-controlling browsers over their
//! debug protocol.
//!
//! The crate is organized around four pieces:
//! - [`connection`]: cached, deduplicated connections to debug endpoints
//!   with retry and disconnect-driven eviction
//! - [`page`]: per-page diagnostic state (console, errors, network) fed
//!   by driver events
//! - [`refs`]: snapshot element references and their resolution into
//!   locators, with a cross-session cache surviving reconnects
//! - [`recording`]: action capture, JSON persistence, and paced replay
//!
//! The [`driver`] module defines the traits these pieces talk through;
//! [`cdp`] implements them over the Chrome DevTools Protocol.

pub mod cdp;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod events;
pub mod page;
pub mod recording;
pub mod refs;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventHub, SessionEvent};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing from the environment, falling back to the given level
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
