//! Chrome DevTools Protocol driver
//!
//! Concrete implementation of the driver traits over CDP:
//! - `connection`: WebSocket connection with command/response correlation
//!   and event fan-out
//! - `page`: per-target page driver translating CDP notifications into
//!   diagnostic events and dispatching raw input
//! - `browser`: browser-level handle (target listing, page attachment) and
//!   the endpoint connector
//! - `types`: JSON-RPC wire frames

pub mod browser;
pub mod connection;
pub mod page;
pub mod types;

pub use browser::{CdpBrowserHandle, CdpConnector};
pub use connection::CdpConnection;
pub use page::CdpPageDriver;
pub use types::{CdpEvent, CdpNotification, CdpRequest, CdpRpcResponse};
