//! Page diagnostic tracking
//!
//! - `state`: bounded per-page buffers of console output, errors, and
//!   network activity
//! - `tracker`: registry wiring driver events into per-page state

pub mod state;
pub mod tracker;

pub use state::{
    ConsoleEntry, NetworkRequestRecord, PageErrorEntry, PageState, CONSOLE_CAP, ERROR_CAP,
    REQUEST_CAP,
};
pub use tracker::PageStateTracker;

#[cfg(test)]
mod tests;
