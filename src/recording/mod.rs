//! Action recording and replay
//!
//! - `types`: persisted recording shapes
//! - `recorder`: single-session capture with relative timing
//! - `store`: one-file-per-recording JSON persistence
//! - `replay`: paced replay with per-action error aggregation
//! - `executor`: recorded actions mapped onto a live page driver

pub mod executor;
pub mod recorder;
pub mod replay;
pub mod store;
pub mod types;

pub use executor::PageExecutor;
pub use recorder::{ActionCapture, Recorder};
pub use replay::{ActionExecutor, ReplayError, ReplayReport, Replayer};
pub use store::RecordingStore;
pub use types::{ActionKind, ActionRecording, Point, RecordedAction, Viewport};

#[cfg(test)]
mod tests;
