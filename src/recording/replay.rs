//! Recording replay
//!
//! Replays a recording against an [`ActionExecutor`], reproducing the
//! recorded pacing. Inter-action waits are derived from consecutive
//! offsets and divided by the speed factor, so a 2x replay of a 10s
//! recording takes about 5s. Failures are collected per action and the
//! sequence continues; a replay report never hides later failures behind
//! an early one.

use crate::events::{EventHub, SessionEvent};
use crate::recording::store::RecordingStore;
use crate::recording::types::{ActionRecording, RecordedAction};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Executes one recorded action against a live page
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &RecordedAction) -> Result<()>;
}

/// Failure of one action during replay
#[derive(Debug, Clone)]
pub struct ReplayError {
    /// Index of the failed action within the recording
    pub index: usize,
    pub message: String,
}

/// Outcome of a replay run
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Whether every action succeeded
    pub ok: bool,
    /// Number of actions that executed successfully
    pub actions_executed: usize,
    pub errors: Vec<ReplayError>,
}

/// Recording replayer
pub struct Replayer {
    events: Arc<EventHub>,
}

impl Replayer {
    pub fn new(events: Arc<EventHub>) -> Self {
        Self { events }
    }

    /// Load a recording from the store and replay it
    pub async fn replay_stored(
        &self,
        store: &RecordingStore,
        id: &str,
        speed: f64,
        executor: &dyn ActionExecutor,
    ) -> Result<ReplayReport> {
        let recording = store.load(id).await?;
        self.replay(&recording, speed, executor).await
    }

    /// Replay a recording at the given speed factor
    ///
    /// `speed` scales the recorded pacing: 2.0 halves every wait, 0.5
    /// doubles it. It must be a positive finite number.
    pub async fn replay(
        &self,
        recording: &ActionRecording,
        speed: f64,
        executor: &dyn ActionExecutor,
    ) -> Result<ReplayReport> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::invalid_argument(format!(
                "Replay speed must be a positive number, got {}",
                speed
            )));
        }

        info!(
            "Replaying recording {} ({} actions) at {}x",
            recording.id,
            recording.actions.len(),
            speed
        );
        self.events.emit(SessionEvent::ReplayStarted {
            id: recording.id.clone(),
            actions: recording.actions.len(),
        });

        let mut executed = 0usize;
        let mut errors = Vec::new();
        let mut prev_offset_ms = 0u64;

        for (index, action) in recording.actions.iter().enumerate() {
            let gap_ms = action.offset_ms.saturating_sub(prev_offset_ms);
            prev_offset_ms = action.offset_ms;
            let wait_ms = (gap_ms as f64 / speed) as u64;
            if wait_ms > 0 {
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }

            debug!("Replaying action {} ({})", index, action.kind.as_str());
            let outcome = executor.execute(action).await;
            let ok = outcome.is_ok();
            match outcome {
                Ok(()) => executed += 1,
                Err(e) => {
                    warn!("Action {} of {} failed: {}", index, recording.id, e);
                    errors.push(ReplayError {
                        index,
                        message: e.to_string(),
                    });
                }
            }
            self.events.emit(SessionEvent::ActionReplayed {
                id: recording.id.clone(),
                index,
                ok,
            });
        }

        let report = ReplayReport {
            ok: errors.is_empty(),
            actions_executed: executed,
            errors,
        };
        info!(
            "Replay of {} finished: {}/{} actions succeeded",
            recording.id,
            report.actions_executed,
            recording.actions.len()
        );
        self.events.emit(SessionEvent::ReplayCompleted {
            id: recording.id.clone(),
            ok: report.ok,
            actions_executed: report.actions_executed,
        });
        Ok(report)
    }
}
