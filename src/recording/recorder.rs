//! Action recorder
//!
//! Captures a timed sequence of actions into an in-memory session and
//! persists it on stop. At most one session is active at a time; actions
//! reported while no session is active are dropped, so instrumented call
//! sites do not need to check recorder state first.

use crate::events::{EventHub, SessionEvent};
use crate::recording::store::RecordingStore;
use crate::recording::types::{ActionKind, ActionRecording, Point, RecordedAction, Viewport};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// One action observed at a call site, before timing is stamped
#[derive(Debug, Clone)]
pub struct ActionCapture {
    pub kind: ActionKind,
    pub selector: Option<String>,
    pub value: Option<String>,
    pub coordinates: Option<Point>,
    pub description: Option<String>,
}

impl ActionCapture {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            selector: None,
            value: None,
            coordinates: None,
            description: None,
        }
    }

    pub fn selector<S: Into<String>>(mut self, selector: S) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn value<S: Into<String>>(mut self, value: S) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn coordinates(mut self, x: f64, y: f64) -> Self {
        self.coordinates = Some(Point { x, y });
        self
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

struct ActiveRecording {
    id: String,
    name: String,
    started_at: DateTime<Utc>,
    start: Instant,
    actions: Vec<RecordedAction>,
    start_url: Option<String>,
    viewport: Option<Viewport>,
}

/// Action recorder
pub struct Recorder {
    active: Mutex<Option<ActiveRecording>>,
    store: RecordingStore,
    events: Arc<EventHub>,
}

impl Recorder {
    pub fn new(store: RecordingStore, events: Arc<EventHub>) -> Self {
        Self {
            active: Mutex::new(None),
            store,
            events,
        }
    }

    /// Whether a recording session is active
    pub fn is_recording(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    /// Id of the active session, if any
    pub fn active_id(&self) -> Option<String> {
        self.active.lock().unwrap().as_ref().map(|a| a.id.clone())
    }

    /// Start a recording session and return its id
    ///
    /// Starting while a session is active discards the unfinished session
    /// and begins a new one.
    pub fn start<S: Into<String>>(
        &self,
        name: S,
        start_url: Option<String>,
        viewport: Option<Viewport>,
    ) -> String {
        let name = name.into();
        let id = new_recording_id();

        let mut active = self.active.lock().unwrap();
        if let Some(previous) = active.take() {
            warn!(
                "Discarding unfinished recording {} ({} actions) for new session",
                previous.id,
                previous.actions.len()
            );
        }
        *active = Some(ActiveRecording {
            id: id.clone(),
            name: name.clone(),
            started_at: Utc::now(),
            start: Instant::now(),
            actions: Vec::new(),
            start_url,
            viewport,
        });
        drop(active);

        info!("Started recording {} ({})", id, name);
        self.events
            .emit(SessionEvent::RecordingStarted { id: id.clone(), name });
        id
    }

    /// Append an action to the active session
    ///
    /// Dropped with a debug log when no session is active.
    pub fn record_action(&self, capture: ActionCapture) {
        let mut active = self.active.lock().unwrap();
        let Some(session) = active.as_mut() else {
            debug!("Dropping {} action: no active recording", capture.kind.as_str());
            return;
        };

        let offset_ms = session.start.elapsed().as_millis() as u64;
        session.actions.push(RecordedAction {
            kind: capture.kind,
            selector: capture.selector,
            value: capture.value,
            coordinates: capture.coordinates,
            offset_ms,
            description: capture.description,
        });
        let id = session.id.clone();
        drop(active);

        self.events.emit(SessionEvent::ActionRecorded {
            id,
            kind: capture.kind.as_str().to_string(),
        });
    }

    /// Stop the active session, persist it, and return the recording
    ///
    /// Returns `None` when no session is active.
    pub async fn stop(&self, description: Option<String>) -> Result<Option<ActionRecording>> {
        let Some(session) = self.active.lock().unwrap().take() else {
            debug!("Stop requested with no active recording");
            return Ok(None);
        };

        let recording = ActionRecording {
            id: session.id,
            name: session.name,
            description,
            created_at: session.started_at,
            duration_ms: session.start.elapsed().as_millis() as u64,
            actions: session.actions,
            start_url: session.start_url,
            viewport: session.viewport,
        };

        self.store.save(&recording).await?;
        info!(
            "Stopped recording {} with {} actions",
            recording.id,
            recording.actions.len()
        );
        self.events.emit(SessionEvent::RecordingStopped {
            id: recording.id.clone(),
            actions: recording.actions.len(),
        });
        Ok(Some(recording))
    }
}

fn new_recording_id() -> String {
    format!(
        "rec_{}_{:06x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>() & 0xff_ffff
    )
}
