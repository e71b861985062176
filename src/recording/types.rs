//! Recording data model
//!
//! Serialized shapes for persisted recordings. Actions carry an offset
//! from the recording's start rather than absolute timestamps, so replay
//! timing is independent of when the recording was made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Type,
    Navigate,
    Scroll,
    Wait,
    Keypress,
    Screenshot,
    Select,
}

impl ActionKind {
    /// Lowercase wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Navigate => "navigate",
            ActionKind::Scroll => "scroll",
            ActionKind::Wait => "wait",
            ActionKind::Keypress => "keypress",
            ActionKind::Screenshot => "screenshot",
            ActionKind::Select => "select",
        }
    }
}

/// A point on the page, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One action in a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Selector token the action targets, when it targets an element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Typed text, navigation URL, key name, or scroll/wait argument
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Pointer coordinates, when captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Point>,
    /// Milliseconds since the recording started
    pub offset_ms: u64,
    /// Human-readable description of the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Viewport dimensions at recording time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A persisted recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecording {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub actions: Vec<RecordedAction>,
    /// Wall-clock length of the recording session
    pub duration_ms: u64,
    /// URL the page was on when recording started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}
