//! Snapshot reference storage
//!
//! Element references produced by a page snapshot. The per-page tier
//! lives in [`crate::page::PageState`]; this module holds the snapshot
//! types and the bounded cross-session tier keyed by (endpoint, target),
//! which survives reconnects to the same browser.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cross-session snapshots retained across all targets
pub const CROSS_SESSION_CAP: usize = 50;

/// How a snapshot was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    /// Full accessibility tree
    Aria,
    /// Role-filtered interactive elements
    Role,
}

/// One element reference captured by a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRefEntry {
    /// Accessibility role ("button", "link", ...)
    pub role: String,
    /// Exact accessible name, when the element has one
    pub name: Option<String>,
    /// Disambiguating index among same-role same-name matches
    pub nth: Option<usize>,
}

/// Element references from one page snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRefSnapshot {
    /// Short id ("e12") -> element reference
    pub refs: HashMap<String, RoleRefEntry>,
    /// Frame the snapshot was scoped to, when not the main frame
    pub frame_selector: Option<String>,
    pub mode: SnapshotMode,
}

impl RoleRefSnapshot {
    pub fn new(mode: SnapshotMode) -> Self {
        Self {
            refs: HashMap::new(),
            frame_selector: None,
            mode,
        }
    }

    /// Look up one reference by its short id
    pub fn get(&self, short_id: &str) -> Option<&RoleRefEntry> {
        self.refs.get(short_id)
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Identity of a page target on a particular endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    /// Normalized endpoint
    pub endpoint: String,
    /// Browser-issued target identifier
    pub target_id: String,
}

impl TargetKey {
    pub fn new<E: Into<String>, T: Into<String>>(endpoint: E, target_id: T) -> Self {
        Self {
            endpoint: endpoint.into(),
            target_id: target_id.into(),
        }
    }
}

/// Bounded insertion-ordered map
///
/// At capacity the entry inserted longest ago is evicted. Re-inserting an
/// existing key replaces its value but keeps its position in the eviction
/// order; lookups do not affect the order either.
#[derive(Debug, Default)]
pub struct FifoCache {
    entries: Vec<(TargetKey, RoleRefSnapshot)>,
    capacity: usize,
}

impl FifoCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn insert(&mut self, key: TargetKey, snapshot: RoleRefSnapshot) {
        if let Some(existing) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = snapshot;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.remove(0);
        }
        self.entries.push((key, snapshot));
    }

    pub fn get(&self, key: &TargetKey) -> Option<&RoleRefSnapshot> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &TargetKey) -> Option<RoleRefSnapshot> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest key in eviction order, if any
    pub fn oldest(&self) -> Option<&TargetKey> {
        self.entries.first().map(|(k, _)| k)
    }
}
