//! Per-page diagnostic state
//!
//! Bounded buffers of console output, uncaught errors, and network
//! activity for one page. Each buffer evicts oldest-first once full, so
//! a long-lived page holds a sliding window of recent activity rather
//! than growing without bound.

use crate::refs::RoleRefSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Console entries retained per page
pub const CONSOLE_CAP: usize = 500;
/// Uncaught errors retained per page
pub const ERROR_CAP: usize = 200;
/// Network request records retained per page
pub const REQUEST_CAP: usize = 500;

/// One captured console message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub timestamp: DateTime<Utc>,
    /// Severity as reported by the page ("log", "warn", "error", ...)
    pub level: String,
    pub text: String,
    /// Source location ("url:line"), when the page reported one
    pub location: Option<String>,
}

/// One captured uncaught error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub name: Option<String>,
    pub stack: Option<String>,
}

/// One observed network request
///
/// Created when the request is issued; `status`, `ok`, and `failure` are
/// filled in later when the response or failure arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRequestRecord {
    /// Monotonic per-page identifier, ordered by issue time
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub resource_type: String,
    /// HTTP status, once a response arrives
    pub status: Option<u16>,
    /// Whether the status was 2xx, once a response arrives
    pub ok: Option<bool>,
    /// Transport-level failure text, if the request never completed
    pub failure: Option<String>,
}

/// Diagnostic state for one page
#[derive(Debug, Default)]
pub struct PageState {
    console: VecDeque<ConsoleEntry>,
    errors: VecDeque<PageErrorEntry>,
    requests: VecDeque<NetworkRequestRecord>,
    /// Next value for [`NetworkRequestRecord::id`]
    next_request_id: u64,
    /// Protocol request key -> record id, for response correlation
    inflight: HashMap<String, u64>,
    /// Element references from the most recent page snapshot
    refs: Option<RoleRefSnapshot>,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a console message, evicting the oldest at capacity
    pub fn push_console(&mut self, level: String, text: String, location: Option<String>) {
        if self.console.len() == CONSOLE_CAP {
            self.console.pop_front();
        }
        self.console.push_back(ConsoleEntry {
            timestamp: Utc::now(),
            level,
            text,
            location,
        });
    }

    /// Append an uncaught error, evicting the oldest at capacity
    pub fn push_error(&mut self, message: String, name: Option<String>, stack: Option<String>) {
        if self.errors.len() == ERROR_CAP {
            self.errors.pop_front();
        }
        self.errors.push_back(PageErrorEntry {
            timestamp: Utc::now(),
            message,
            name,
            stack,
        });
    }

    /// Record an issued request, evicting the oldest at capacity
    pub fn record_request(
        &mut self,
        request_key: String,
        method: String,
        url: String,
        resource_type: String,
    ) {
        let id = self.next_request_id;
        self.next_request_id += 1;

        if self.requests.len() == REQUEST_CAP {
            if let Some(evicted) = self.requests.pop_front() {
                // A late response for an evicted record has nowhere to go
                self.inflight.retain(|_, v| *v != evicted.id);
            }
        }
        self.inflight.insert(request_key, id);
        self.requests.push_back(NetworkRequestRecord {
            id,
            timestamp: Utc::now(),
            method,
            url,
            resource_type,
            status: None,
            ok: None,
            failure: None,
        });
    }

    /// Back-fill the response status for an earlier request
    ///
    /// Silently ignored when the record was already evicted.
    pub fn complete_request(&mut self, request_key: &str, status: u16) {
        let Some(id) = self.inflight.remove(request_key) else {
            return;
        };
        if let Some(record) = self.requests.iter_mut().rev().find(|r| r.id == id) {
            record.status = Some(status);
            record.ok = Some((200..300).contains(&status));
        }
    }

    /// Back-fill the failure text for an earlier request
    pub fn fail_request(&mut self, request_key: &str, error_text: String) {
        let Some(id) = self.inflight.remove(request_key) else {
            return;
        };
        if let Some(record) = self.requests.iter_mut().rev().find(|r| r.id == id) {
            record.ok = Some(false);
            record.failure = Some(error_text);
        }
    }

    /// Console messages, oldest first
    pub fn console(&self) -> Vec<ConsoleEntry> {
        self.console.iter().cloned().collect()
    }

    /// Uncaught errors, oldest first
    pub fn errors(&self) -> Vec<PageErrorEntry> {
        self.errors.iter().cloned().collect()
    }

    /// Network requests, oldest first
    pub fn requests(&self) -> Vec<NetworkRequestRecord> {
        self.requests.iter().cloned().collect()
    }

    /// Drop all captured console messages
    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    /// Drop all captured errors
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Drop all captured network records
    pub fn clear_requests(&mut self) {
        self.requests.clear();
        self.inflight.clear();
    }

    /// Element references from the most recent snapshot, if any
    pub fn refs(&self) -> Option<&RoleRefSnapshot> {
        self.refs.as_ref()
    }

    /// Replace the page's element references
    pub fn set_refs(&mut self, refs: RoleRefSnapshot) {
        self.refs = Some(refs);
    }

    /// Take the element references out, leaving none behind
    pub fn take_refs(&mut self) -> Option<RoleRefSnapshot> {
        self.refs.take()
    }

    /// Whether the page has element references from a snapshot
    pub fn has_refs(&self) -> bool {
        self.refs.is_some()
    }
}
