//! Reference resolution
//!
//! Turns selector tokens into driver locators. Short-id tokens ("@e12",
//! "ref=e12", or bare "e12") resolve against the page's current snapshot
//! references; anything else passes through with any ref marker
//! stripped. A short-id token with no matching reference is an error,
//! never a silent fallback: acting on a guessed element is worse than
//! failing.

use crate::driver::traits::Locator;
use crate::page::PageState;
use crate::refs::cache::{FifoCache, RoleRefSnapshot, TargetKey, CROSS_SESSION_CAP};
use crate::{Error, Result};
use std::sync::Mutex;
use tracing::debug;

/// Two-tier reference cache
///
/// Tier one is the per-page snapshot stored in [`PageState`]; tier two is
/// a bounded cross-session cache keyed by (endpoint, target), used to
/// restore references onto a freshly attached page after a reconnect.
#[derive(Debug, Default)]
pub struct RefCache {
    cross_session: Mutex<FifoCache>,
}

impl RefCache {
    pub fn new() -> Self {
        Self {
            cross_session: Mutex::new(FifoCache::new(CROSS_SESSION_CAP)),
        }
    }

    /// Store a fresh snapshot's references in both tiers
    pub fn store_refs(&self, state: &Mutex<PageState>, key: TargetKey, snapshot: RoleRefSnapshot) {
        state.lock().unwrap().set_refs(snapshot.clone());
        self.cross_session.lock().unwrap().insert(key, snapshot);
    }

    /// Restore cross-session references onto a page without any
    ///
    /// A page that already has references keeps them: a live snapshot is
    /// always fresher than a cached one. Returns whether the page has
    /// references afterwards.
    pub fn restore_refs(&self, state: &Mutex<PageState>, key: &TargetKey) -> bool {
        let mut state = state.lock().unwrap();
        if state.has_refs() {
            return true;
        }
        let cross_session = self.cross_session.lock().unwrap();
        match cross_session.get(key) {
            Some(snapshot) => {
                debug!("Restoring snapshot refs for target {}", key.target_id);
                state.set_refs(snapshot.clone());
                true
            }
            None => false,
        }
    }

    /// Resolve a selector token into a driver locator
    ///
    /// Only short-id tokens go through the snapshot lookup; anything else
    /// (prefixed or not) is already driver-resolvable and passes through.
    pub fn resolve(&self, state: &Mutex<PageState>, token: &str) -> Result<Locator> {
        let stripped = strip_ref_prefix(token);

        if !is_short_id(stripped) {
            return Ok(Locator::Raw(stripped.to_string()));
        }

        let state = state.lock().unwrap();
        let entry = state
            .refs()
            .and_then(|snapshot| snapshot.get(stripped).map(|e| (e.clone(), snapshot.frame_selector.clone())));

        match entry {
            Some((entry, frame_selector)) => Ok(Locator::Role {
                role: entry.role,
                name: entry.name,
                nth: entry.nth,
                frame_selector,
            }),
            None => Err(Error::unknown_ref(stripped)),
        }
    }

    /// Number of cross-session snapshots held
    pub fn cross_session_count(&self) -> usize {
        self.cross_session.lock().unwrap().len()
    }

    /// Drop the cross-session snapshot for a target
    pub fn forget(&self, key: &TargetKey) {
        self.cross_session.lock().unwrap().remove(key);
    }
}

/// Strip an explicit ref marker, if present
fn strip_ref_prefix(token: &str) -> &str {
    if let Some(rest) = token.strip_prefix('@') {
        rest
    } else if let Some(rest) = token.strip_prefix("ref=") {
        rest
    } else {
        token
    }
}

/// Whether a token looks like a snapshot short id ("e12")
fn is_short_id(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let rest = chars.as_str();
    first.is_ascii_alphabetic() && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}
