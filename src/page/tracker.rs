//! Page state tracker
//!
//! Registry of per-page diagnostic state keyed by the driver's page
//! identity. Instrumenting a page subscribes to its diagnostic events
//! once and demultiplexes them into the page's [`PageState`] from a
//! background task; when the page closes its state is released.

use crate::driver::traits::{PageDriver, PageEvent};
use crate::page::state::PageState;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

struct TrackedPage {
    state: Arc<Mutex<PageState>>,
    /// Whether the event subscription for this page is running
    observed: bool,
}

/// Page state tracker
#[derive(Default)]
pub struct PageStateTracker {
    registry: Arc<Mutex<HashMap<String, TrackedPage>>>,
}

impl PageStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instrument a page and return its diagnostic state
    ///
    /// Idempotent: calling again for an already-observed page returns the
    /// existing state without creating a second subscription.
    pub async fn ensure_state(&self, page: &Arc<dyn PageDriver>) -> Result<Arc<Mutex<PageState>>> {
        let page_id = page.page_id().to_string();

        {
            let registry = self.registry.lock().unwrap();
            if let Some(tracked) = registry.get(&page_id) {
                if tracked.observed {
                    return Ok(Arc::clone(&tracked.state));
                }
            }
        }

        page.enable_events().await?;
        let events = page.subscribe().await?;

        let state = {
            let mut registry = self.registry.lock().unwrap();
            let tracked = registry.entry(page_id.clone()).or_insert_with(|| TrackedPage {
                state: Arc::new(Mutex::new(PageState::new())),
                observed: false,
            });
            if tracked.observed {
                // Lost the race to another caller; its task is already up
                return Ok(Arc::clone(&tracked.state));
            }
            tracked.observed = true;
            Arc::clone(&tracked.state)
        };

        debug!("Instrumenting page {} (target {})", page_id, page.target_id());
        let registry = Arc::clone(&self.registry);
        let demux_state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut events = events;
            while let Some(event) = events.recv().await {
                if matches!(event, PageEvent::Closed) {
                    break;
                }
                apply_event(&demux_state, event);
            }
            debug!("Releasing state for closed page {}", page_id);
            registry.lock().unwrap().remove(&page_id);
        });

        Ok(state)
    }

    /// Instrument every page of a browser and return their states
    ///
    /// Pages already being observed keep their existing subscription.
    pub async fn ensure_states(
        &self,
        pages: &[Arc<dyn PageDriver>],
    ) -> Result<Vec<(String, Arc<Mutex<PageState>>)>> {
        let mut states = Vec::with_capacity(pages.len());
        for page in pages {
            let state = self.ensure_state(page).await?;
            states.push((page.page_id().to_string(), state));
        }
        Ok(states)
    }

    /// Diagnostic state for a page, if it is instrumented
    pub fn state_for(&self, page_id: &str) -> Option<Arc<Mutex<PageState>>> {
        self.registry
            .lock()
            .unwrap()
            .get(page_id)
            .map(|tracked| Arc::clone(&tracked.state))
    }

    /// Number of pages currently tracked
    pub fn tracked_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }
}

fn apply_event(state: &Arc<Mutex<PageState>>, event: PageEvent) {
    let mut state = state.lock().unwrap();
    match event {
        PageEvent::Console {
            level,
            text,
            location,
        } => {
            trace!("console[{}]: {}", level, text);
            state.push_console(level, text, location);
        }
        PageEvent::PageError {
            message,
            name,
            stack,
        } => {
            trace!("page error: {}", message);
            state.push_error(message, name, stack);
        }
        PageEvent::RequestWillBeSent {
            request_key,
            method,
            url,
            resource_type,
        } => state.record_request(request_key, method, url, resource_type),
        PageEvent::ResponseReceived {
            request_key,
            status,
        } => state.complete_request(&request_key, status),
        PageEvent::RequestFailed {
            request_key,
            error_text,
        } => state.fail_request(&request_key, error_text),
        PageEvent::Closed => {}
    }
}
