//! Connection manager
//!
//! Owns the live connections to browser debug endpoints. Concurrent
//! callers for the same endpoint share one in-flight attempt; retries use
//! escalating per-attempt timeouts with deterministic backoff in between.

use crate::config::Config;
use crate::connection::endpoint::{normalize_endpoint, rewrite_transport_url};
use crate::driver::traits::{BrowserHandle, Connector, PageDriver};
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry behavior for connection attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of attempts before giving up
    pub attempts: u32,
    /// Timeout for the first attempt
    pub timeout_base: Duration,
    /// Timeout added per subsequent attempt
    pub timeout_increment: Duration,
    /// Backoff before the first retry
    pub backoff_base: Duration,
    /// Backoff added per subsequent retry
    pub backoff_increment: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            attempts: config.connect_attempts,
            timeout_base: Duration::from_millis(config.connect_timeout_base_ms),
            timeout_increment: Duration::from_millis(config.connect_timeout_increment_ms),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_increment: Duration::from_millis(config.backoff_increment_ms),
        }
    }
}

/// One live connection to a remote browser
#[derive(Debug)]
pub struct Connection {
    /// Normalized endpoint this connection serves
    endpoint: String,
    /// Browser-level handle over the transport
    browser: Arc<dyn BrowserHandle>,
    /// Set the instant the transport reports disconnection
    closed: AtomicBool,
}

impl Connection {
    fn new(endpoint: String, browser: Arc<dyn BrowserHandle>) -> Self {
        Self {
            endpoint,
            browser,
            closed: AtomicBool::new(false),
        }
    }

    /// Normalized endpoint this connection serves
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Browser-level handle over the transport
    pub fn browser(&self) -> Arc<dyn BrowserHandle> {
        Arc::clone(&self.browser)
    }

    /// Whether the connection is still usable
    pub fn is_live(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.browser.is_active()
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

type SharedConnect = Shared<BoxFuture<'static, std::result::Result<Arc<Connection>, Arc<Error>>>>;

#[derive(Default)]
struct ManagerState {
    cached: HashMap<String, Arc<Connection>>,
    inflight: HashMap<String, SharedConnect>,
}

/// Connection manager
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
    state: Arc<Mutex<ManagerState>>,
}

impl ConnectionManager {
    /// Create a manager over the given connector
    pub fn new(connector: Arc<dyn Connector>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            state: Arc::new(Mutex::new(ManagerState::default())),
        }
    }

    /// Get the connection for an endpoint, connecting lazily
    ///
    /// Idempotent and safe to call concurrently: callers racing on the
    /// same endpoint share one in-flight attempt. Once retries are
    /// exhausted the error is terminal for this call; the next call
    /// starts a fresh attempt cycle.
    pub async fn get_connection(&self, endpoint: &str) -> Result<Arc<Connection>> {
        let key = normalize_endpoint(endpoint);

        let shared = {
            let mut state = self.state.lock().unwrap();

            if let Some(existing) = state.cached.get(&key) {
                if existing.is_live() {
                    debug!("Reusing cached connection for {}", key);
                    return Ok(Arc::clone(existing));
                }
                state.cached.remove(&key);
            }

            match state.inflight.get(&key) {
                Some(inflight) => {
                    debug!("Joining in-flight connection attempt for {}", key);
                    inflight.clone()
                }
                None => {
                    let attempt = Self::establish(
                        Arc::clone(&self.connector),
                        self.policy.clone(),
                        key.clone(),
                        Arc::clone(&self.state),
                    )
                    .boxed()
                    .shared();
                    state.inflight.insert(key.clone(), attempt.clone());
                    attempt
                }
            }
        };

        shared.await.map_err(|e| match &*e {
            Error::Connection(msg) => Error::Connection(msg.clone()),
            other => Error::connection(other.to_string()),
        })
    }

    /// Get the page driver for a target, connecting lazily
    pub async fn page_for_target(
        &self,
        endpoint: &str,
        target_id: &str,
    ) -> Result<Arc<dyn PageDriver>> {
        let connection = self.get_connection(endpoint).await?;
        connection.browser().page_for_target(target_id).await
    }

    /// Drop the cached connection for an endpoint, if any
    pub async fn evict(&self, endpoint: &str) {
        let key = normalize_endpoint(endpoint);
        let removed = self.state.lock().unwrap().cached.remove(&key);
        if let Some(connection) = removed {
            connection.mark_closed();
            let _ = connection.browser().close().await;
        }
    }

    /// Number of live cached connections
    pub fn connection_count(&self) -> usize {
        self.state.lock().unwrap().cached.len()
    }

    /// Run one full attempt cycle and publish the result
    async fn establish(
        connector: Arc<dyn Connector>,
        policy: RetryPolicy,
        key: String,
        state: Arc<Mutex<ManagerState>>,
    ) -> std::result::Result<Arc<Connection>, Arc<Error>> {
        let result = Self::connect_with_retries(&*connector, &policy, &key).await;

        // Clear the in-flight slot and publish under one lock so late
        // joiners either see the cached connection or a fresh cycle.
        let connection = {
            let mut guard = state.lock().unwrap();
            guard.inflight.remove(&key);
            match result {
                Ok(browser) => {
                    let connection = Arc::new(Connection::new(key.clone(), browser));
                    guard.cached.insert(key.clone(), Arc::clone(&connection));
                    connection
                }
                Err(e) => return Err(Arc::new(e)),
            }
        };

        Self::watch_disconnect(Arc::clone(&state), key, Arc::clone(&connection));
        Ok(connection)
    }

    async fn connect_with_retries(
        connector: &dyn Connector,
        policy: &RetryPolicy,
        endpoint: &str,
    ) -> Result<Arc<dyn BrowserHandle>> {
        let mut failures: Vec<String> = Vec::new();

        for attempt in 0..policy.attempts {
            if attempt > 0 {
                let backoff = policy.backoff_base + policy.backoff_increment * (attempt - 1);
                tokio::time::sleep(backoff).await;
            }
            let timeout = policy.timeout_base + policy.timeout_increment * attempt;

            // Discovery failure is not fatal; the endpoint itself may be
            // a reachable transport address.
            let discovered = match connector.discover(endpoint, timeout).await {
                Ok(transport) => transport,
                Err(e) => {
                    debug!("Discovery for {} failed ({}), using endpoint directly", endpoint, e);
                    endpoint.to_string()
                }
            };

            let transport = match rewrite_transport_url(endpoint, &discovered) {
                Ok(transport) => transport,
                Err(e) => {
                    warn!("Transport rewrite for {} failed: {}", endpoint, e);
                    discovered
                }
            };

            match connector.connect(&transport, timeout).await {
                Ok(browser) => {
                    info!(
                        "Connected to {} via {} on attempt {}/{}",
                        endpoint,
                        transport,
                        attempt + 1,
                        policy.attempts
                    );
                    return Ok(browser);
                }
                Err(e) => {
                    warn!(
                        "Connection attempt {}/{} to {} failed: {}",
                        attempt + 1,
                        policy.attempts,
                        endpoint,
                        e
                    );
                    failures.push(e.to_string());
                }
            }
        }

        let last = failures
            .last()
            .cloned()
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(Error::connection(format!(
            "Failed to connect to {} after {} attempts: {}",
            endpoint, policy.attempts, last
        )))
    }

    /// Evict the cached connection when its transport disconnects
    ///
    /// A stale notification from a superseded connection must not evict a
    /// newer valid one, so eviction is guarded by pointer identity.
    fn watch_disconnect(
        state: Arc<Mutex<ManagerState>>,
        key: String,
        connection: Arc<Connection>,
    ) {
        let mut signal = connection.browser().disconnect_signal();
        tokio::spawn(async move {
            loop {
                if *signal.borrow() {
                    break;
                }
                if signal.changed().await.is_err() {
                    // Transport dropped without reporting; nothing to evict
                    return;
                }
            }

            connection.mark_closed();
            let mut guard = state.lock().unwrap();
            match guard.cached.get(&key) {
                Some(current) if Arc::ptr_eq(current, &connection) => {
                    guard.cached.remove(&key);
                    info!("Evicted disconnected connection for {}", key);
                }
                _ => {
                    debug!("Ignoring stale disconnect for superseded connection to {}", key);
                }
            }
        });
    }
}
