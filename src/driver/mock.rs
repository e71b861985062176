//! Mock driver implementations for testing
//!
//! This module provides mock implementations of the driver traits for
//! development and testing: pages with injectable diagnostic events,
//! browser handles with a controllable disconnect signal, and a connector
//! that counts attempts and can fail a configurable number of times.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::driver::traits::*;
use crate::Error;

/// Mock page driver
///
/// Actions performed against it are logged so tests can assert on the
/// sequence; diagnostic events are injected through [`MockPageDriver::push_event`].
#[derive(Debug)]
pub struct MockPageDriver {
    target_id: String,
    page_id: String,
    is_active: Arc<AtomicBool>,
    performed: Mutex<Vec<String>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PageEvent>>>,
    /// When set, every locator-based action fails with this message
    fail_actions: Mutex<Option<String>>,
}

impl MockPageDriver {
    /// Create a new mock page for the given target
    pub fn new<S: Into<String>>(target_id: S) -> Self {
        Self {
            target_id: target_id.into(),
            page_id: Uuid::new_v4().to_string(),
            is_active: Arc::new(AtomicBool::new(true)),
            performed: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            fail_actions: Mutex::new(None),
        }
    }

    /// Inject a diagnostic event, as the remote browser would report it
    pub fn push_event(&self, event: PageEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Make all subsequent locator-based actions fail
    pub fn fail_actions_with<S: Into<String>>(&self, message: S) {
        *self.fail_actions.lock().unwrap() = Some(message.into());
    }

    /// Actions performed so far, in order
    pub fn performed(&self) -> Vec<String> {
        self.performed.lock().unwrap().clone()
    }

    fn perform(&self, what: String) -> Result<(), Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::page_not_found(&self.page_id));
        }
        if let Some(msg) = self.fail_actions.lock().unwrap().clone() {
            return Err(Error::action_failed(msg));
        }
        self.performed.lock().unwrap().push(what);
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockPageDriver {
    fn target_id(&self) -> &str {
        &self.target_id
    }

    fn page_id(&self) -> &str {
        &self.page_id
    }

    async fn enable_events(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PageEvent>, Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn current_url(&self) -> Result<String, Error> {
        Ok("about:blank".to_string())
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.perform(format!("navigate {}", url))
    }

    async fn evaluate(&self, options: EvaluateOptions) -> Result<EvalOutcome, Error> {
        self.perform(format!("evaluate {}", options.expression))?;
        Ok(EvalOutcome {
            value: serde_json::Value::Null,
            exception: None,
        })
    }

    async fn screenshot(&self, _options: ScreenshotOptions) -> Result<Vec<u8>, Error> {
        self.perform("screenshot".to_string())?;
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn click(&self, locator: &Locator, _options: &ActionOptions) -> Result<(), Error> {
        self.perform(format!("click {}", locator))
    }

    async fn double_click(&self, locator: &Locator, _options: &ActionOptions) -> Result<(), Error> {
        self.perform(format!("double_click {}", locator))
    }

    async fn fill(
        &self,
        locator: &Locator,
        text: &str,
        _options: &ActionOptions,
    ) -> Result<(), Error> {
        self.perform(format!("fill {} {:?}", locator, text))
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        _delay: Duration,
        _options: &ActionOptions,
    ) -> Result<(), Error> {
        self.perform(format!("type {} {:?}", locator, text))
    }

    async fn press_key(
        &self,
        locator: &Locator,
        key: &str,
        _options: &ActionOptions,
    ) -> Result<(), Error> {
        self.perform(format!("press {} {}", locator, key))
    }

    async fn hover(&self, locator: &Locator, _options: &ActionOptions) -> Result<(), Error> {
        self.perform(format!("hover {}", locator))
    }

    async fn element_screenshot(
        &self,
        locator: &Locator,
        _options: &ActionOptions,
    ) -> Result<Vec<u8>, Error> {
        self.perform(format!("element_screenshot {}", locator))?;
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        self.push_event(PageEvent::Closed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Mock browser handle
#[derive(Debug)]
pub struct MockBrowserHandle {
    transport_url: String,
    pages: Mutex<Vec<Arc<MockPageDriver>>>,
    is_active: Arc<AtomicBool>,
    disconnect_tx: watch::Sender<bool>,
}

impl MockBrowserHandle {
    /// Create a new mock browser handle
    pub fn new<S: Into<String>>(transport_url: S) -> Self {
        let (disconnect_tx, _) = watch::channel(false);
        Self {
            transport_url: transport_url.into(),
            pages: Mutex::new(Vec::new()),
            is_active: Arc::new(AtomicBool::new(true)),
            disconnect_tx,
        }
    }

    /// Add a page backing the given target
    pub fn add_page<S: Into<String>>(&self, target_id: S) -> Arc<MockPageDriver> {
        let page = Arc::new(MockPageDriver::new(target_id));
        self.pages.lock().unwrap().push(Arc::clone(&page));
        page
    }

    /// Simulate a transport disconnect
    pub fn trigger_disconnect(&self) {
        self.is_active.store(false, Ordering::Relaxed);
        let _ = self.disconnect_tx.send(true);
    }
}

#[async_trait]
impl BrowserHandle for MockBrowserHandle {
    fn transport_url(&self) -> &str {
        &self.transport_url
    }

    async fn targets(&self) -> Result<Vec<TargetInfo>, Error> {
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .iter()
            .map(|p| TargetInfo {
                target_id: p.target_id().to_string(),
                kind: "page".to_string(),
                title: String::new(),
                url: "about:blank".to_string(),
                attached: true,
            })
            .collect())
    }

    async fn page_for_target(&self, target_id: &str) -> Result<Arc<dyn PageDriver>, Error> {
        let pages = self.pages.lock().unwrap();
        pages
            .iter()
            .find(|p| p.target_id() == target_id)
            .map(|p| Arc::clone(p) as Arc<dyn PageDriver>)
            .ok_or_else(|| Error::target_not_found(target_id))
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageDriver>>, Error> {
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn PageDriver>)
            .collect())
    }

    fn disconnect_signal(&self) -> watch::Receiver<bool> {
        self.disconnect_tx.subscribe()
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Mock connector
///
/// Counts connect attempts and can be configured to fail the first N of
/// them, or to delay so that concurrent callers overlap.
pub struct MockConnector {
    attempts: AtomicUsize,
    fail_first: AtomicUsize,
    connect_delay: Duration,
    handles: Mutex<Vec<Arc<MockBrowserHandle>>>,
}

impl MockConnector {
    /// Create a connector that succeeds immediately
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
            connect_delay: Duration::ZERO,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first `n` connect attempts
    pub fn fail_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::Relaxed);
        self
    }

    /// Delay every connect attempt, so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Number of connect attempts issued so far
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Handles produced by successful connects, in order
    pub fn handles(&self) -> Vec<Arc<MockBrowserHandle>> {
        self.handles.lock().unwrap().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn discover(&self, endpoint: &str, _timeout: Duration) -> Result<String, Error> {
        Ok(endpoint.to_string())
    }

    async fn connect(
        &self,
        transport_url: &str,
        _timeout: Duration,
    ) -> Result<Arc<dyn BrowserHandle>, Error> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }

        let remaining = self.fail_first.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::Relaxed);
            return Err(Error::websocket("mock connect refused"));
        }

        let handle = Arc::new(MockBrowserHandle::new(transport_url));
        self.handles.lock().unwrap().push(Arc::clone(&handle));
        Ok(handle)
    }
}
