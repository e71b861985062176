//! Driver layer traits
//!
//! The control plane consumes the browser-automation driver through these
//! interfaces: a [`Connector`] that dials a debug endpoint, a
//! [`BrowserHandle`] for browser-level operations, and a [`PageDriver`]
//! carrying the raw per-page primitives (events, evaluate, screenshot,
//! locator-based input).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// A resolved element locator, ready for driver-native lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    /// Accessibility role plus optional exact accessible name and
    /// disambiguating index, optionally scoped to a frame selector
    Role {
        role: String,
        name: Option<String>,
        nth: Option<usize>,
        frame_selector: Option<String>,
    },
    /// CSS selector
    Css(String),
    /// Already-resolved low-level reference, handed to the driver verbatim
    Raw(String),
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Role { role, name, nth, .. } => {
                write!(f, "role={}", role)?;
                if let Some(name) = name {
                    write!(f, " name={:?}", name)?;
                }
                if let Some(nth) = nth {
                    write!(f, " nth={}", nth)?;
                }
                Ok(())
            }
            Locator::Css(sel) => write!(f, "css={}", sel),
            Locator::Raw(token) => write!(f, "ref={}", token),
        }
    }
}

/// Mouse button for click-style actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

/// Modifier keys held during an input action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Alt,
    Control,
    Meta,
    Shift,
}

/// Options for locator-based input actions
#[derive(Debug, Clone)]
pub struct ActionOptions {
    /// Per-call timeout
    pub timeout: Duration,
    /// Mouse button for click actions
    pub button: MouseButton,
    /// Modifier keys held during the action
    pub modifiers: Vec<Modifier>,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            button: MouseButton::Left,
            modifiers: Vec::new(),
        }
    }
}

/// Screenshot image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenshotFormat {
    #[default]
    Png,
    /// JPEG with quality 0-100
    Jpeg(u8),
}

/// Screenshot options
#[derive(Debug, Clone, Default)]
pub struct ScreenshotOptions {
    pub format: ScreenshotFormat,
    /// Capture the full scrollable page instead of the viewport
    pub full_page: bool,
}

/// Options for expression evaluation in page context
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    /// Expression to evaluate
    pub expression: String,
    /// Await the result if it is a promise
    pub await_promise: bool,
    /// Return the result by value rather than as a remote handle
    pub return_by_value: bool,
}

impl EvaluateOptions {
    pub fn expression<S: Into<String>>(expression: S) -> Self {
        Self {
            expression: expression.into(),
            await_promise: false,
            return_by_value: true,
        }
    }
}

/// Evaluation outcome; exceptions are surfaced separately from the result
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    /// Result value (null when the evaluation threw)
    pub value: serde_json::Value,
    /// Exception description, if the evaluation threw
    pub exception: Option<String>,
}

/// Diagnostic event reported by a page
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// Console output
    Console {
        level: String,
        text: String,
        location: Option<String>,
    },
    /// Uncaught page error
    PageError {
        message: String,
        name: Option<String>,
        stack: Option<String>,
    },
    /// A network request is about to be sent. The key identifies the
    /// request for later response/failure correlation.
    RequestWillBeSent {
        request_key: String,
        method: String,
        url: String,
        resource_type: String,
    },
    /// A response arrived for an earlier request
    ResponseReceived { request_key: String, status: u16 },
    /// A request failed
    RequestFailed {
        request_key: String,
        error_text: String,
    },
    /// The page closed
    Closed,
}

/// Target information reported by the remote browser
#[derive(Debug, Clone)]
pub struct TargetInfo {
    /// Stable target identifier issued by the browser
    pub target_id: String,
    /// Target type ("page", "worker", ...)
    pub kind: String,
    /// Target title
    pub title: String,
    /// Target URL
    pub url: String,
    /// Whether a debugger is attached
    pub attached: bool,
}

/// Per-page driver primitives
#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Stable target identifier of the logical tab this page backs
    fn target_id(&self) -> &str;

    /// Identity of this in-process page object. Distinct page objects may
    /// back the same target over time (e.g. after a reconnect).
    fn page_id(&self) -> &str;

    /// Enable the event channels needed for diagnostic capture
    async fn enable_events(&self) -> Result<(), crate::Error>;

    /// Subscribe to the page's diagnostic event stream
    async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PageEvent>, crate::Error>;

    /// Current page URL
    async fn current_url(&self) -> Result<String, crate::Error>;

    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<(), crate::Error>;

    /// Evaluate an expression in page context
    async fn evaluate(&self, options: EvaluateOptions) -> Result<EvalOutcome, crate::Error>;

    /// Capture a page screenshot
    async fn screenshot(&self, options: ScreenshotOptions) -> Result<Vec<u8>, crate::Error>;

    /// Click the element addressed by the locator
    async fn click(&self, locator: &Locator, options: &ActionOptions) -> Result<(), crate::Error>;

    /// Double-click the element addressed by the locator
    async fn double_click(
        &self,
        locator: &Locator,
        options: &ActionOptions,
    ) -> Result<(), crate::Error>;

    /// Replace the element's value with the given text
    async fn fill(
        &self,
        locator: &Locator,
        text: &str,
        options: &ActionOptions,
    ) -> Result<(), crate::Error>;

    /// Type text into the element, one character at a time
    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        delay: Duration,
        options: &ActionOptions,
    ) -> Result<(), crate::Error>;

    /// Press a key with the element focused
    async fn press_key(
        &self,
        locator: &Locator,
        key: &str,
        options: &ActionOptions,
    ) -> Result<(), crate::Error>;

    /// Hover over the element addressed by the locator
    async fn hover(&self, locator: &Locator, options: &ActionOptions) -> Result<(), crate::Error>;

    /// Screenshot a single element
    async fn element_screenshot(
        &self,
        locator: &Locator,
        options: &ActionOptions,
    ) -> Result<Vec<u8>, crate::Error>;

    /// Close the page
    async fn close(&self) -> Result<(), crate::Error>;

    /// Check if the page is still usable
    fn is_active(&self) -> bool;
}

/// Browser-level handle over one live transport connection
#[async_trait]
pub trait BrowserHandle: Send + Sync + std::fmt::Debug {
    /// Transport address this handle is connected through
    fn transport_url(&self) -> &str;

    /// List all targets of the browser
    async fn targets(&self) -> Result<Vec<TargetInfo>, crate::Error>;

    /// Get (or attach) the page driver for a target
    async fn page_for_target(&self, target_id: &str) -> Result<Arc<dyn PageDriver>, crate::Error>;

    /// All page drivers across the browser's browsing contexts
    async fn pages(&self) -> Result<Vec<Arc<dyn PageDriver>>, crate::Error>;

    /// Signal that flips to `true` when the transport disconnects
    fn disconnect_signal(&self) -> watch::Receiver<bool>;

    /// Close the handle and all attached pages
    async fn close(&self) -> Result<(), crate::Error>;

    /// Check if the transport is still connected
    fn is_active(&self) -> bool;
}

/// Dials a browser debug endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    /// Discover the browser's self-reported transport address for an
    /// endpoint, propagating credentials carried by the endpoint URL.
    async fn discover(&self, endpoint: &str, timeout: Duration) -> Result<String, crate::Error>;

    /// Open a transport connection to the given address
    async fn connect(
        &self,
        transport_url: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn BrowserHandle>, crate::Error>;
}
