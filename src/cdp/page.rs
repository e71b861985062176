//! CDP page driver
//!
//! Implements [`PageDriver`] over a dedicated CDP connection to one page
//! target. Diagnostic notifications are translated into [`PageEvent`]s;
//! input actions locate the element via an injected expression and then
//! dispatch raw `Input.*` commands at its center point.

use super::connection::CdpConnection;
use crate::driver::traits::{
    ActionOptions, EvalOutcome, EvaluateOptions, Locator, Modifier, MouseButton, PageDriver,
    PageEvent, ScreenshotFormat, ScreenshotOptions,
};
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// CDP-backed page driver
#[derive(Debug)]
pub struct CdpPageDriver {
    target_id: String,
    page_id: String,
    connection: Arc<CdpConnection>,
}

impl CdpPageDriver {
    /// Create a driver for a target over its dedicated connection
    pub fn new<S: Into<String>>(target_id: S, connection: Arc<CdpConnection>) -> Self {
        Self {
            target_id: target_id.into(),
            page_id: Uuid::new_v4().to_string(),
            connection,
        }
    }

    async fn with_timeout<T, F>(&self, timeout: Duration, what: String, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "{} timed out after {}ms",
                what,
                timeout.as_millis()
            ))),
        }
    }

    /// Find the element and return its center point in viewport coordinates
    async fn element_center(&self, locator: &Locator) -> Result<(f64, f64), Error> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return null; \
             el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
             const r = el.getBoundingClientRect(); \
             return {{ x: r.x + r.width / 2, y: r.y + r.height / 2 }}; }})()",
            locator_expression(locator)
        );

        let outcome = self
            .evaluate(EvaluateOptions::expression(script))
            .await?;
        if let Some(exception) = outcome.exception {
            return Err(Error::action_failed(format!(
                "Locating {} failed: {}",
                locator, exception
            )));
        }

        let x = outcome.value.get("x").and_then(|v| v.as_f64());
        let y = outcome.value.get("y").and_then(|v| v.as_f64());
        match (x, y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(Error::action_failed(format!(
                "No element matching {}",
                locator
            ))),
        }
    }

    /// Focus the element addressed by the locator
    async fn focus_element(&self, locator: &Locator) -> Result<(), Error> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return false; el.focus(); return true; }})()",
            locator_expression(locator)
        );
        let outcome = self.evaluate(EvaluateOptions::expression(script)).await?;
        if outcome.value.as_bool() != Some(true) {
            return Err(Error::action_failed(format!(
                "No element matching {}",
                locator
            )));
        }
        Ok(())
    }

    async fn dispatch_mouse_click(
        &self,
        x: f64,
        y: f64,
        options: &ActionOptions,
        click_count: u32,
    ) -> Result<(), Error> {
        let button = mouse_button_name(options.button);
        let modifiers = modifier_mask(&options.modifiers);

        for event_type in ["mousePressed", "mouseReleased"] {
            self.connection
                .send_command(
                    "Input.dispatchMouseEvent",
                    json!({
                        "type": event_type,
                        "x": x,
                        "y": y,
                        "button": button,
                        "clickCount": click_count,
                        "modifiers": modifiers,
                    }),
                )
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for CdpPageDriver {
    fn target_id(&self) -> &str {
        &self.target_id
    }

    fn page_id(&self) -> &str {
        &self.page_id
    }

    async fn enable_events(&self) -> Result<(), Error> {
        for domain in ["Page", "Runtime", "Network"] {
            self.connection
                .send_command(&format!("{}.enable", domain), json!({}))
                .await?;
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PageEvent>, Error> {
        let mut cdp_events = self.connection.subscribe_events().await;
        let (tx, rx) = mpsc::unbounded_channel();
        let target_id = self.target_id.clone();

        tokio::spawn(async move {
            while let Some(event) = cdp_events.recv().await {
                let translated = translate_event(&event.method, &event.params);
                let closed = matches!(translated, Some(PageEvent::Closed));
                if let Some(page_event) = translated {
                    if tx.send(page_event).is_err() {
                        break;
                    }
                }
                if closed {
                    break;
                }
            }
            // The CDP stream ending means the page connection is gone;
            // report it as a close so trackers release their state.
            let _ = tx.send(PageEvent::Closed);
            debug!("Event stream for target {} ended", target_id);
        });

        Ok(rx)
    }

    async fn current_url(&self) -> Result<String, Error> {
        let outcome = self
            .evaluate(EvaluateOptions::expression("location.href"))
            .await?;
        Ok(outcome.value.as_str().unwrap_or("").to_string())
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        debug!("Navigating target {} to {}", self.target_id, url);
        let result = self
            .connection
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            return Err(Error::action_failed(format!(
                "Navigation to {} failed: {}",
                url, error_text
            )));
        }
        Ok(())
    }

    async fn evaluate(&self, options: EvaluateOptions) -> Result<EvalOutcome, Error> {
        let result = self
            .connection
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": options.expression,
                    "awaitPromise": options.await_promise,
                    "returnByValue": options.return_by_value,
                }),
            )
            .await?;

        let exception = result.get("exceptionDetails").map(|details| {
            details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .or_else(|| details.get("text").and_then(|t| t.as_str()))
                .unwrap_or("Unknown exception")
                .to_string()
        });

        let value = result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        Ok(EvalOutcome { value, exception })
    }

    async fn screenshot(&self, options: ScreenshotOptions) -> Result<Vec<u8>, Error> {
        let mut params = match options.format {
            ScreenshotFormat::Png => json!({ "format": "png" }),
            ScreenshotFormat::Jpeg(quality) => {
                json!({ "format": "jpeg", "quality": quality })
            }
        };
        if options.full_page {
            params["captureBeyondViewport"] = json!(true);
        }

        let result = self
            .connection
            .send_command("Page.captureScreenshot", params)
            .await?;
        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;
        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn click(&self, locator: &Locator, options: &ActionOptions) -> Result<(), Error> {
        self.with_timeout(options.timeout, format!("click on {}", locator), async {
            let (x, y) = self.element_center(locator).await?;
            self.dispatch_mouse_click(x, y, options, 1).await
        })
        .await
    }

    async fn double_click(&self, locator: &Locator, options: &ActionOptions) -> Result<(), Error> {
        self.with_timeout(
            options.timeout,
            format!("double click on {}", locator),
            async {
                let (x, y) = self.element_center(locator).await?;
                self.dispatch_mouse_click(x, y, options, 2).await
            },
        )
        .await
    }

    async fn fill(
        &self,
        locator: &Locator,
        text: &str,
        options: &ActionOptions,
    ) -> Result<(), Error> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return false; el.focus(); \
             if ('value' in el) {{ el.value = {}; }} else {{ el.textContent = {}; }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            locator_expression(locator),
            js_string(text),
            js_string(text),
        );

        self.with_timeout(options.timeout, format!("fill on {}", locator), async {
            let outcome = self.evaluate(EvaluateOptions::expression(script)).await?;
            if outcome.value.as_bool() != Some(true) {
                return Err(Error::action_failed(format!(
                    "No element matching {}",
                    locator
                )));
            }
            Ok(())
        })
        .await
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        delay: Duration,
        options: &ActionOptions,
    ) -> Result<(), Error> {
        self.with_timeout(options.timeout, format!("type on {}", locator), async {
            self.focus_element(locator).await?;
            for ch in text.chars() {
                self.connection
                    .send_command("Input.insertText", json!({ "text": ch.to_string() }))
                    .await?;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Ok(())
        })
        .await
    }

    async fn press_key(
        &self,
        locator: &Locator,
        key: &str,
        options: &ActionOptions,
    ) -> Result<(), Error> {
        let modifiers = modifier_mask(&options.modifiers);
        self.with_timeout(
            options.timeout,
            format!("press {} on {}", key, locator),
            async {
                self.focus_element(locator).await?;
                for event_type in ["rawKeyDown", "keyUp"] {
                    self.connection
                        .send_command(
                            "Input.dispatchKeyEvent",
                            json!({
                                "type": event_type,
                                "key": key,
                                "modifiers": modifiers,
                            }),
                        )
                        .await?;
                }
                Ok(())
            },
        )
        .await
    }

    async fn hover(&self, locator: &Locator, options: &ActionOptions) -> Result<(), Error> {
        self.with_timeout(options.timeout, format!("hover on {}", locator), async {
            let (x, y) = self.element_center(locator).await?;
            self.connection
                .send_command(
                    "Input.dispatchMouseEvent",
                    json!({ "type": "mouseMoved", "x": x, "y": y }),
                )
                .await?;
            Ok(())
        })
        .await
    }

    async fn element_screenshot(
        &self,
        locator: &Locator,
        options: &ActionOptions,
    ) -> Result<Vec<u8>, Error> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return null; \
             const r = el.getBoundingClientRect(); \
             return {{ x: r.x, y: r.y, width: r.width, height: r.height }}; }})()",
            locator_expression(locator)
        );

        self.with_timeout(
            options.timeout,
            format!("screenshot of {}", locator),
            async {
                let outcome = self.evaluate(EvaluateOptions::expression(script)).await?;
                if outcome.value.is_null() {
                    return Err(Error::action_failed(format!(
                        "No element matching {}",
                        locator
                    )));
                }

                let result = self
                    .connection
                    .send_command(
                        "Page.captureScreenshot",
                        json!({
                            "format": "png",
                            "clip": {
                                "x": outcome.value.get("x"),
                                "y": outcome.value.get("y"),
                                "width": outcome.value.get("width"),
                                "height": outcome.value.get("height"),
                                "scale": 1.0,
                            },
                        }),
                    )
                    .await?;
                let data = result
                    .get("data")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::cdp("No data in screenshot result"))?;
                BASE64
                    .decode(data)
                    .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
            },
        )
        .await
    }

    async fn close(&self) -> Result<(), Error> {
        if let Err(e) = self
            .connection
            .send_command("Page.close", json!({}))
            .await
        {
            warn!("Page.close for target {} failed: {}", self.target_id, e);
        }
        self.connection.close().await
    }

    fn is_active(&self) -> bool {
        self.connection.is_active()
    }
}

/// Translate a CDP notification into a diagnostic [`PageEvent`]
fn translate_event(method: &str, params: &serde_json::Value) -> Option<PageEvent> {
    match method {
        "Runtime.consoleAPICalled" => {
            let level = params
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("log")
                .to_string();
            let text = params
                .get("args")
                .and_then(|v| v.as_array())
                .map(|args| {
                    args.iter()
                        .map(render_remote_object)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            let location = params
                .get("stackTrace")
                .and_then(|s| s.get("callFrames"))
                .and_then(|f| f.get(0))
                .map(|frame| {
                    format!(
                        "{}:{}",
                        frame.get("url").and_then(|v| v.as_str()).unwrap_or(""),
                        frame.get("lineNumber").and_then(|v| v.as_u64()).unwrap_or(0)
                    )
                });
            Some(PageEvent::Console {
                level,
                text,
                location,
            })
        }
        "Runtime.exceptionThrown" => {
            let details = params.get("exceptionDetails")?;
            let message = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .or_else(|| details.get("text").and_then(|t| t.as_str()))
                .unwrap_or("Uncaught exception")
                .to_string();
            let name = details
                .get("exception")
                .and_then(|e| e.get("className"))
                .and_then(|c| c.as_str())
                .map(|s| s.to_string());
            let stack = details
                .get("stackTrace")
                .map(|s| s.to_string());
            Some(PageEvent::PageError {
                message,
                name,
                stack,
            })
        }
        "Network.requestWillBeSent" => Some(PageEvent::RequestWillBeSent {
            request_key: params
                .get("requestId")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            method: params
                .get("request")
                .and_then(|r| r.get("method"))
                .and_then(|m| m.as_str())
                .unwrap_or("GET")
                .to_string(),
            url: params
                .get("request")
                .and_then(|r| r.get("url"))
                .and_then(|u| u.as_str())
                .unwrap_or("")
                .to_string(),
            resource_type: params
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("Other")
                .to_string(),
        }),
        "Network.responseReceived" => Some(PageEvent::ResponseReceived {
            request_key: params
                .get("requestId")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            status: params
                .get("response")
                .and_then(|r| r.get("status"))
                .and_then(|s| s.as_u64())
                .unwrap_or(0) as u16,
        }),
        "Network.loadingFailed" => Some(PageEvent::RequestFailed {
            request_key: params
                .get("requestId")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            error_text: params
                .get("errorText")
                .and_then(|v| v.as_str())
                .unwrap_or("Loading failed")
                .to_string(),
        }),
        "Inspector.detached" => Some(PageEvent::Closed),
        _ => None,
    }
}

/// Render a console argument RemoteObject as display text
fn render_remote_object(obj: &serde_json::Value) -> String {
    if let Some(value) = obj.get("value") {
        if let Some(s) = value.as_str() {
            return s.to_string();
        }
        return value.to_string();
    }
    obj.get("description")
        .and_then(|d| d.as_str())
        .unwrap_or("undefined")
        .to_string()
}

/// Build a JS expression that evaluates to the element for a locator, or null
fn locator_expression(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) | Locator::Raw(selector) => {
            format!("document.querySelector({})", js_string(selector))
        }
        Locator::Role {
            role,
            name,
            nth,
            frame_selector,
        } => {
            let scope = match frame_selector {
                Some(frame) => format!(
                    "((document.querySelector({}) || {{}}).contentDocument || document)",
                    js_string(frame)
                ),
                None => "document".to_string(),
            };
            let mut selectors = vec![format!("[role={:?}]", role)];
            if let Some(tags) = implicit_role_tags(role) {
                selectors.push(tags.to_string());
            }
            let name_filter = match name {
                Some(name) => format!(
                    ".filter(el => ((el.getAttribute('aria-label') || el.textContent || '').trim() === {}))",
                    js_string(name)
                ),
                None => String::new(),
            };
            format!(
                "(Array.from({}.querySelectorAll({})){})[{}] || null",
                scope,
                js_string(&selectors.join(", ")),
                name_filter,
                nth.unwrap_or(0)
            )
        }
    }
}

/// Tags carrying an implicit ARIA role, for role-based lookup
fn implicit_role_tags(role: &str) -> Option<&'static str> {
    match role {
        "button" => Some("button, input[type=button], input[type=submit]"),
        "link" => Some("a[href]"),
        "textbox" => Some("input:not([type]), input[type=text], input[type=email], input[type=search], textarea"),
        "checkbox" => Some("input[type=checkbox]"),
        "radio" => Some("input[type=radio]"),
        "combobox" => Some("select"),
        "heading" => Some("h1, h2, h3, h4, h5, h6"),
        "img" => Some("img"),
        "list" => Some("ul, ol"),
        "listitem" => Some("li"),
        _ => None,
    }
}

/// Embed a string as a JS literal
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn mouse_button_name(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "left",
        MouseButton::Middle => "middle",
        MouseButton::Right => "right",
    }
}

/// CDP modifier bitmask: Alt=1, Ctrl=2, Meta=4, Shift=8
fn modifier_mask(modifiers: &[Modifier]) -> u32 {
    modifiers.iter().fold(0, |mask, modifier| {
        mask | match modifier {
            Modifier::Alt => 1,
            Modifier::Control => 2,
            Modifier::Meta => 4,
            Modifier::Shift => 8,
        }
    })
}
