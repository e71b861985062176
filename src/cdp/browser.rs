//! CDP browser handle and connector
//!
//! Browser-level operations over one live transport connection: target
//! listing via the debug HTTP API, per-target page attachment, and the
//! connector used by the connection manager to discover and dial an
//! endpoint.

use super::connection::CdpConnection;
use super::page::CdpPageDriver;
use crate::connection::endpoint::{http_base_url, ws_page_url};
use crate::driver::traits::{BrowserHandle, Connector, PageDriver, TargetInfo};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};
use url::Url;

/// CDP browser handle
#[derive(Debug)]
pub struct CdpBrowserHandle {
    /// Browser-level transport address (ws:// or wss://)
    transport_url: String,
    /// HTTP base for the debug REST API
    http_base: String,
    /// Credentials carried by the transport URL, forwarded to the REST API
    credentials: Option<(String, String)>,
    /// Browser-level CDP connection
    connection: Arc<CdpConnection>,
    /// Attached page drivers (target id -> driver)
    pages: Mutex<HashMap<String, Arc<CdpPageDriver>>>,
}

impl CdpBrowserHandle {
    /// Wrap an established browser-level connection
    pub fn new(transport_url: &str, connection: Arc<CdpConnection>) -> Result<Self, Error> {
        let parsed = Url::parse(transport_url)?;
        let credentials = if parsed.username().is_empty() {
            None
        } else {
            Some((
                parsed.username().to_string(),
                parsed.password().unwrap_or("").to_string(),
            ))
        };

        Ok(Self {
            transport_url: transport_url.to_string(),
            http_base: http_base_url(transport_url)?,
            credentials,
            connection,
            pages: Mutex::new(HashMap::new()),
        })
    }

    fn http_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))
    }

    async fn fetch_json(&self, path: &str) -> Result<serde_json::Value, Error> {
        let url = format!("{}{}", self.http_base, path);
        debug!("Fetching {}", url);

        let mut request = self.http_client()?.get(&url);
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::connection(format!("Request to {} failed: {}", url, e)))?;
        response
            .json()
            .await
            .map_err(|e| Error::cdp(format!("Failed to parse response from {}: {}", url, e)))
    }
}

#[async_trait]
impl BrowserHandle for CdpBrowserHandle {
    fn transport_url(&self) -> &str {
        &self.transport_url
    }

    async fn targets(&self) -> Result<Vec<TargetInfo>, Error> {
        let targets_json = self.fetch_json("/json").await?;
        let entries = targets_json
            .as_array()
            .ok_or_else(|| Error::cdp("Unexpected /json response shape"))?;

        let mut targets = Vec::new();
        for entry in entries {
            let Some(target_id) = entry.get("id").and_then(|v| v.as_str()) else {
                continue;
            };
            targets.push(TargetInfo {
                target_id: target_id.to_string(),
                kind: entry
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                title: entry
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                url: entry
                    .get("url")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                attached: entry
                    .get("attached")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            });
        }
        Ok(targets)
    }

    async fn page_for_target(&self, target_id: &str) -> Result<Arc<dyn PageDriver>, Error> {
        {
            let pages = self.pages.lock().await;
            if let Some(page) = pages.get(target_id) {
                if page.is_active() {
                    return Ok(Arc::clone(page) as Arc<dyn PageDriver>);
                }
            }
        }

        let page_url = ws_page_url(&self.transport_url, target_id)?;
        info!("Attaching to target {} via {}", target_id, page_url);
        let connection = CdpConnection::connect(&page_url, Duration::from_secs(10)).await?;
        let page = Arc::new(CdpPageDriver::new(target_id, connection));

        let mut pages = self.pages.lock().await;
        pages.insert(target_id.to_string(), Arc::clone(&page));
        Ok(page as Arc<dyn PageDriver>)
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageDriver>>, Error> {
        let targets = self.targets().await?;
        let mut pages = Vec::new();
        for target in targets.into_iter().filter(|t| t.kind == "page") {
            pages.push(self.page_for_target(&target.target_id).await?);
        }
        Ok(pages)
    }

    fn disconnect_signal(&self) -> watch::Receiver<bool> {
        self.connection.disconnect_signal()
    }

    async fn close(&self) -> Result<(), Error> {
        info!("Closing browser handle for {}", self.transport_url);

        let pages: Vec<Arc<CdpPageDriver>> = {
            let mut guard = self.pages.lock().await;
            guard.drain().map(|(_, page)| page).collect()
        };
        for page in pages {
            if page.is_active() {
                let _ = page.close().await;
            }
        }

        self.connection.close().await
    }

    fn is_active(&self) -> bool {
        self.connection.is_active()
    }
}

/// Connector dialing CDP debug endpoints
#[derive(Debug, Default)]
pub struct CdpConnector;

impl CdpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for CdpConnector {
    async fn discover(&self, endpoint: &str, timeout: Duration) -> Result<String, Error> {
        let http_base = http_base_url(endpoint)?;
        let parsed = Url::parse(endpoint)?;
        let url = format!("{}/json/version", http_base);
        debug!("Discovering browser transport address via {}", url);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        let mut request = client.get(&url);
        if !parsed.username().is_empty() {
            request = request.basic_auth(parsed.username(), parsed.password());
        }

        let version: serde_json::Value = request
            .send()
            .await
            .map_err(|e| Error::connection(format!("Discovery at {} failed: {}", url, e)))?
            .json()
            .await
            .map_err(|e| Error::cdp(format!("Failed to parse version response: {}", e)))?;

        version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::cdp("No webSocketDebuggerUrl in version response"))
    }

    async fn connect(
        &self,
        transport_url: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn BrowserHandle>, Error> {
        let connection = CdpConnection::connect(transport_url, timeout).await?;
        let handle = CdpBrowserHandle::new(transport_url, connection)?;
        Ok(Arc::new(handle) as Arc<dyn BrowserHandle>)
    }
}
