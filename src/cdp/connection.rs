//! CDP WebSocket connection
//!
//! One WebSocket connection to a CDP target (browser or page). Commands are
//! correlated to responses by id; notifications are fanned out to event
//! subscribers. A read task owns the receiving half of the stream; the
//! sending half sits behind a mutex so commands never contend with reads.

use super::types::{CdpEvent, CdpNotification, CdpRequest, CdpRpcResponse};
use crate::Error;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Default timeout for a single CDP command
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    sender: oneshot::Sender<CdpRpcResponse>,
    /// Command method, for logging
    method: String,
}

/// CDP WebSocket connection
pub struct CdpConnection {
    /// WebSocket URL this connection is attached to
    url: String,
    writer: Mutex<WsSink>,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, PendingCommand>>>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
    is_active: Arc<AtomicBool>,
    disconnect_tx: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for CdpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpConnection")
            .field("url", &self.url)
            .field("is_active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl CdpConnection {
    /// Connect to a CDP WebSocket URL within the given timeout
    pub async fn connect(url: &str, timeout: Duration) -> Result<Arc<Self>, Error> {
        info!("Connecting to CDP WebSocket: {}", url);

        let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| Error::timeout(format!("Handshake with {} timed out", url)))?
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;

        let (writer, reader) = ws_stream.split();
        let (disconnect_tx, _) = watch::channel(false);

        let connection = Arc::new(Self {
            url: url.to_string(),
            writer: Mutex::new(writer),
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            disconnect_tx: Arc::new(disconnect_tx),
        });

        tokio::spawn(Self::read_loop(
            reader,
            Arc::clone(&connection.pending),
            Arc::clone(&connection.subscribers),
            Arc::clone(&connection.is_active),
            Arc::clone(&connection.disconnect_tx),
            connection.url.clone(),
        ));

        Ok(connection)
    }

    /// Receiving loop; runs until the stream closes or errors
    async fn read_loop(
        mut reader: WsSource,
        pending: Arc<Mutex<HashMap<u64, PendingCommand>>>,
        subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
        is_active: Arc<AtomicBool>,
        disconnect_tx: Arc<watch::Sender<bool>>,
        url: String,
    ) {
        while let Some(message) = reader.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    Self::dispatch_message(&text, &pending, &subscribers).await;
                }
                Ok(Message::Close(_)) => {
                    info!("CDP close frame received from {}", url);
                    break;
                }
                Ok(_) => {
                    // Ping/pong are handled by tungstenite; ignore binary frames
                }
                Err(e) => {
                    warn!("CDP read error on {}: {}", url, e);
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);
        let _ = disconnect_tx.send(true);

        // Fail any commands still waiting; dropping the sender closes the
        // paired receiver with an error.
        pending.lock().await.clear();
        subscribers.lock().await.clear();

        debug!("CDP read loop for {} exited", url);
    }

    /// Route an incoming frame to the pending command map or the subscribers
    async fn dispatch_message(
        text: &str,
        pending: &Arc<Mutex<HashMap<u64, PendingCommand>>>,
        subscribers: &Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
    ) {
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            let mut pending = pending.lock().await;
            if let Some(cmd) = pending.remove(&response.id) {
                debug!("Response for command {} ({})", response.id, cmd.method);
                let _ = cmd.sender.send(response);
            } else {
                warn!("Response for unknown command id {}", response.id);
            }
            return;
        }

        if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            let event = CdpEvent {
                method: notification.method,
                params: notification.params,
            };
            let mut subscribers = subscribers.lock().await;
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
            return;
        }

        warn!("Unknown CDP message format: {}", text);
    }

    /// Send a CDP command and wait for its response
    pub async fn send_command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        self.send_command_with_timeout(method, params, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Send a CDP command with an explicit timeout
    pub async fn send_command_with_timeout(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
            session_id: None,
        };
        let json = serde_json::to_string(&request)?;

        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                id,
                PendingCommand {
                    sender,
                    method: method.to_string(),
                },
            );
        }

        debug!("Sending CDP command {} {}", id, method);
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(Message::Text(json)).await {
                self.pending.lock().await.remove(&id);
                return Err(Error::websocket(format!("Failed to send {}: {}", method, e)));
            }
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = response.error {
                    return Err(Error::cdp(format!(
                        "{} failed: {} (code {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response.result)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed while waiting for {}",
                method
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::timeout(format!("Command {} timed out", method)))
            }
        }
    }

    /// Subscribe to CDP notifications from this connection
    pub async fn subscribe_events(&self) -> mpsc::UnboundedReceiver<CdpEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().await.push(tx);
        rx
    }

    /// Signal that flips to `true` when the read loop exits
    pub fn disconnect_signal(&self) -> watch::Receiver<bool> {
        self.disconnect_tx.subscribe()
    }

    /// WebSocket URL this connection is attached to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Close the connection
    pub async fn close(&self) -> Result<(), Error> {
        info!("Closing CDP connection to {}", self.url);
        self.is_active.store(false, Ordering::SeqCst);

        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;
        Ok(())
    }

    /// Check if the connection is active
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
