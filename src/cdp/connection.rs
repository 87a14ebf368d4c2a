//! CDP WebSocket connection
//!
//! One connection per page target. Commands are matched to their responses
//! by id; protocol events are not consumed by this crate and are dropped by
//! the read loop.

use super::traits::{CdpConnection, CdpError, CdpResponse};
use super::types::{CdpRequest, CdpRpcResponse};
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Waiters = Arc<Mutex<HashMap<u64, Waiter>>>;

/// Upper bounds for a single command round trip
#[derive(Debug, Clone, Copy)]
struct CommandBudgets {
    default: Duration,
    screenshot: Duration,
    /// `Page.navigate` and `Page.reload` only acknowledge the request; the
    /// load itself is awaited by the client
    navigation: Duration,
}

impl Default for CommandBudgets {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(30),
            screenshot: Duration::from_secs(90),
            navigation: Duration::from_secs(60),
        }
    }
}

impl CommandBudgets {
    fn for_method(&self, method: &str) -> Duration {
        match method {
            "Page.captureScreenshot" => self.screenshot,
            "Page.navigate" | "Page.reload" => self.navigation,
            _ => self.default,
        }
    }
}

#[derive(Debug)]
struct Waiter {
    sender: oneshot::Sender<CdpResponse>,
    method: String,
}

/// WebSocket connection to one DevTools target
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    url: String,
    sink: Mutex<SplitSink<WsStream, Message>>,
    next_id: AtomicU64,
    waiters: Waiters,
    is_active: Arc<AtomicBool>,
    budgets: CommandBudgets,
}

impl CdpWebSocketConnection {
    /// Connect to a target's debugger URL, e.g. `ws://127.0.0.1:9222/devtools/page/<id>`
    pub async fn connect<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Connecting to CDP target: {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;
        let (sink, stream) = ws_stream.split();

        let connection = Arc::new(Self {
            url,
            sink: Mutex::new(sink),
            next_id: AtomicU64::new(1),
            waiters: Arc::new(Mutex::new(HashMap::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            budgets: CommandBudgets::default(),
        });

        tokio::spawn(Self::read_loop(
            stream,
            Arc::clone(&connection.waiters),
            Arc::clone(&connection.is_active),
        ));

        Ok(connection)
    }

    async fn read_loop(mut stream: SplitStream<WsStream>, waiters: Waiters, is_active: Arc<AtomicBool>) {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => Self::route(&text, &waiters).await,
                Ok(Message::Close(_)) => {
                    info!("Target closed the debugger connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket read error, deactivating connection: {}", e);
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);
        // Dropping the senders fails every outstanding command
        waiters.lock().await.clear();
        debug!("CDP read loop exited");
    }

    /// Hand a response to its waiter; anything without an id is an event
    async fn route(text: &str, waiters: &Waiters) {
        let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) else {
            trace!("Ignoring CDP message: {}", text);
            return;
        };

        match waiters.lock().await.remove(&response.id) {
            Some(waiter) => {
                debug!("Response for command {} ({})", response.id, waiter.method);
                let _ = waiter.sender.send(CdpResponse {
                    id: response.id,
                    result: Some(response.result),
                    error: response.error.map(|e| CdpError {
                        code: e.code,
                        message: e.message,
                        data: e.data,
                    }),
                });
            }
            None => warn!("Response for unknown command id {}", response.id),
        }
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: (!params.is_null()).then_some(params),
        };
        let json = serde_json::to_string(&request)?;

        let (sender, receiver) = oneshot::channel();
        self.waiters.lock().await.insert(
            id,
            Waiter {
                sender,
                method: method.to_string(),
            },
        );

        debug!("Sending CDP command {}: {}", id, method);
        if let Err(e) = self.sink.lock().await.send(Message::Text(json)).await {
            self.waiters.lock().await.remove(&id);
            return Err(Error::websocket(format!("Failed to send {}: {}", method, e)));
        }

        let budget = self.budgets.for_method(method);
        let response = match tokio::time::timeout(budget, receiver).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(Error::websocket(format!(
                    "Connection closed while waiting for {} ({})",
                    method, id
                )))
            }
            Err(_) => {
                self.waiters.lock().await.remove(&id);
                return Err(Error::timeout(format!("CDP command {} timed out after {:?}", method, budget)));
            }
        };

        match &response.error {
            Some(error) => Err(Error::cdp(format!("{}: {} (code: {})", method, error.message, error.code))),
            None => Ok(response),
        }
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing CDP connection to {}", self.url);

        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
