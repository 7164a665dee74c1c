//! WebSocket transport implementation for A2A protocol
//!
//! A single connection carries every exchange. Frames coming back from the
//! agent are routed to the waiting caller by the JSON-RPC id of the request.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex as StdMutex},
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream, Stream, StreamExt},
    SinkExt,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::{
    protocol::error::{A2AError, A2AResult},
    transport::{FrameStream, Transport, TransportRequest, TransportResponse},
};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where frames carrying a given request id go
enum Route {
    /// Exactly one response expected
    Unary(oneshot::Sender<String>),

    /// Frames are forwarded until the receiver is dropped
    Stream(mpsc::UnboundedSender<String>),
}

type Routes = Arc<StdMutex<HashMap<String, Route>>>;

fn lock_routes(routes: &Routes) -> std::sync::MutexGuard<'_, HashMap<String, Route>> {
    routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Key used to route frames: the envelope id rendered as a string
fn route_key(envelope: &Value) -> Option<String> {
    match envelope.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// WebSocket connection state
struct WebSocketConnection {
    /// Outgoing message sink
    sink: Mutex<WsSink>,

    /// Callers waiting for frames, keyed by request id
    routes: Routes,
}

impl WebSocketConnection {
    async fn connect(url: &Url) -> Result<(Self, WsSource), A2AError> {
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| A2AError::Transport(format!("WebSocket connection failed: {}", e)))?;

        let (sink, source) = ws_stream.split();

        let connection = Self {
            sink: Mutex::new(sink),
            routes: Arc::new(StdMutex::new(HashMap::new())),
        };

        Ok((connection, source))
    }

    async fn send_text(&self, text: String) -> Result<(), A2AError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| A2AError::Transport(format!("WebSocket send failed: {}", e)))
    }

    fn register(&self, key: String, route: Route) {
        lock_routes(&self.routes).insert(key, route);
    }

    fn unregister(&self, key: &str) {
        lock_routes(&self.routes).remove(key);
    }

    /// Deliver an inbound frame to whoever waits for its id
    fn dispatch(routes: &Routes, text: String) {
        let Some(key) = serde_json::from_str::<Value>(&text)
            .ok()
            .as_ref()
            .and_then(route_key)
        else {
            tracing::warn!("Dropping WebSocket frame without a usable id");
            return;
        };

        let mut routes = lock_routes(routes);
        match routes.remove(&key) {
            Some(Route::Unary(tx)) => {
                let _ = tx.send(text);
            }
            Some(Route::Stream(tx)) => {
                // A failed send means the subscriber is gone
                if tx.send(text).is_ok() {
                    routes.insert(key, Route::Stream(tx));
                }
            }
            None => tracing::debug!(request_id = %key, "Dropping WebSocket frame for unknown request"),
        }
    }
}

/// Frames routed to one streaming exchange
///
/// Dropping it unregisters the route.
struct RoutedFrames {
    inner: UnboundedReceiverStream<String>,
    key: String,
    routes: Routes,
}

impl Stream for RoutedFrames {
    type Item = A2AResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for RoutedFrames {
    fn drop(&mut self) {
        lock_routes(&self.routes).remove(&self.key);
    }
}

/// WebSocket transport for A2A protocol
///
/// This transport keeps one persistent connection, reconnecting lazily after
/// it drops. Concurrent unary and streaming exchanges share the connection.
#[derive(Clone)]
pub struct WebSocketTransport {
    url: Url,
    connection: Arc<Mutex<Option<Arc<WebSocketConnection>>>>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport
    ///
    /// # Arguments
    ///
    /// * `url` - The WebSocket URL (e.g., "ws://agent.example.com")
    pub fn new(url: Url) -> Self {
        Self {
            url,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Get or establish a WebSocket connection
    async fn get_connection(&self) -> Result<Arc<WebSocketConnection>, A2AError> {
        let mut slot = self.connection.lock().await;

        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }

        let (connection, source) = WebSocketConnection::connect(&self.url).await?;
        let connection = Arc::new(connection);
        *slot = Some(connection.clone());

        tokio::spawn(Self::read_loop(
            source,
            connection.routes.clone(),
            self.connection.clone(),
            Arc::downgrade(&connection),
        ));

        Ok(connection)
    }

    /// Route inbound frames until the connection closes
    ///
    /// On exit every waiting caller is released and the slot is cleared so the
    /// next request reconnects.
    async fn read_loop(
        mut source: WsSource,
        routes: Routes,
        slot: Arc<Mutex<Option<Arc<WebSocketConnection>>>>,
        this: std::sync::Weak<WebSocketConnection>,
    ) {
        while let Some(result) = source.next().await {
            match result {
                Ok(Message::Text(text)) => WebSocketConnection::dispatch(&routes, text),
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::error!("WebSocket receive error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        lock_routes(&routes).clear();

        let mut slot = slot.lock().await;
        let same = match (slot.as_ref(), this.upgrade()) {
            (Some(current), Some(this)) => Arc::ptr_eq(current, &this),
            _ => false,
        };
        if same {
            *slot = None;
        }
        tracing::debug!("WebSocket connection closed");
    }

    fn request_key(request: &TransportRequest) -> A2AResult<(String, String)> {
        let text = String::from_utf8(request.body.to_vec())
            .map_err(|e| A2AError::Validation(format!("Request body is not UTF-8: {}", e)))?;
        let envelope: Value = serde_json::from_str(&text)?;
        let key = route_key(&envelope)
            .ok_or_else(|| A2AError::Validation("Request envelope has no id".to_string()))?;
        Ok((key, text))
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("url", &self.url)
            .finish()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        // WebSocket is always ready (buffered)
        Poll::Ready(Ok(()))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        let (key, text) = Self::request_key(&request)?;
        let connection = self.get_connection().await?;

        let (tx, rx) = oneshot::channel();
        connection.register(key.clone(), Route::Unary(tx));

        if let Err(e) = connection.send_text(text).await {
            connection.unregister(&key);
            return Err(e);
        }

        let timeout = request.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let frame = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(_)) => {
                return Err(A2AError::Transport(
                    "WebSocket closed before a response arrived".to_string(),
                ))
            }
            Err(_) => {
                connection.unregister(&key);
                return Err(A2AError::Timeout);
            }
        };

        Ok(TransportResponse::new(200).body(frame.into()))
    }

    async fn execute_streaming(&self, request: TransportRequest) -> A2AResult<FrameStream> {
        let (key, text) = Self::request_key(&request)?;
        let connection = self.get_connection().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        connection.register(key.clone(), Route::Stream(tx));

        let frames = RoutedFrames {
            inner: UnboundedReceiverStream::new(rx),
            key,
            routes: connection.routes.clone(),
        };

        connection.send_text(text).await?;
        Ok(Box::pin(frames))
    }

    fn base_url(&self) -> &Url {
        &self.url
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}
