use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use tracing::{debug, info, trace, warn};
use vigil_core::config::{FeedConfig, SessionConfig};
use vigil_core::transport::error::TransportError;
use vigil_core::transport::port::{Inbound, RawMessage, SocketReceiver, Transport};

/// # Summary
/// Socket-style transport over a WebSocket connection.
///
/// # Invariants
/// - Every text or binary message is one single-frame `RawMessage`.
/// - Each `open` performs a fresh handshake; nothing is shared between periods.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
    credentials: Option<(String, String)>,
    connect_timeout: Duration,
}

impl WsTransport {
    /// # Summary
    /// Builds the endpoint from the session and feed settings.
    ///
    /// # Logic
    /// 1. The URL is `ws://{host}:{port}{path}`.
    /// 2. A username enables HTTP basic authentication during the handshake.
    pub fn new(session: &SessionConfig, feed: &FeedConfig) -> Self {
        let path = if feed.path.starts_with('/') {
            feed.path.clone()
        } else {
            format!("/{}", feed.path)
        };
        let credentials = session
            .username
            .as_ref()
            .map(|user| (user.clone(), session.password.clone().unwrap_or_default()));
        Self {
            url: format!("ws://{}:{}{}", session.host, session.port, path),
            credentials,
            connect_timeout: Duration::from_millis(feed.connect_timeout_ms),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn name(&self) -> String {
        self.url.clone()
    }

    /// # Summary
    /// Connects and completes the WebSocket handshake.
    ///
    /// # Returns
    /// `Authentication` when the server answers 401/403, `Timeout` when the handshake
    /// exceeds the connect timeout, `Connection` otherwise.
    async fn open(&self) -> Result<Inbound, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        if let Some((user, password)) = &self.credentials {
            let token = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
            let value = HeaderValue::from_str(&format!("Basic {}", token))
                .map_err(|e| TransportError::Authentication(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        info!("Connecting to {}", self.url);
        let (stream, _) = match tokio::time::timeout(self.connect_timeout, connect_async(request)).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => return Err(map_connect_error(e)),
            Err(_) => return Err(TransportError::Timeout(format!("connecting to {}", self.url))),
        };
        info!("Connected to {}", self.url);

        Ok(Inbound::Socket(Box::new(WsReceiver { stream })))
    }
}

fn map_connect_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
            TransportError::Authentication(format!("handshake rejected with {}", response.status()))
        }
        other => TransportError::Connection(other.to_string()),
    }
}

struct WsReceiver {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SocketReceiver for WsReceiver {
    async fn try_receive(&mut self, timeout: Duration) -> Result<Option<RawMessage>, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let next = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            };
            match next {
                Some(Ok(Message::Text(text))) => return Ok(Some(RawMessage::single(text.as_bytes()))),
                Some(Ok(Message::Binary(data))) => return Ok(Some(RawMessage::single(data.to_vec()))),
                Some(Ok(Message::Close(frame))) => {
                    warn!("WebSocket closed by peer: {:?}", frame);
                    return Err(TransportError::Connection("closed by peer".to_string()));
                }
                Some(Ok(other)) => trace!("Skipping control message: {:?}", other),
                Some(Err(e)) => {
                    debug!("WebSocket read failed: {}", e);
                    return Err(match e {
                        tungstenite::Error::Protocol(p) => TransportError::Protocol(p.to_string()),
                        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                            TransportError::Closed
                        }
                        other => TransportError::Connection(other.to_string()),
                    });
                }
                None => return Err(TransportError::Closed),
            }
        }
    }
}
