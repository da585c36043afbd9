//! WebSocket transport behind a trait so the driver can run against fakes.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::ChannelError;

/// Opens connections to the realtime endpoint.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug + 'static {
    /// Open a connection authenticated with `token`.
    async fn connect(&self, url: &str, token: &str) -> Result<Box<dyn Connection>, ChannelError>;
}

/// One open text-frame connection.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Write one text message.
    async fn send(&mut self, text: String) -> Result<(), ChannelError>;

    /// Next text message; `None` once the peer has closed. Cancel-safe.
    async fn recv(&mut self) -> Option<Result<String, ChannelError>>;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Characters left as is in the token query value (URI component rules).
const TOKEN_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Append `token=<urlencoded>` to the endpoint URL.
pub fn url_with_token(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{url}{separator}token={}",
        utf8_percent_encode(token, TOKEN_ENCODE_SET)
    )
}

/// tokio-tungstenite transport.
///
/// The token travels both as a query parameter and an `Authorization`
/// header; the service's handshake interceptor accepts either.
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    /// Creates the transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str, token: &str) -> Result<Box<dyn Connection>, ChannelError> {
        let target = url_with_token(url, token);
        let mut request = target
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::Transport(format!("Invalid realtime URL '{url}': {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ChannelError::Transport(format!("Invalid token header: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        debug!(url = %url, status = %response.status(), "WebSocket opened");

        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(WsMessage::text(text))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(WsMessage::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Ok(WsMessage::Close(_)) => return None,
                // Ping/Pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
