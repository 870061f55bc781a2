use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use socklink_wire::WireFrame;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Transport, WireSink, WireStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport built on `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<(Box<dyn WireSink>, Box<dyn WireStream>)> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|err| TransportError::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        debug!(url, status = %response.status(), "websocket connected");

        let (sink, stream) = stream.split();
        Ok((
            Box::new(WebSocketSink { inner: sink }),
            Box::new(WebSocketReader { inner: stream }),
        ))
    }
}

struct WebSocketSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl WireSink for WebSocketSink {
    async fn send(&mut self, frame: WireFrame) -> Result<()> {
        let message = match frame {
            WireFrame::Text(text) => Message::Text(text.into()),
            WireFrame::Binary(bytes) => Message::Binary(bytes),
        };
        self.inner.send(message).await.map_err(Into::into)
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.send(Message::Close(None)).await.map_err(Into::into)
    }
}

struct WebSocketReader {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl WireStream for WebSocketReader {
    async fn next_frame(&mut self) -> Option<Result<WireFrame>> {
        loop {
            return match self.inner.next().await? {
                Ok(Message::Text(text)) => Some(Ok(WireFrame::Text(text.to_string()))),
                Ok(Message::Binary(bytes)) => Some(Ok(WireFrame::Binary(bytes))),
                Ok(Message::Close(_)) => None,
                // Ping/pong is handled by the protocol layer.
                Ok(_) => continue,
                Err(err) => Some(Err(err.into())),
            };
        }
    }
}
