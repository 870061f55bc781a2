use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::cmd::EchoArgs;
use crate::exit::{io_error, CliResult, SUCCESS};

/// WebSocket echo server: every text and binary message is sent straight
/// back on the connection it arrived on. Useful as a local backend for
/// exercising `send --wait` and `watch`.
pub async fn run(args: EchoArgs) -> CliResult<i32> {
    let listener = TcpListener::bind(&args.bind)
        .await
        .map_err(|err| io_error("bind failed", err))?;
    let local = listener
        .local_addr()
        .map_err(|err| io_error("bind failed", err))?;
    info!(addr = %local, "echo server listening");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted.map_err(|err| io_error("accept failed", err))?;
                info!(peer = %peer, "connection accepted");
                tokio::spawn(async move {
                    if let Err(err) = echo_connection(stream).await {
                        warn!(peer = %peer, error = %err, "connection ended with error");
                    }
                });
            }
        }
    }

    Ok(SUCCESS)
}

async fn echo_connection(stream: TcpStream) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let mut ws = accept_async(stream).await?;

    while let Some(message) = ws.next().await {
        match message? {
            message @ (Message::Text(_) | Message::Binary(_)) => {
                ws.send(message).await?;
            }
            Message::Close(_) => break,
            // Ping/pong is answered by the protocol layer.
            _ => {}
        }
    }

    Ok(())
}
