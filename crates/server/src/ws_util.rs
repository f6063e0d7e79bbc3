//! WebSocket keep-alive plumbing shared by the event stream endpoints.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, MissedTickBehavior, interval};

/// Ping/pong cadence for a WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsKeepAlive {
    /// Interval between server-initiated ping frames.
    pub ping_interval: Duration,
    /// Maximum silence before the connection is considered dead.
    pub pong_timeout: Duration,
}

impl Default for WsKeepAlive {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(90),
        }
    }
}

/// Forward `data_stream` to the socket while running ping/pong keep-alive.
///
/// Returns when the stream ends, the client disconnects or closes, or the
/// pong timeout is exceeded. Text/binary frames from the client are
/// ignored; the protocol is server-push only.
pub async fn run_ws_stream<S, E>(
    socket: WebSocket,
    mut data_stream: S,
    keep_alive: WsKeepAlive,
) -> anyhow::Result<()>
where
    S: futures_util::Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display + Send + Sync + 'static,
{
    let (mut sender, mut receiver) = socket.split();

    let mut ping_interval = interval(keep_alive.ping_interval);
    ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            item = data_stream.next() => {
                match item {
                    Some(Ok(msg)) => {
                        if sender.send(msg).await.is_err() {
                            tracing::debug!("client disconnected during send");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!("stream error: {}", e);
                        break;
                    }
                    None => {
                        tracing::debug!("data stream ended");
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::debug!("client sent close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(?e, "websocket receive error");
                        break;
                    }
                    None => {
                        tracing::debug!("websocket stream ended");
                        break;
                    }
                    _ => {}
                }
            }

            _ = ping_interval.tick() => {
                if last_pong.elapsed() > keep_alive.pong_timeout {
                    tracing::warn!(
                        elapsed_secs = last_pong.elapsed().as_secs(),
                        "WebSocket pong timeout, closing connection"
                    );
                    break;
                }

                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    tracing::debug!("failed to send ping, client disconnected");
                    break;
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;

    Ok(())
}
