//! Websocket connector speaking Socket.IO to the planning service

use super::packet::{EnginePacket, OpenPayload, PacketError, SocketPacket};
use crate::runtime::{Connector, Link, LinkEvent, TransportError};
use crate::session::{event::names, Push};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Path the service mounts Socket.IO under
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Map an `http(s)://` endpoint to its websocket transport URL.
pub fn websocket_url(endpoint: &str) -> Result<String, TransportError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let (scheme, rest) = endpoint
        .split_once("://")
        .ok_or_else(|| TransportError::InvalidEndpoint(endpoint.to_string()))?;
    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(TransportError::InvalidEndpoint(endpoint.to_string())),
    };
    if rest.is_empty() {
        return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(format!("{scheme}://{rest}{SOCKET_IO_PATH}?EIO=4&transport=websocket"))
}

/// Websocket-only Socket.IO client
#[derive(Debug, Clone, Default)]
pub struct SocketIoConnector;

impl SocketIoConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for SocketIoConnector {
    async fn connect(&self, endpoint: &str) -> Result<Link, TransportError> {
        let url = websocket_url(endpoint)?;
        tracing::debug!(url = %url, "Opening websocket");
        let (mut ws, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;

        let open = loop {
            match next_packet(&mut ws).await? {
                EnginePacket::Open(open) => break open,
                EnginePacket::Noop => {}
                other => return Err(PacketError::Unexpected(other.encode()).into()),
            }
        };
        tracing::debug!(sid = %open.sid, ping_interval = open.ping_interval, "Engine.IO session opened");

        ws.send(Message::Text(SocketPacket::Connect { sid: None }.into_frame()))
            .await?;
        loop {
            match next_packet(&mut ws).await? {
                EnginePacket::Ping => ws.send(Message::Text(EnginePacket::Pong.encode())).await?,
                EnginePacket::Message(body) => match SocketPacket::decode(&body)? {
                    SocketPacket::Connect { .. } => break,
                    SocketPacket::ConnectError { message } => return Err(TransportError::Rejected(message)),
                    SocketPacket::Disconnect => {
                        return Err(TransportError::Rejected("io server disconnect".to_string()));
                    }
                    other => tracing::debug!(packet = ?other, "Ignoring packet before namespace connect"),
                },
                EnginePacket::Close => return Err(TransportError::Closed),
                _ => {}
            }
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(32);
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let shutdown = CancellationToken::new();
        tokio::spawn(pump(ws, ping_window(&open), outbound_rx, inbound_tx, shutdown.clone()));

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
            shutdown,
        })
    }
}

/// Longest silence between server pings before the link is presumed dead
fn ping_window(open: &OpenPayload) -> Duration {
    Duration::from_millis(open.ping_interval.saturating_add(open.ping_timeout))
}

/// Read until the next Engine.IO text packet
async fn next_packet(ws: &mut WsStream) -> Result<EnginePacket, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(EnginePacket::decode(&text)?),
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

fn into_push(packet: SocketPacket) -> Option<Push> {
    match packet {
        SocketPacket::Event { name, args } => match Push::decode(&name, args.first()) {
            Ok(push) => Some(push),
            Err(e) => {
                tracing::warn!(event = %name, error = %e, "Malformed push payload");
                None
            }
        },
        other => {
            tracing::debug!(packet = ?other, "Ignoring socket.io packet");
            None
        }
    }
}

/// Shuttle frames between the websocket and the link channels until the
/// transport ends, then report why.
async fn pump(
    mut ws: WsStream,
    ping_window: Duration,
    mut outbound: mpsc::Receiver<String>,
    inbound: mpsc::Sender<LinkEvent>,
    shutdown: CancellationToken,
) {
    let deadline = tokio::time::sleep(ping_window);
    tokio::pin!(deadline);

    let (reason, reconnect) = loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                let _ = ws.close(None).await;
                return;
            }

            () = &mut deadline => break ("ping timeout", true),

            text = outbound.recv() => {
                let Some(text) = text else {
                    let _ = ws.close(None).await;
                    return;
                };
                let frame = SocketPacket::event(names::MESSAGE, Value::String(text)).into_frame();
                if let Err(e) = ws.send(Message::Text(frame)).await {
                    tracing::warn!(error = %e, "Failed to send message");
                    break ("transport error", true);
                }
            }

            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => match EnginePacket::decode(&text) {
                    Ok(EnginePacket::Ping) => {
                        deadline.as_mut().reset(Instant::now() + ping_window);
                        if let Err(e) = ws.send(Message::Text(EnginePacket::Pong.encode())).await {
                            tracing::warn!(error = %e, "Failed to answer ping");
                            break ("transport error", true);
                        }
                    }
                    Ok(EnginePacket::Message(body)) => match SocketPacket::decode(&body) {
                        Ok(SocketPacket::Disconnect) => break ("io server disconnect", false),
                        Ok(packet) => {
                            if let Some(push) = into_push(packet) {
                                if inbound.send(LinkEvent::Push(push)).await.is_err() {
                                    let _ = ws.close(None).await;
                                    return;
                                }
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Undecodable socket.io packet"),
                    },
                    Ok(EnginePacket::Close) => break ("transport close", true),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Undecodable engine.io packet"),
                },
                Some(Ok(Message::Close(_))) | None => break ("transport close", true),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Websocket error");
                    break ("transport error", true);
                }
            },
        }
    };

    if shutdown.is_cancelled() {
        return;
    }
    let _ = ws.close(None).await;
    let _ = inbound
        .send(LinkEvent::Closed {
            reason: reason.to_string(),
            reconnect,
        })
        .await;
}
