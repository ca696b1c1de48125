//! Socket.IO client transport
//!
//! Websocket only, default namespace only. Speaks Engine.IO v4 framing.

mod connector;
mod packet;

pub use connector::{websocket_url, SocketIoConnector, SOCKET_IO_PATH};
pub use packet::{EnginePacket, OpenPayload, PacketError, SocketPacket};
