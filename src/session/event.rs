//! Events that drive the session

use crate::calendar::CalendarEvent;
use serde::Deserialize;
use serde_json::Value;

/// Inbound event names used by the remote service
pub mod names {
    pub const AGENT_CREATED: &str = "create_specialized_agent";
    pub const AGENT_RESPONSE: &str = "specialized_agent_response";
    pub const CALENDAR_EVENT: &str = "calendar_event";
    /// Bob's own streamed text
    pub const ORCHESTRATOR_CHUNK: &str = "calendar";
    /// Outbound user input
    pub const MESSAGE: &str = "message";
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User operations
    Connect,
    Disconnect,
    SubmitMessage {
        text: String,
    },
    ClearAccumulated,

    // Transport outcomes, tagged with the generation that produced them
    HandshakeSucceeded {
        generation: u64,
    },
    HandshakeFailed {
        generation: u64,
        message: String,
    },
    TransportDropped {
        generation: u64,
        reason: String,
        /// False when the server closed the session on purpose
        reconnect: bool,
    },
    RetryTimeout {
        generation: u64,
    },
    /// The live link refused an outbound message
    SendFailed {
        generation: u64,
        message: String,
    },
    Push {
        generation: u64,
        push: Push,
    },
}

/// A notification pushed by the remote service
#[derive(Debug, Clone, PartialEq)]
pub enum Push {
    AgentCreated { name: String },
    AgentChunk { name: String, chunk: String },
    CalendarEvent(CalendarEvent),
    OrchestratorChunk { chunk: String },
    /// Any event name this client does not handle
    Unknown { event: String },
}

/// Agent creation accepts either a bare name or `{ "name": ... }`
#[derive(Deserialize)]
#[serde(untagged)]
enum AgentRef {
    Bare(String),
    Record { name: String },
}

#[derive(Deserialize)]
struct ChunkPayload {
    name: String,
    chunk: String,
}

#[derive(Deserialize)]
struct OrchestratorPayload {
    chunk: String,
}

impl Push {
    /// Decode a named event and its first argument.
    pub fn decode(event: &str, payload: Option<&Value>) -> Result<Push, serde_json::Error> {
        let payload = payload.cloned().unwrap_or(Value::Null);
        match event {
            names::AGENT_CREATED => {
                let name = match serde_json::from_value::<AgentRef>(payload)? {
                    AgentRef::Bare(name) | AgentRef::Record { name } => name,
                };
                Ok(Push::AgentCreated { name })
            }
            names::AGENT_RESPONSE => {
                let ChunkPayload { name, chunk } = serde_json::from_value::<ChunkPayload>(payload)?;
                Ok(Push::AgentChunk { name, chunk })
            }
            names::CALENDAR_EVENT => Ok(Push::CalendarEvent(serde_json::from_value(payload)?)),
            names::ORCHESTRATOR_CHUNK => {
                let OrchestratorPayload { chunk } = serde_json::from_value::<OrchestratorPayload>(payload)?;
                Ok(Push::OrchestratorChunk { chunk })
            }
            other => Ok(Push::Unknown {
                event: other.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Push::AgentCreated { .. } => names::AGENT_CREATED,
            Push::AgentChunk { .. } => names::AGENT_RESPONSE,
            Push::CalendarEvent(_) => names::CALENDAR_EVENT,
            Push::OrchestratorChunk { .. } => names::ORCHESTRATOR_CHUNK,
            Push::Unknown { event } => event,
        }
    }
}
