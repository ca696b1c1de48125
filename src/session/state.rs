//! Session state types

use super::policy::OrphanChunkPolicy;
use crate::calendar::CalendarEvent;
use serde::Serialize;

/// Where the connection to the remote service stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// Never connected, or explicitly disconnected
    Idle,
    /// Handshake in flight
    Connecting,
    /// Handshake failed; a retry timer is pending
    Backoff,
    Connected,
    /// Transport dropped after being connected
    Disconnected { reason: String, retry_pending: bool },
    /// Automatic retries used up; only a manual connect leaves this state
    Exhausted,
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionPhase::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionPhase::Connecting | ConnectionPhase::Backoff)
    }

    pub fn awaits_retry(&self) -> bool {
        matches!(
            self,
            ConnectionPhase::Backoff
                | ConnectionPhase::Disconnected {
                    retry_pending: true,
                    ..
                }
        )
    }
}

/// A specialist agent and everything it has streamed this turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecializedAgent {
    pub name: String,
    pub response: String,
}

impl SpecializedAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: String::new(),
        }
    }
}

/// A chunk that arrived before its agent existed
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrphanChunk {
    name: String,
    chunk: String,
}

/// Output accumulated for the current turn
///
/// Agents are newest-first. Every buffer here only ever grows until the
/// turn is reset as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    pub agents: Vec<SpecializedAgent>,
    pub calendar_events: Vec<CalendarEvent>,
    pub orchestrator_response: String,
    orphans: Vec<OrphanChunk>,
}

impl Turn {
    pub fn agent(&self, name: &str) -> Option<&SpecializedAgent> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Register `name` unless it already exists. Returns whether it was added.
    pub(crate) fn create_agent(&mut self, name: &str) -> bool {
        if self.agent(name).is_some() {
            return false;
        }
        let mut agent = SpecializedAgent::new(name);
        let (mine, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.orphans).into_iter().partition(|o| o.name == name);
        for orphan in mine {
            agent.response.push_str(&orphan.chunk);
        }
        self.orphans = rest;
        self.agents.insert(0, agent);
        true
    }

    /// Append to the named agent. Returns false when no such agent exists;
    /// under `Buffer` the chunk is then held until the agent is created.
    pub(crate) fn append_chunk(&mut self, name: &str, chunk: &str, policy: OrphanChunkPolicy) -> bool {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.name == name) {
            agent.response.push_str(chunk);
            return true;
        }
        if policy == OrphanChunkPolicy::Buffer {
            self.orphans.push(OrphanChunk {
                name: name.to_string(),
                chunk: chunk.to_string(),
            });
        }
        false
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
            && self.calendar_events.is_empty()
            && self.orchestrator_response.is_empty()
            && self.orphans.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        *self = Turn::default();
    }
}

/// Full session state, owned by the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: ConnectionPhase,
    /// Bumped on every transport open and every manual connect/disconnect;
    /// transport events carrying an older value are stale.
    pub generation: u64,
    /// Consecutive handshake failures since the last successful connect
    pub reconnect_attempts: u32,
    /// Last user-facing failure
    pub error: Option<String>,
    pub turn: Turn,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            generation: 0,
            reconnect_attempts: 0,
            error: None,
            turn: Turn::default(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(self)
    }
}

/// Read-only view of the session for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: ConnectionPhase,
    pub is_connected: bool,
    pub is_connecting: bool,
    pub error: Option<String>,
    pub reconnect_attempts: u32,
    pub specialized_agents: Vec<SpecializedAgent>,
    pub calendar_events: Vec<CalendarEvent>,
    pub orchestrator_response: String,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            phase: state.phase.clone(),
            is_connected: state.phase.is_connected(),
            is_connecting: state.phase.is_connecting(),
            error: state.error.clone(),
            reconnect_attempts: state.reconnect_attempts,
            specialized_agents: state.turn.agents.clone(),
            calendar_events: state.turn.calendar_events.clone(),
            orchestrator_response: state.turn.orchestrator_response.clone(),
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        SessionState::new().snapshot()
    }
}
