//! Effects produced by state transitions

use std::time::Duration;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start a handshake; its outcome is reported with `generation`
    OpenTransport { generation: u64 },

    /// Tear down the current transport and any handshake in flight
    CloseTransport,

    /// Emit user input over the open transport
    SendMessage { text: String },

    /// Fire `RetryTimeout { generation }` after roughly `delay`
    ScheduleRetry { delay: Duration, generation: u64 },

    /// Republish the session snapshot to observers
    PublishSnapshot,
}

impl Effect {
    pub fn open(generation: u64) -> Self {
        Effect::OpenTransport { generation }
    }

    pub fn send(text: impl Into<String>) -> Self {
        Effect::SendMessage { text: text.into() }
    }

    pub fn retry(delay: Duration, generation: u64) -> Self {
        Effect::ScheduleRetry { delay, generation }
    }
}
