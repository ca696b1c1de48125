//! Pure state transition function
//!
//! No I/O happens here: the function mutates the in-memory state and
//! returns the effects the runtime must carry out.

use super::{ConnectionPhase, Effect, Event, Push, SessionContext, SessionState};
use thiserror::Error;

/// Error surfaced when a message is submitted without a live connection
pub const NOT_CONNECTED: &str = "Not connected";

/// Prefix of the error shown when an outbound message could not be queued
pub const SEND_FAILED: &str = "Message not sent";

/// Events that were discarded, or held back without visible change
///
/// None of these are user-facing; the runtime logs them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Stale transport event (generation {event}, current {current})")]
    Stale { event: u64, current: u64 },
    #[error("Chunk for unknown agent {name:?} (buffered: {buffered})")]
    OrphanChunk { name: String, buffered: bool },
    #[error("Unhandled push event {0:?}")]
    UnhandledPush(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Apply `event` to `state`.
///
/// On `Err`, no effect is returned and nothing observable has changed.
pub fn transition(
    state: &mut SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<Vec<Effect>, TransitionError> {
    match event {
        // ============================================================
        // User operations
        // ============================================================
        Event::Connect => {
            if state.phase.is_connected() {
                return Ok(vec![]);
            }
            // A manual connect starts a fresh retry budget
            state.generation += 1;
            state.phase = ConnectionPhase::Connecting;
            state.reconnect_attempts = 0;
            state.error = None;
            Ok(vec![
                Effect::CloseTransport,
                Effect::open(state.generation),
                Effect::PublishSnapshot,
            ])
        }

        Event::Disconnect => {
            state.generation += 1;
            state.phase = ConnectionPhase::Idle;
            Ok(vec![Effect::CloseTransport, Effect::PublishSnapshot])
        }

        Event::SubmitMessage { text } => {
            if state.phase.is_connected() {
                state.turn.reset();
                Ok(vec![Effect::send(text), Effect::PublishSnapshot])
            } else {
                state.error = Some(NOT_CONNECTED.to_string());
                Ok(vec![Effect::PublishSnapshot])
            }
        }

        Event::ClearAccumulated => {
            state.turn.reset();
            Ok(vec![Effect::PublishSnapshot])
        }

        // ============================================================
        // Connection lifecycle
        // ============================================================
        Event::HandshakeSucceeded { generation } => {
            ensure_current(state, generation)?;
            ensure_phase(state, &ConnectionPhase::Connecting, "handshake success")?;
            state.phase = ConnectionPhase::Connected;
            state.reconnect_attempts = 0;
            state.error = None;
            Ok(vec![Effect::PublishSnapshot])
        }

        Event::HandshakeFailed { generation, message } => {
            ensure_current(state, generation)?;
            ensure_phase(state, &ConnectionPhase::Connecting, "handshake failure")?;
            state.reconnect_attempts = state.reconnect_attempts.saturating_add(1);
            state.error = Some(format!("Connection failed: {message}"));

            if context.reconnect.is_exhausted(state.reconnect_attempts) {
                state.phase = ConnectionPhase::Exhausted;
                Ok(vec![Effect::PublishSnapshot])
            } else {
                state.phase = ConnectionPhase::Backoff;
                let delay = context.reconnect.delay_for(state.reconnect_attempts);
                Ok(vec![
                    Effect::retry(delay, state.generation),
                    Effect::PublishSnapshot,
                ])
            }
        }

        Event::TransportDropped {
            generation,
            reason,
            reconnect,
        } => {
            ensure_current(state, generation)?;
            ensure_phase(state, &ConnectionPhase::Connected, "transport drop")?;
            state.phase = ConnectionPhase::Disconnected {
                reason,
                retry_pending: reconnect,
            };

            let mut effects = vec![Effect::CloseTransport];
            if reconnect {
                let delay = context.reconnect.delay_for(state.reconnect_attempts + 1);
                effects.push(Effect::retry(delay, state.generation));
            }
            effects.push(Effect::PublishSnapshot);
            Ok(effects)
        }

        Event::RetryTimeout { generation } => {
            ensure_current(state, generation)?;
            if !state.phase.awaits_retry() {
                return Err(TransitionError::InvalidTransition(format!(
                    "retry timeout while {:?}",
                    state.phase
                )));
            }
            state.generation += 1;
            state.phase = ConnectionPhase::Connecting;
            Ok(vec![Effect::open(state.generation), Effect::PublishSnapshot])
        }

        Event::SendFailed { generation, message } => {
            ensure_current(state, generation)?;
            ensure_phase(state, &ConnectionPhase::Connected, "send failure")?;
            state.error = Some(format!("{SEND_FAILED}: {message}"));
            Ok(vec![Effect::PublishSnapshot])
        }

        // ============================================================
        // Inbound pushes
        // ============================================================
        Event::Push { generation, push } => {
            ensure_current(state, generation)?;
            ensure_phase(state, &ConnectionPhase::Connected, "push")?;
            apply_push(state, context, push)
        }
    }
}

fn apply_push(
    state: &mut SessionState,
    context: &SessionContext,
    push: Push,
) -> Result<Vec<Effect>, TransitionError> {
    match push {
        Push::AgentCreated { name } => {
            if name.is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "agent created without a name".to_string(),
                ));
            }
            // First creation wins; repeats are no-ops
            if state.turn.create_agent(&name) {
                Ok(vec![Effect::PublishSnapshot])
            } else {
                Ok(vec![])
            }
        }

        Push::AgentChunk { name, chunk } => {
            if state.turn.append_chunk(&name, &chunk, context.orphan_chunks) {
                Ok(vec![Effect::PublishSnapshot])
            } else {
                Err(TransitionError::OrphanChunk {
                    name,
                    buffered: context.orphan_chunks == super::OrphanChunkPolicy::Buffer,
                })
            }
        }

        Push::CalendarEvent(event) => {
            state.turn.calendar_events.push(event);
            Ok(vec![Effect::PublishSnapshot])
        }

        Push::OrchestratorChunk { chunk } => {
            state.turn.orchestrator_response.push_str(&chunk);
            Ok(vec![Effect::PublishSnapshot])
        }

        Push::Unknown { event } => Err(TransitionError::UnhandledPush(event)),
    }
}

fn ensure_current(state: &SessionState, generation: u64) -> Result<(), TransitionError> {
    if generation == state.generation {
        Ok(())
    } else {
        Err(TransitionError::Stale {
            event: generation,
            current: state.generation,
        })
    }
}

fn ensure_phase(
    state: &SessionState,
    expected: &ConnectionPhase,
    what: &str,
) -> Result<(), TransitionError> {
    if &state.phase == expected {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition(format!(
            "{what} while {:?}",
            state.phase
        )))
    }
}
