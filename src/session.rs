//! Live session state machine
//!
//! Connection lifecycle and turn accumulation as a pure transition
//! function; the runtime executes the effects it returns.

mod effect;
pub mod event;
mod policy;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, Push};
pub use policy::{OrphanChunkPolicy, ReconnectPolicy, SessionContext};
pub use state::{ConnectionPhase, SessionSnapshot, SessionState, SpecializedAgent, Turn};
pub use transition::{transition, TransitionError, NOT_CONNECTED, SEND_FAILED};
