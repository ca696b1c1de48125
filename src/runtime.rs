//! Runtime for the live session
//!
//! One task owns the [`crate::session::SessionState`]; everything else
//! reaches it through a [`SessionHandle`].

mod executor;
mod handle;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use handle::{SessionClosed, SessionHandle};
pub use traits::*;
