//! HTTP API over the live session

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::calendar::{FileDelivery, IcsEncoder};
use crate::runtime::SessionHandle;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub encoder: Arc<IcsEncoder>,
    pub delivery: Arc<FileDelivery>,
}

impl AppState {
    pub fn new(session: SessionHandle, encoder: IcsEncoder, delivery: FileDelivery) -> Self {
        Self {
            session,
            encoder: Arc::new(encoder),
            delivery: Arc::new(delivery),
        }
    }
}
