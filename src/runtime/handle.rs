//! Cloneable front door to a running session

use super::executor::{Command, Request, SessionRuntime};
use super::traits::Connector;
use crate::session::{SessionContext, SessionSnapshot};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session runtime has stopped")]
pub struct SessionClosed;

/// Routes user operations to the runtime and exposes its snapshots
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Start a runtime on the current tokio runtime. It connects right away.
    pub fn spawn<C>(context: SessionContext, connector: C) -> Self
    where
        C: Connector + 'static,
    {
        let (requests_tx, requests_rx) = mpsc::channel(32);
        let (snapshots_tx, snapshots_rx) = watch::channel(SessionSnapshot::default());
        let runtime = SessionRuntime::new(context, connector, requests_rx, snapshots_tx);
        tokio::spawn(runtime.run());

        Self {
            requests: requests_tx,
            snapshots: snapshots_rx,
        }
    }

    pub async fn connect(&self) -> Result<SessionSnapshot, SessionClosed> {
        self.request(Command::Connect).await
    }

    pub async fn disconnect(&self) -> Result<SessionSnapshot, SessionClosed> {
        self.request(Command::Disconnect).await
    }

    pub async fn submit_message(&self, text: impl Into<String>) -> Result<SessionSnapshot, SessionClosed> {
        self.request(Command::Submit(text.into())).await
    }

    pub async fn clear_accumulated(&self) -> Result<SessionSnapshot, SessionClosed> {
        self.request(Command::Clear).await
    }

    /// Disconnect and stop the runtime
    pub async fn shutdown(&self) -> Result<SessionSnapshot, SessionClosed> {
        self.request(Command::Shutdown).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    async fn request(&self, command: Command) -> Result<SessionSnapshot, SessionClosed> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .await
            .map_err(|_| SessionClosed)?;
        response.await.map_err(|_| SessionClosed)
    }
}
