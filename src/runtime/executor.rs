//! Session runtime executor

use super::traits::{Connector, Link, LinkEvent, TransportError};
use crate::session::{transition, Effect, Event, SessionContext, SessionSnapshot, SessionState, TransitionError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// User operations forwarded from a [`super::SessionHandle`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    Submit(String),
    Clear,
    Shutdown,
}

impl Command {
    fn into_event(self) -> Event {
        match self {
            Command::Connect => Event::Connect,
            Command::Disconnect | Command::Shutdown => Event::Disconnect,
            Command::Submit(text) => Event::SubmitMessage { text },
            Command::Clear => Event::ClearAccumulated,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<SessionSnapshot>,
}

/// Outcomes reported back by tasks the runtime spawned
#[derive(Debug)]
enum Internal {
    LinkReady { generation: u64, link: Link },
    HandshakeFailed { generation: u64, error: TransportError },
    Link { generation: u64, event: LinkEvent },
    RetryDue { generation: u64 },
}

struct ActiveLink {
    generation: u64,
    outbound: mpsc::Sender<String>,
    shutdown: CancellationToken,
    forwarder: JoinHandle<()>,
}

/// Owns the session state and is its only writer
pub struct SessionRuntime<C>
where
    C: Connector + 'static,
{
    context: SessionContext,
    state: SessionState,
    connector: Arc<C>,
    requests: mpsc::Receiver<Request>,
    internal_tx: mpsc::Sender<Internal>,
    internal_rx: mpsc::Receiver<Internal>,
    snapshots: watch::Sender<SessionSnapshot>,
    active: Option<ActiveLink>,
    /// Handshake in flight
    handshake: Option<JoinHandle<()>>,
    /// Pending retry timer
    retry: Option<JoinHandle<()>>,
}

impl<C> SessionRuntime<C>
where
    C: Connector + 'static,
{
    pub(crate) fn new(
        context: SessionContext,
        connector: C,
        requests: mpsc::Receiver<Request>,
        snapshots: watch::Sender<SessionSnapshot>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::channel(64);
        Self {
            context,
            state: SessionState::new(),
            connector: Arc::new(connector),
            requests,
            internal_tx,
            internal_rx,
            snapshots,
            active: None,
            handshake: None,
            retry: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(endpoint = %self.context.endpoint, "Starting session runtime");

        // Connect as soon as the session exists
        self.apply(Event::Connect);

        loop {
            tokio::select! {
                biased;

                request = self.requests.recv() => {
                    let Some(Request { command, reply }) = request else {
                        self.apply(Event::Disconnect);
                        break;
                    };
                    let shutdown = command == Command::Shutdown;
                    self.apply(command.into_event());
                    let _ = reply.send(self.state.snapshot());
                    if shutdown {
                        break;
                    }
                }

                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal),
            }
        }

        self.close_transport();
        tracing::info!("Session runtime stopped");
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::LinkReady { generation, link } => {
                self.finish_handshake(generation);
                if self.apply(Event::HandshakeSucceeded { generation }) {
                    tracing::info!(generation, "Connected");
                    self.install_link(generation, link);
                } else {
                    link.shutdown.cancel();
                }
            }
            Internal::HandshakeFailed { generation, error } => {
                self.finish_handshake(generation);
                tracing::warn!(generation, error = %error, "Handshake failed");
                self.apply(Event::HandshakeFailed {
                    generation,
                    message: error.to_string(),
                });
            }
            Internal::Link {
                generation,
                event: LinkEvent::Push(push),
            } => {
                tracing::debug!(generation, kind = push.kind(), "Push received");
                self.apply(Event::Push { generation, push });
            }
            Internal::Link {
                generation,
                event: LinkEvent::Closed { reason, reconnect },
            } => {
                tracing::warn!(generation, reason = %reason, reconnect, "Transport dropped");
                self.apply(Event::TransportDropped {
                    generation,
                    reason,
                    reconnect,
                });
            }
            Internal::RetryDue { generation } => {
                self.retry = None;
                self.apply(Event::RetryTimeout { generation });
            }
        }
    }

    /// Forget the handshake task once the current generation reports back.
    /// Outcomes from superseded handshakes leave the newer task tracked.
    fn finish_handshake(&mut self, generation: u64) {
        if generation == self.state.generation {
            self.handshake = None;
        }
    }

    /// Run one transition and its effects. Returns whether it was accepted.
    fn apply(&mut self, event: Event) -> bool {
        match transition(&mut self.state, &self.context, event) {
            Ok(effects) => {
                for effect in effects {
                    self.execute_effect(effect);
                }
                true
            }
            Err(e) => {
                log_rejection(&e);
                false
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::OpenTransport { generation } => {
                if let Some(task) = self.handshake.take() {
                    task.abort();
                }
                let connector = Arc::clone(&self.connector);
                let endpoint = self.context.endpoint.clone();
                let limit = self.context.reconnect.handshake_timeout;
                let internal_tx = self.internal_tx.clone();

                tracing::info!(generation, endpoint = %endpoint, "Opening transport");
                self.handshake = Some(tokio::spawn(async move {
                    let outcome = match tokio::time::timeout(limit, connector.connect(&endpoint)).await {
                        Ok(Ok(link)) => Internal::LinkReady { generation, link },
                        Ok(Err(error)) => Internal::HandshakeFailed { generation, error },
                        Err(_) => Internal::HandshakeFailed {
                            generation,
                            error: TransportError::Timeout(limit),
                        },
                    };
                    let _ = internal_tx.send(outcome).await;
                }));
            }

            Effect::CloseTransport => self.close_transport(),

            Effect::SendMessage { text } => {
                let (generation, result) = match &self.active {
                    Some(active) => (
                        active.generation,
                        active.outbound.try_send(text).map_err(|e| e.to_string()),
                    ),
                    None => (self.state.generation, Err("no transport".to_string())),
                };
                if let Err(message) = result {
                    tracing::error!(generation, error = %message, "Failed to queue outbound message");
                    self.apply(Event::SendFailed { generation, message });
                }
            }

            Effect::ScheduleRetry { delay, generation } => {
                if let Some(task) = self.retry.take() {
                    task.abort();
                }
                let delay = self.context.reconnect.jittered(delay, &mut rand::thread_rng());
                let internal_tx = self.internal_tx.clone();

                tracing::info!(
                    generation,
                    attempts = self.state.reconnect_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Scheduling reconnect"
                );
                self.retry = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = internal_tx.send(Internal::RetryDue { generation }).await;
                }));
            }

            Effect::PublishSnapshot => {
                self.snapshots.send_replace(self.state.snapshot());
            }
        }
    }

    fn install_link(&mut self, generation: u64, link: Link) {
        let Link {
            outbound,
            mut inbound,
            shutdown,
        } = link;
        let internal_tx = self.internal_tx.clone();

        let forwarder = tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                let closed = matches!(event, LinkEvent::Closed { .. });
                if internal_tx.send(Internal::Link { generation, event }).await.is_err() || closed {
                    return;
                }
            }
            // Link went away without saying why
            let event = LinkEvent::Closed {
                reason: "transport close".to_string(),
                reconnect: true,
            };
            let _ = internal_tx.send(Internal::Link { generation, event }).await;
        });

        self.active = Some(ActiveLink {
            generation,
            outbound,
            shutdown,
            forwarder,
        });
    }

    fn close_transport(&mut self) {
        if let Some(task) = self.handshake.take() {
            task.abort();
        }
        if let Some(task) = self.retry.take() {
            task.abort();
        }
        if let Some(active) = self.active.take() {
            tracing::debug!(generation = active.generation, "Closing transport");
            active.shutdown.cancel();
            active.forwarder.abort();
        }
    }
}

fn log_rejection(error: &TransitionError) {
    match error {
        TransitionError::Stale { .. } | TransitionError::UnhandledPush(_) => {
            tracing::debug!(error = %error, "Ignoring event");
        }
        TransitionError::OrphanChunk { buffered: true, .. } => {
            tracing::debug!(error = %error, "Buffering chunk");
        }
        TransitionError::OrphanChunk { buffered: false, .. } => {
            tracing::warn!(error = %error, "Dropping chunk");
        }
        TransitionError::InvalidTransition(_) => {
            tracing::warn!(error = %error, "Rejected event");
        }
    }
}
