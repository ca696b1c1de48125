//! Mock implementations for testing
//!
//! These mocks drive the runtime without a network.

use super::traits::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Connector
// ============================================================================

/// How the next handshake behaves
#[derive(Debug, Clone)]
pub enum Outcome {
    Accept,
    Fail(String),
    /// Never completes
    Hang,
}

/// The server side of a link handed out by [`MockConnector`]
pub struct RemoteEnd {
    pub pushes: mpsc::Sender<LinkEvent>,
    pub sent: mpsc::Receiver<String>,
    pub shutdown: CancellationToken,
}

/// Connector that plays back queued outcomes
pub struct MockConnector {
    outcomes: Mutex<VecDeque<Outcome>>,
    remotes: Mutex<VecDeque<RemoteEnd>>,
    /// Endpoint of every connect call
    pub attempts: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            remotes: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let mock = Self::new();
        mock.outcomes.lock().unwrap().extend(outcomes);
        mock
    }

    pub fn queue(&self, outcome: Outcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn connect_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Oldest accepted link not yet taken
    pub fn take_remote(&self) -> Option<RemoteEnd> {
        self.remotes.lock().unwrap().pop_front()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &str) -> Result<Link, TransportError> {
        self.attempts.lock().unwrap().push(endpoint.to_string());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Outcome::Fail("No mock outcome queued".to_string()));

        match outcome {
            Outcome::Accept => {
                let (outbound, sent) = mpsc::channel(16);
                let (pushes, inbound) = mpsc::channel(16);
                let shutdown = CancellationToken::new();
                self.remotes.lock().unwrap().push_back(RemoteEnd {
                    pushes,
                    sent,
                    shutdown: shutdown.clone(),
                });
                Ok(Link {
                    outbound,
                    inbound,
                    shutdown,
                })
            }
            Outcome::Fail(message) => Err(TransportError::Rejected(message)),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarEvent, WeekDay};
    use crate::runtime::SessionHandle;
    use crate::session::{ConnectionPhase, Push, SessionContext, SessionSnapshot, NOT_CONNECTED, SEND_FAILED};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    const ENDPOINT: &str = "http://bob.test";

    fn start(connector: &Arc<MockConnector>) -> SessionHandle {
        SessionHandle::spawn(SessionContext::new(ENDPOINT), Arc::clone(connector))
    }

    async fn until(
        rx: &mut watch::Receiver<SessionSnapshot>,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        rx.wait_for(predicate).await.expect("runtime stopped").clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_on_start_and_accumulates_pushes() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Accept]));
        let handle = start(&connector);
        let mut rx = handle.subscribe();

        until(&mut rx, |s| s.is_connected).await;
        assert_eq!(connector.attempts.lock().unwrap().as_slice(), [ENDPOINT.to_string()]);

        let remote = connector.take_remote().unwrap();
        remote
            .pushes
            .send(LinkEvent::Push(Push::AgentCreated { name: "Maya".into() }))
            .await
            .unwrap();
        for chunk in ["Bon", "jour"] {
            remote
                .pushes
                .send(LinkEvent::Push(Push::AgentChunk {
                    name: "Maya".into(),
                    chunk: chunk.into(),
                }))
                .await
                .unwrap();
        }

        let snapshot = until(&mut rx, |s| {
            s.specialized_agents.first().is_some_and(|a| a.response == "Bonjour")
        })
        .await;
        assert_eq!(snapshot.specialized_agents.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_sends_and_resets_turn() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Accept]));
        let handle = start(&connector);
        let mut rx = handle.subscribe();
        until(&mut rx, |s| s.is_connected).await;

        let mut remote = connector.take_remote().unwrap();
        remote
            .pushes
            .send(LinkEvent::Push(Push::CalendarEvent(CalendarEvent::new(
                "Yoga",
                WeekDay::Tuesday,
                7.0,
                60,
            ))))
            .await
            .unwrap();
        until(&mut rx, |s| s.calendar_events.len() == 1).await;

        let snapshot = handle.submit_message("Je veux courir").await.unwrap();
        assert!(snapshot.calendar_events.is_empty());
        assert_eq!(remote.sent.recv().await.as_deref(), Some("Je veux courir"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_on_dead_link_reports_error() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Accept]));
        let handle = start(&connector);
        let mut rx = handle.subscribe();
        until(&mut rx, |s| s.is_connected).await;

        let remote = connector.take_remote().unwrap();
        remote
            .pushes
            .send(LinkEvent::Push(Push::CalendarEvent(CalendarEvent::new(
                "Yoga",
                WeekDay::Tuesday,
                7.0,
                60,
            ))))
            .await
            .unwrap();
        until(&mut rx, |s| s.calendar_events.len() == 1).await;

        // The link still reports in but no longer accepts outbound text
        drop(remote.sent);
        let snapshot = handle.submit_message("Je veux courir").await.unwrap();
        assert!(snapshot.is_connected);
        assert!(snapshot.calendar_events.is_empty());
        assert!(snapshot.error.as_deref().is_some_and(|e| e.starts_with(SEND_FAILED)));
        assert_eq!(handle.snapshot().error, snapshot.error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_while_disconnected_reports_error() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Hang]));
        let handle = start(&connector);

        let snapshot = handle.disconnect().await.unwrap();
        assert_eq!(snapshot.phase, ConnectionPhase::Idle);

        let snapshot = handle.submit_message("hello").await.unwrap();
        assert_eq!(snapshot.error.as_deref(), Some(NOT_CONNECTED));
        assert!(connector.take_remote().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_stop_after_five_failures() {
        let failures = (0..5).map(|n| Outcome::Fail(format!("refused {n}")));
        let connector = Arc::new(MockConnector::with_outcomes(failures));
        let handle = start(&connector);
        let mut rx = handle.subscribe();

        let snapshot = until(&mut rx, |s| s.phase == ConnectionPhase::Exhausted).await;
        assert_eq!(connector.connect_count(), 5);
        assert_eq!(snapshot.reconnect_attempts, 5);
        assert!(snapshot.error.as_deref().unwrap().starts_with("Connection failed"));

        // Nothing else happens on its own
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.connect_count(), 5);

        connector.queue(Outcome::Accept);
        handle.connect().await.unwrap();
        let snapshot = until(&mut rx, |s| s.is_connected).await;
        assert_eq!(snapshot.reconnect_attempts, 0);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_counts_as_failure() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Hang, Outcome::Accept]));
        let started = tokio::time::Instant::now();
        let handle = start(&connector);
        let mut rx = handle.subscribe();

        let snapshot = until(&mut rx, |s| s.reconnect_attempts == 1).await;
        assert!(snapshot.error.as_deref().unwrap().contains("timed out"));
        assert!(started.elapsed() >= Duration::from_secs(10));

        until(&mut rx, |s| s.is_connected).await;
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_link_reconnects_and_keeps_turn() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Accept, Outcome::Accept]));
        let handle = start(&connector);
        let mut rx = handle.subscribe();
        until(&mut rx, |s| s.is_connected).await;

        let remote = connector.take_remote().unwrap();
        remote
            .pushes
            .send(LinkEvent::Push(Push::AgentCreated { name: "Marcus".into() }))
            .await
            .unwrap();
        until(&mut rx, |s| s.specialized_agents.len() == 1).await;

        remote
            .pushes
            .send(LinkEvent::Closed {
                reason: "transport close".into(),
                reconnect: true,
            })
            .await
            .unwrap();
        until(&mut rx, |s| !s.is_connected).await;
        assert!(remote.shutdown.is_cancelled());

        let snapshot = until(&mut rx, |s| s.is_connected).await;
        assert_eq!(connector.connect_count(), 2);
        assert_eq!(snapshot.specialized_agents.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_disconnect_is_final() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Accept, Outcome::Accept]));
        let handle = start(&connector);
        let mut rx = handle.subscribe();
        until(&mut rx, |s| s.is_connected).await;

        let remote = connector.take_remote().unwrap();
        remote
            .pushes
            .send(LinkEvent::Closed {
                reason: "io server disconnect".into(),
                reconnect: false,
            })
            .await
            .unwrap();
        until(&mut rx, |s| {
            matches!(s.phase, ConnectionPhase::Disconnected { retry_pending: false, .. })
        })
        .await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_link_and_handle() {
        let connector = Arc::new(MockConnector::with_outcomes([Outcome::Accept]));
        let handle = start(&connector);
        let mut rx = handle.subscribe();
        until(&mut rx, |s| s.is_connected).await;
        let remote = connector.take_remote().unwrap();

        let snapshot = handle.shutdown().await.unwrap();
        assert_eq!(snapshot.phase, ConnectionPhase::Idle);
        assert!(remote.shutdown.is_cancelled());

        // Late pushes from the old link have nowhere to go
        let _ = remote
            .pushes
            .send(LinkEvent::Push(Push::AgentCreated { name: "Late".into() }))
            .await;
        assert!(handle.snapshot().specialized_agents.is_empty());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.connect().await.is_err());
    }
}
