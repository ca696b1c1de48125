//! Reconnect and accumulation policies

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Automatic reconnection parameters
///
/// These are fixed client-side constants, never negotiated with the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Consecutive handshake failures after which automatic retries stop
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay randomized either way, 0.0..=1.0
    pub jitter: f64,
    pub handshake_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            jitter: 0.5,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    /// Un-jittered delay before retry number `attempt` (1-based): doubles
    /// from `base_delay`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }

    /// Randomize `delay` by up to `jitter` either way, never above `max_delay`.
    pub fn jittered(&self, delay: Duration, rng: &mut impl Rng) -> Duration {
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return delay;
        }
        let factor = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
        delay.mul_f64(factor).min(self.max_delay)
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

/// What to do with a chunk whose agent has not been created yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanChunkPolicy {
    /// Discard it
    #[default]
    Drop,
    /// Hold it and replay it into the agent once created
    Buffer,
}

impl std::str::FromStr for OrphanChunkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "buffer" => Ok(Self::Buffer),
            other => Err(format!("unknown orphan chunk policy {other:?} (expected drop or buffer)")),
        }
    }
}

/// Static inputs to the session transition function
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub endpoint: String,
    pub reconnect: ReconnectPolicy,
    pub orphan_chunks: OrphanChunkPolicy,
}

impl SessionContext {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect: ReconnectPolicy::default(),
            orphan_chunks: OrphanChunkPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_orphan_chunks(mut self, policy: OrphanChunkPolicy) -> Self {
        self.orphan_chunks = policy;
        self
    }
}
