//! Environment configuration

use crate::calendar::DEFAULT_TIMEZONE;
use crate::session::OrphanChunkPolicy;
use crate::socket_io::websocket_url;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://jan-1st.onrender.com";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOB_ENDPOINT {0:?} is not an http(s) or ws(s) URL")]
    InvalidEndpoint(String),
    #[error("BOB_PORT {0:?} is not a port number")]
    InvalidPort(String),
    #[error("BOB_ORPHAN_CHUNKS: {0}")]
    InvalidOrphanPolicy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Remote planning service
    pub endpoint: String,
    pub port: u16,
    /// Where exported calendars are written
    pub export_dir: PathBuf,
    /// TZID tag on event times
    pub timezone: String,
    pub orphan_chunks: OrphanChunkPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            port: DEFAULT_PORT,
            export_dir: PathBuf::from("."),
            timezone: DEFAULT_TIMEZONE.to_string(),
            orphan_chunks: OrphanChunkPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let endpoint = get("BOB_ENDPOINT").unwrap_or(defaults.endpoint);
        if websocket_url(&endpoint).is_err() {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }

        let port = match get("BOB_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => defaults.port,
        };

        let orphan_chunks = match get("BOB_ORPHAN_CHUNKS") {
            Some(raw) => raw.parse().map_err(ConfigError::InvalidOrphanPolicy)?,
            None => defaults.orphan_chunks,
        };

        Ok(Self {
            endpoint,
            port,
            export_dir: get("BOB_EXPORT_DIR").map_or(defaults.export_dir, PathBuf::from),
            timezone: get("BOB_TIMEZONE").unwrap_or(defaults.timezone),
            orphan_chunks,
        })
    }
}
