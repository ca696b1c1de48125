//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to send a user message to Bob
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Optional body for a calendar export
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub filename: Option<String>,
}

/// Query for the calendar download
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub filename: Option<String>,
}

/// Response for a calendar export
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub path: String,
    pub events: usize,
    /// True when no live events existed and the demo week was exported
    pub fallback: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
