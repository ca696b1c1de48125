//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{DownloadQuery, ErrorResponse, ExportRequest, ExportResponse, MessageRequest};
use super::AppState;
use crate::calendar::{attachment_disposition, fallback_week, CalendarEvent, DeliveryError, DEFAULT_FILENAME, MIME_TYPE};
use crate::runtime::SessionClosed;
use crate::session::{SessionSnapshot, NOT_CONNECTED};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session state
        .route("/api/session", get(get_session))
        .route("/api/stream", get(stream_session))
        // User operations
        .route("/api/messages", post(submit_message))
        .route("/api/connect", post(connect))
        .route("/api/disconnect", post(disconnect))
        .route("/api/clear", post(clear))
        // Calendar export
        .route("/api/calendar.ics", get(download_calendar))
        .route("/api/calendar/export", post(export_calendar))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session
// ============================================================

async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    sse_stream(state.session.subscribe())
}

async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let snapshot = state.session.submit_message(req.text).await?;
    if !snapshot.is_connected {
        return Err(AppError::Conflict(NOT_CONNECTED.to_string()));
    }
    Ok(Json(snapshot))
}

async fn connect(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    tracing::info!("Manual connect requested");
    Ok(Json(state.session.connect().await?))
}

async fn disconnect(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    tracing::info!("Manual disconnect requested");
    Ok(Json(state.session.disconnect().await?))
}

async fn clear(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.clear_accumulated().await?))
}

// ============================================================
// Calendar
// ============================================================

/// Live events, or the demo week when none have arrived
fn export_events(snapshot: SessionSnapshot) -> (Vec<CalendarEvent>, bool) {
    if snapshot.calendar_events.is_empty() {
        (fallback_week(), true)
    } else {
        (snapshot.calendar_events, false)
    }
}

async fn download_calendar(State(state): State<AppState>, Query(query): Query<DownloadQuery>) -> Response {
    let (events, fallback) = export_events(state.session.snapshot());
    let document = state.encoder.encode(&events);
    let filename = query.filename.as_deref().unwrap_or(DEFAULT_FILENAME);
    tracing::info!(events = events.len(), fallback, "Serving calendar download");

    (
        [
            (header::CONTENT_TYPE, MIME_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(filename)),
        ],
        document,
    )
        .into_response()
}

async fn export_calendar(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ExportResponse>, AppError> {
    // An empty body exports under the default filename
    let request: ExportRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ExportRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("Invalid export request: {e}")))?
    };
    let (events, fallback) = export_events(state.session.snapshot());
    let document = state.encoder.encode(&events);
    let delivery = Arc::clone(&state.delivery);

    let path = tokio::task::spawn_blocking(move || delivery.deliver(&document, request.filename.as_deref()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| match e {
            DeliveryError::InvalidFilename(_) => AppError::BadRequest(e.to_string()),
            other => {
                tracing::error!(error = %other, "Calendar export failed");
                AppError::Internal(other.to_string())
            }
        })?;

    Ok(Json(ExportResponse {
        path: path.display().to_string(),
        events: events.len(),
        fallback,
    }))
}

async fn get_version() -> &'static str {
    concat!("bob-planning ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl From<SessionClosed> for AppError {
    fn from(e: SessionClosed) -> Self {
        AppError::Unavailable(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
