//! Bob Planning server
//!
//! Keeps one live session to the planning service and serves it over HTTP.

use bob_planning::api::{create_router, AppState};
use bob_planning::calendar::{CalendarProfile, FileDelivery, IcsEncoder};
use bob_planning::config::Config;
use bob_planning::runtime::SessionHandle;
use bob_planning::session::SessionContext;
use bob_planning::socket_io::SocketIoConnector;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bob_planning=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        endpoint = %config.endpoint,
        export_dir = %config.export_dir.display(),
        timezone = %config.timezone,
        orphan_chunks = ?config.orphan_chunks,
        "Configuration loaded"
    );

    // Live session, connecting immediately
    let context = SessionContext::new(&config.endpoint).with_orphan_chunks(config.orphan_chunks);
    let session = SessionHandle::spawn(context, SocketIoConnector::new());

    let encoder = IcsEncoder::new(CalendarProfile::default().with_timezone(&config.timezone));
    let delivery = FileDelivery::new(&config.export_dir);
    let state = AppState::new(session.clone(), encoder, delivery);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true).deflate(true).zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Bob Planning server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close the transport before exiting
    let _ = session.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
