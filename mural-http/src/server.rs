use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{SessionStore, UserDirectory};
use crate::handlers::{health, list_messages, login, post_message, replication_status, AppState};
use crate::openapi::ApiDoc;
use mural::MessageStore;
use mural_replication::{NodeConfig, ReconcileOutcome, ReplicationManager};

/// Install the global tracing subscriber (`RUST_LOG`, default `info`).
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init();
}

/// Client-facing routes. The peer protocol is served separately over raw TCP.
pub fn router(state: Arc<AppState>) -> Router {
    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    let api = Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/messages", get(list_messages).post(post_message))
        .route("/internal/status", get(replication_status))
        .with_state(state);

    Router::new()
        .merge(swagger)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive().max_age(std::time::Duration::from_secs(86400)))
}

/// Run a node until the process is stopped.
///
/// Startup order: wait the configured delay, reconcile once against the first
/// non-self peer, start the peer listener, then serve clients.
pub async fn serve(config: NodeConfig, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    tracing::info!(
        node_id = %config.node_id,
        client_addr = %config.client_addr,
        peer_addr = %config.peer_addr,
        peers = config.peers.len(),
        "Node configuration loaded"
    );

    let store = Arc::new(MessageStore::new());
    let manager = ReplicationManager::new(&config, store);
    let users = Arc::new(UserDirectory::load_or_default(data_dir));

    match manager.reconcile_after(config.startup_delay()).await {
        ReconcileOutcome::NoPeers => {}
        ReconcileOutcome::Synced { accepted, .. } => {
            tracing::info!("Starting with {} reconciled messages", accepted);
        }
        ReconcileOutcome::Failed { peer, .. } => {
            tracing::warn!(
                "Starting without history from {}; will catch up only through new broadcasts",
                peer
            );
        }
    }

    let peer_listener = manager.bind_peer_listener().await?;
    tokio::spawn(peer_listener.run());

    let state = Arc::new(AppState {
        manager,
        users,
        sessions: Arc::new(SessionStore::new()),
    });

    let app = router(state);

    tracing::info!("Starting Mural client API on {}", config.client_addr);

    let listener = tokio::net::TcpListener::bind(&config.client_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
