//! `DropFourServer`: Axum HTTP + WebSocket front end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use dropfour_core::SessionId;
use dropfour_settings::ServerSettings;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::connection::{ConnectionConfig, run_connection};
use crate::health::{self, HealthResponse};
use crate::registry::SessionRegistry;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// All live sessions.
    pub registry: Arc<SessionRegistry>,
    /// Stops connection loops on shutdown.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Per-connection knobs.
    pub connection: ConnectionConfig,
    /// When the server was constructed.
    pub start_time: Instant,
}

/// The session server.
pub struct DropFourServer {
    settings: ServerSettings,
    registry: Arc<SessionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl DropFourServer {
    /// Create a server with an empty registry.
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            settings,
            registry: Arc::new(SessionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            connection: ConnectionConfig::from(&self.settings),
            start_time: self.start_time,
        };
        let static_dir = &self.settings.static_dir;

        Router::new()
            .route("/", get(create_session))
            .route("/health", get(health_handler))
            .route("/ws/{session_id}", get(ws_handler))
            .nest_service("/static", ServeDir::new(static_dir))
            .fallback_service(ServeFile::new(static_dir.join("index.html")))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.settings.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
        });

        info!(%addr, "listening");
        Ok((addr, handle))
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }
}

/// GET / mints a session token and redirects to its page.
async fn create_session() -> Response {
    let session_id = SessionId::generate();
    info!(%session_id, "session token issued");
    (
        StatusCode::FOUND,
        [(header::LOCATION, format!("/{session_id}"))],
    )
        .into_response()
}

/// GET /ws/{session_id}
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let session_id = SessionId::from_raw(session_id);
    let token = state.shutdown.token();
    ws.on_upgrade(move |socket| {
        run_connection(socket, session_id, state.registry, state.connection, token)
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.session_count(),
        state.registry.connection_count(),
    ))
}
