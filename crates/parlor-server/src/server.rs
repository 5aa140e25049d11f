//! Server assembly.
//!
//! Builds the axum router, owns the shared [`AppState`], and runs the
//! listener plus the background expiry sweeper until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use parlor_core::SessionId;
use parlor_rules::RuleEngine;
use parlor_session::SessionRegistry;

use crate::config::ServerConfig;
use crate::expiry::run_expiry_sweeper;
use crate::health::HealthResponse;
use crate::http;
use crate::metrics::{install_recorder, render};
use crate::shutdown::{DEFAULT_SHUTDOWN_TIMEOUT, ShutdownCoordinator};
use crate::websocket::hub::ConnectionHub;
use crate::websocket::session::run_ws_session;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Effective server configuration.
    pub config: Arc<ServerConfig>,
    /// Registry of live game sessions.
    pub registry: Arc<SessionRegistry>,
    /// Hub tracking WebSocket connections per session.
    pub hub: Arc<ConnectionHub>,
    /// Coordinator for graceful shutdown.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Handle for rendering Prometheus metrics.
    pub metrics: PrometheusHandle,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

/// The assembled session server.
pub struct ParlorServer {
    state: AppState,
}

impl ParlorServer {
    /// Build a server from a configuration and a rule engine.
    #[must_use]
    pub fn new(config: ServerConfig, engine: Arc<dyn RuleEngine>) -> Self {
        let registry = Arc::new(SessionRegistry::new(engine, config.move_policy));
        Self {
            state: AppState {
                config: Arc::new(config),
                registry,
                hub: Arc::new(ConnectionHub::new()),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                metrics: install_recorder(),
                start_time: Instant::now(),
            },
        }
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// The session registry backing this server.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.state.registry
    }

    /// The connection hub backing this server.
    #[must_use]
    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.state.hub
    }

    /// The shutdown coordinator for this server.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Build the HTTP router with all routes and middleware.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(http::root))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/create_session", post(http::create_session))
            .route("/join_session/{session_id}", post(http::join_session))
            .route("/connect/{session_id}", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown is signalled.
    ///
    /// Returns the bound address (useful with port 0) and the join handle
    /// of the serve task. The task drains the expiry sweeper before it
    /// resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be bound.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(format!(
            "{}:{}",
            self.state.config.host, self.state.config.port
        ))
        .await?;
        let addr = listener.local_addr()?;

        let sweeper = run_expiry_sweeper(
            Arc::clone(&self.state.registry),
            Arc::clone(&self.state.hub),
            self.state.config.session_retention(),
            self.state.config.sweep_interval(),
            self.state.shutdown.token(),
        );

        let app = self.router();
        let shutdown = Arc::clone(&self.state.shutdown);
        let handle = tokio::spawn(async move {
            let token = shutdown.token();
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(%err, "server error");
            }
            shutdown.drain([sweeper], DEFAULT_SHUTDOWN_TIMEOUT).await;
        });

        info!(%addr, policy = ?self.state.config.move_policy, "listening");
        Ok((addr, handle))
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::report(
        state.start_time,
        state.registry.policy(),
        state.hub.connection_count(),
        state.registry.len(),
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    render(&state.metrics)
}

/// Upgrade `/connect/{session_id}` to a WebSocket, refusing unknown ids
/// before the handshake completes.
///
/// The upgrade comes in as a `Result` so the session lookup runs first:
/// an unknown id is a 404 with a JSON body even when the request is not a
/// valid upgrade to begin with.
async fn ws_handler(
    Path(session_id): Path<SessionId>,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(session) = state.registry.get(&session_id) else {
        warn!(%session_id, "refused connect for unknown session");
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Session not found." })),
        )
            .into_response();
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| run_ws_session(socket, session, state)),
        Err(rejection) => rejection.into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
