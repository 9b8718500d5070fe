// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, CORS, the bearer-token middleware, and shared state.
//! `/health` is public; everything else sits behind auth.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderValue;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use tidings_config::model::GatewayConfig;
use tidings_core::TidingsError;
use tidings_core::traits::Adapter;
use tidings_dialogue::DialogueManager;
use tidings_memory::UserMemoryStore;
use tidings_pipeline::Orchestrator;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub dialogue: Arc<DialogueManager>,
    pub memory: Arc<UserMemoryStore>,
    /// Adapters surfaced in the health summary.
    pub adapters: Vec<Arc<dyn Adapter>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        dialogue: Arc<DialogueManager>,
        memory: Arc<UserMemoryStore>,
        adapters: Vec<Arc<dyn Adapter>>,
    ) -> Self {
        Self {
            orchestrator,
            dialogue,
            memory,
            adapters,
            start_time: Instant::now(),
        }
    }
}

/// Builds the full router with middleware applied.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };

    // Unauthenticated public routes.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    // Routes requiring authentication.
    let api_routes = Router::new()
        .route("/pipeline/process", post(handlers::post_pipeline_process))
        .route("/pipeline/quick", post(handlers::post_pipeline_quick))
        .route("/pipeline/status/{run_id}", get(handlers::get_pipeline_status))
        .route("/chat", post(handlers::post_chat))
        .route(
            "/chat/{session_id}",
            get(handlers::get_chat_history).delete(handlers::delete_chat_session),
        )
        .route(
            "/user/{user_id}/profile",
            get(handlers::get_user_profile).put(handlers::put_user_profile),
        )
        .route(
            "/user/{user_id}/interaction",
            post(handlers::post_user_interaction),
        )
        .route("/user/{user_id}/memory", axum::routing::delete(handlers::delete_user_memory))
        .layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    public_routes.merge(api_routes).layer(cors_layer(config))
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Binds and serves until `shutdown` resolves.
pub async fn start_server(
    config: &GatewayConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), TidingsError> {
    let router = build_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TidingsError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TidingsError::Internal(format!("server error: {e}")))
}
