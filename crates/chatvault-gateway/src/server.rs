// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use chatvault_bus::EventBus;
use chatvault_config::model::ServerConfig;
use chatvault_core::ChatvaultError;
use chatvault_ingest::QueueHandle;
use chatvault_storage::Database;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Archive store (read side).
    pub db: Database,
    /// Event feed for WebSocket clients.
    pub bus: EventBus,
    /// Task submission handle.
    pub queue: QueueHandle,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Build the full route tree for the given state.
///
/// Split out of [`serve`] so tests can drive the router without a socket.
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    // Unauthenticated route for liveness probes.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/tasks", post(handlers::post_tasks).get(handlers::get_tasks))
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/queue", get(handlers::get_queue))
        .route("/chats", get(handlers::get_chats))
        .route(
            "/messages",
            get(handlers::get_messages).delete(handlers::delete_all_messages),
        )
        .route("/messages/{chat_id}/{message_id}", get(handlers::get_message))
        .route("/edits/{chat_id}/{message_id}", get(handlers::get_edits))
        .route("/deleted", get(handlers::get_deleted))
        .route("/stats", get(handlers::get_stats))
        .route("/export", get(handlers::get_export))
        .route(
            "/chats/{chat_id}/messages",
            delete(handlers::delete_chat_messages),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    // WebSocket auth happens during the handshake, not via middleware.
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new();
    }
    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Bind and serve the gateway until `shutdown` fires.
pub async fn serve(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ChatvaultError> {
    let app = router(state).layer(cors_layer(&config.cors_allowed_origins));

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        ChatvaultError::Internal(format!("failed to bind gateway to {addr}: {e}"))
    })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ChatvaultError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_origin_list_builds_default_cors() {
        let _layer = cors_layer(&[]);
        let _layer = cors_layer(&["http://localhost:3000".to_string()]);
    }
}
