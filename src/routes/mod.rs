//! Router HTTP
//!
//! Compone los routers por recurso y las capas comunes.

pub mod audit_routes;
pub mod auth_routes;
pub mod reconciliation_routes;
pub mod request_routes;
pub mod user_routes;
pub mod vehicle_routes;

use axum::{extract::State, http::StatusCode, middleware::from_fn_with_state, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::{cors_layer, rate_limit_middleware};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes::auth_routes())
        .nest("/requests", request_routes::create_request_router())
        .nest("/users", user_routes::create_user_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/audit", audit_routes::create_audit_router())
        .nest("/reconciliation", reconciliation_routes::create_reconciliation_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config))
                .layer(CompressionLayer::new())
                .layer(from_fn_with_state(state.clone(), rate_limit_middleware)),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "fleet_manager",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        ),
        Err(e) => {
            tracing::error!("❌ Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "error": e.to_string() })),
            )
        }
    }
}
