use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::StreamExt;

use crate::controllers::audit_controller::AuditController;
use crate::dto::audit_dto::AuditListQuery;
use crate::dto::common_dto::ApiResponse;
use crate::middleware::extract::ApiQuery;
use crate::models::audit_log::AuditPage;
use crate::models::auth::Principal;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

/// Sólo lectura: no existe ninguna ruta que modifique la auditoría
pub fn create_audit_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_audit))
        .route("/export", get(export_audit))
}

async fn list_audit(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AuditListQuery>,
) -> AppResult<Json<ApiResponse<AuditPage>>> {
    let page = AuditController::new(&state).list(&principal, query).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// NDJSON, más reciente primero, leído página a página
async fn export_audit(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AuditListQuery>,
) -> AppResult<Response> {
    let entries = AuditController::new(&state).export(&principal, query)?;
    let lines = entries.map(|entry| {
        entry.and_then(|entry| {
            let mut line = serde_json::to_vec(&entry)
                .map_err(|e| AppError::Internal(format!("Failed to serialize audit entry: {}", e)))?;
            line.push(b'\n');
            Ok::<_, AppError>(Bytes::from(line))
        })
    });
    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}
