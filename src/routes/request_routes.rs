use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::request_controller::RequestController;
use crate::dto::common_dto::{ApiResponse, ListResponse};
use crate::dto::request_dto::{RequestListQuery, TransitionRequestBody};
use crate::middleware::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::auth::Principal;
use crate::models::request::{RequestKind, ServiceRequest};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub fn create_request_router() -> Router<AppState> {
    Router::new()
        .route("/:kind", get(list_requests).post(create_request))
        .route("/:kind/:id", get(get_request).patch(transition_request))
}

fn parse_kind(raw: &str) -> AppResult<RequestKind> {
    RequestKind::parse(raw).ok_or_else(|| AppError::NotFound(format!("Unknown request type '{}'", raw)))
}

async fn create_request(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> AppResult<(StatusCode, Json<ApiResponse<ServiceRequest>>)> {
    let kind = parse_kind(&kind)?;
    let created = RequestController::new(&state).create(&principal, kind, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(created, format!("{} created", kind.entity_type()))),
    ))
}

async fn list_requests(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<RequestListQuery>,
) -> AppResult<Json<ApiResponse<ListResponse<ServiceRequest>>>> {
    let kind = parse_kind(&kind)?;
    let list = RequestController::new(&state).list(&principal, kind, query).await?;
    Ok(Json(ApiResponse::success(list)))
}

async fn get_request(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, Uuid)>,
) -> AppResult<Json<ApiResponse<ServiceRequest>>> {
    let kind = parse_kind(&kind)?;
    let request = RequestController::new(&state).get(&principal, kind, id).await?;
    Ok(Json(ApiResponse::success(request)))
}

async fn transition_request(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, Uuid)>,
    ApiJson(body): ApiJson<TransitionRequestBody>,
) -> AppResult<Json<ApiResponse<ServiceRequest>>> {
    let kind = parse_kind(&kind)?;
    let updated = RequestController::new(&state)
        .transition(&principal, kind, id, body)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
