use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::user_controller::UserController;
use crate::dto::common_dto::{ApiResponse, ListResponse};
use crate::dto::user_dto::{CreateUserRequest, UpdateUserStatusRequest};
use crate::middleware::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::auth::Principal;
use crate::models::user::{User, UserFilters};
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", get(get_user).delete(delete_user))
        .route("/:id/status", patch(update_user_status))
}

async fn create_user(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let user = UserController::new(&state).create(&principal, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(user, "User created")),
    ))
}

async fn list_users(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<UserFilters>,
) -> AppResult<Json<ApiResponse<ListResponse<User>>>> {
    let users = UserController::new(&state).list(&principal, filters).await?;
    Ok(Json(ApiResponse::success(users)))
}

async fn get_user(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = UserController::new(&state).get(&principal, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

async fn update_user_status(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateUserStatusRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = UserController::new(&state).update_status(&principal, id, request).await?;
    Ok(Json(ApiResponse::success(user)))
}

async fn delete_user(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    UserController::new(&state).delete(&principal, id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "User deleted"
    })))
}
