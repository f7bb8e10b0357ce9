use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::auth_controller::AuthController;
use crate::dto::common_dto::ApiResponse;
use crate::middleware::extract::ApiJson;
use crate::models::auth::{LoginRequest, LoginResponse, Principal};
use crate::models::user::User;
use crate::state::AppState;
use crate::utils::errors::AppResult;

/// Configura las rutas de autenticación
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let response = AuthController::new(&state).login(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn me(principal: Principal, State(state): State<AppState>) -> AppResult<Json<ApiResponse<User>>> {
    let user = AuthController::new(&state).me(&principal).await?;
    Ok(Json(ApiResponse::success(user)))
}
