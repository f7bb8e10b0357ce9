use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::dto::common_dto::ApiResponse;
use crate::models::auth::Principal;
use crate::services::reconciliation_service::ConditionDrift;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub fn create_reconciliation_router() -> Router<AppState> {
    Router::new()
        .route("/vehicle-conditions", get(vehicle_condition_drift))
        .route("/vehicle-conditions/repair", post(repair_vehicle_conditions))
}

async fn vehicle_condition_drift(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<ConditionDrift>>>> {
    let drift = state.reconciliation.vehicle_condition_drift(&principal).await?;
    Ok(Json(ApiResponse::success(drift)))
}

async fn repair_vehicle_conditions(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<ConditionDrift>>>> {
    let repaired = state.reconciliation.repair(&principal).await?;
    let message = format!("{} vehicle(s) repaired", repaired.len());
    Ok(Json(ApiResponse::success_with_message(repaired, message)))
}
