use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::common_dto::{ApiResponse, ListResponse};
use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest, VehicleListQuery};
use crate::middleware::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::auth::Principal;
use crate::models::vehicle::Vehicle;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle).get(list_vehicles))
        .route("/:id", get(get_vehicle).patch(update_vehicle).delete(delete_vehicle))
}

async fn create_vehicle(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateVehicleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Vehicle>>)> {
    let vehicle = VehicleController::new(&state).create(&principal, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(vehicle, "Vehicle created")),
    ))
}

async fn list_vehicles(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VehicleListQuery>,
) -> AppResult<Json<ApiResponse<ListResponse<Vehicle>>>> {
    let vehicles = VehicleController::new(&state).list(&principal, query).await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

async fn get_vehicle(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let vehicle = VehicleController::new(&state).get(&principal, id).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

async fn update_vehicle(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateVehicleRequest>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let vehicle = VehicleController::new(&state).update(&principal, id, request).await?;
    Ok(Json(ApiResponse::success_with_message(vehicle, "Vehicle updated")))
}

async fn delete_vehicle(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    VehicleController::new(&state).delete(&principal, id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Vehicle deleted"
    })))
}
