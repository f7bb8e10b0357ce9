use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::request::{
    ConditionUpdate, FuelRequest, MaintenancePriority, MaintenanceRequest, RequestFilters, RequestKind,
    RequestStatus, ServiceRequest,
};
use crate::models::vehicle::VehicleCondition;
use crate::utils::errors::{bad_request_error, AppResult};
use crate::utils::validation::{validate_fuel_quantity, validate_non_negative, validate_not_empty};

use super::common_dto::{clamp_limit, clamp_offset};

pub const MAX_REQUEST_PAGE: i64 = 100;

// Request para crear una FuelRequest
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFuelRequest {
    pub vehicle_id: Uuid,
    #[serde(alias = "litres", alias = "quantity")]
    #[validate(custom = "validate_fuel_quantity")]
    pub quantity_litres: Decimal,
    #[validate(custom = "validate_not_empty", length(max = 500))]
    pub reason: String,
    #[validate(length(max = 120))]
    pub reimbursement_bank: Option<String>,
    #[validate(length(max = 64))]
    pub reimbursement_account: Option<String>,
}

// Request para crear una MaintenanceRequest
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaintenanceRequest {
    pub vehicle_id: Uuid,
    #[validate(custom = "validate_not_empty", length(max = 2000))]
    pub issue_description: String,
    pub priority: Option<MaintenancePriority>,
    #[validate(custom = "validate_non_negative")]
    pub estimated_cost: Option<Decimal>,
}

// Request para crear una ConditionUpdate
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConditionUpdate {
    pub vehicle_id: Uuid,
    pub condition: VehicleCondition,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

fn parse_body<T: DeserializeOwned + Validate>(body: serde_json::Value) -> AppResult<T> {
    let parsed: T = serde_json::from_value(body).map_err(|e| bad_request_error(&format!("Invalid body: {}", e)))?;
    parsed.validate()?;
    Ok(parsed)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Construye la solicitud `pending` del tipo indicado a partir del cuerpo JSON
pub fn parse_create_body(
    kind: RequestKind,
    body: serde_json::Value,
    requester_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<ServiceRequest> {
    let request = match kind {
        RequestKind::Fuel => {
            let body: CreateFuelRequest = parse_body(body)?;
            ServiceRequest::Fuel(FuelRequest {
                id: Uuid::new_v4(),
                requester_id,
                vehicle_id: body.vehicle_id,
                quantity_litres: body.quantity_litres,
                reason: body.reason.trim().to_string(),
                reimbursement_bank: blank_to_none(body.reimbursement_bank),
                reimbursement_account: blank_to_none(body.reimbursement_account),
                status: RequestStatus::Pending,
                reviewed_by: None,
                created_at: now,
                updated_at: now,
            })
        }
        RequestKind::Maintenance => {
            let body: CreateMaintenanceRequest = parse_body(body)?;
            ServiceRequest::Maintenance(MaintenanceRequest {
                id: Uuid::new_v4(),
                requester_id,
                vehicle_id: body.vehicle_id,
                issue_description: body.issue_description.trim().to_string(),
                priority: body.priority.unwrap_or(MaintenancePriority::Medium),
                estimated_cost: body.estimated_cost,
                status: RequestStatus::Pending,
                reviewed_by: None,
                created_at: now,
                updated_at: now,
            })
        }
        RequestKind::Condition => {
            let body: CreateConditionUpdate = parse_body(body)?;
            ServiceRequest::Condition(ConditionUpdate {
                id: Uuid::new_v4(),
                reporter_id: requester_id,
                vehicle_id: body.vehicle_id,
                condition: body.condition,
                note: blank_to_none(body.note),
                status: RequestStatus::Pending,
                reviewed_by: None,
                created_at: now,
                updated_at: now,
            })
        }
    };
    Ok(request)
}

// Body de PATCH /requests/:kind/:id
#[derive(Debug, Deserialize)]
pub struct TransitionRequestBody {
    pub status: String,
    #[serde(rename = "expectedCurrentStatus", alias = "expected_current_status")]
    pub expected_current_status: String,
}

impl TransitionRequestBody {
    /// (esperado, nuevo)
    pub fn statuses(&self) -> AppResult<(RequestStatus, RequestStatus)> {
        let parse = |field: &str, value: &str| {
            RequestStatus::parse(value)
                .ok_or_else(|| bad_request_error(&format!("Unknown {} '{}'", field, value)))
        };
        Ok((
            parse("expectedCurrentStatus", &self.expected_current_status)?,
            parse("status", &self.status)?,
        ))
    }
}

// Query de GET /requests/:kind
#[derive(Debug, Default, Deserialize)]
pub struct RequestListQuery {
    pub status: Option<String>,
    pub vehicle_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl RequestListQuery {
    pub fn into_filters(self) -> AppResult<RequestFilters> {
        let status = match self.status.as_deref() {
            Some(raw) => {
                Some(RequestStatus::parse(raw).ok_or_else(|| bad_request_error(&format!("Unknown status '{}'", raw)))?)
            }
            None => None,
        };
        Ok(RequestFilters {
            status,
            vehicle_id: self.vehicle_id,
            requester_id: self.requester_id,
            limit: clamp_limit(self.limit, 50, MAX_REQUEST_PAGE),
            offset: clamp_offset(self.offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::AppError;
    use serde_json::json;

    #[test]
    fn test_fuel_body_builds_pending_request() {
        let requester = Uuid::new_v4();
        let vehicle = Uuid::new_v4();
        let request = parse_create_body(
            RequestKind::Fuel,
            json!({"vehicle_id": vehicle, "litres": 20, "reason": "trip"}),
            requester,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(request.status(), RequestStatus::Pending);
        assert_eq!(request.owner_id(), requester);
        assert_eq!(request.vehicle_id(), vehicle);
    }

    #[test]
    fn test_missing_or_invalid_fields_are_rejected() {
        let vehicle = Uuid::new_v4();
        let missing = parse_create_body(RequestKind::Fuel, json!({"vehicle_id": vehicle}), Uuid::new_v4(), Utc::now());
        assert!(matches!(missing, Err(AppError::BadRequest(_))));

        let zero = parse_create_body(
            RequestKind::Fuel,
            json!({"vehicle_id": vehicle, "quantity_litres": 0, "reason": "trip"}),
            Uuid::new_v4(),
            Utc::now(),
        );
        assert!(matches!(zero, Err(AppError::Validation(_))));

        let blank = parse_create_body(
            RequestKind::Maintenance,
            json!({"vehicle_id": vehicle, "issue_description": "  "}),
            Uuid::new_v4(),
            Utc::now(),
        );
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let negative = parse_create_body(
            RequestKind::Maintenance,
            json!({"vehicle_id": vehicle, "issue_description": "oil", "estimated_cost": -1}),
            Uuid::new_v4(),
            Utc::now(),
        );
        assert!(matches!(negative, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_condition_body_requires_known_condition() {
        let vehicle = Uuid::new_v4();
        let ok = parse_create_body(
            RequestKind::Condition,
            json!({"vehicle_id": vehicle, "condition": "Poor"}),
            Uuid::new_v4(),
            Utc::now(),
        );
        assert!(ok.is_ok());
        let bad = parse_create_body(
            RequestKind::Condition,
            json!({"vehicle_id": vehicle, "condition": "Totaled"}),
            Uuid::new_v4(),
            Utc::now(),
        );
        assert!(matches!(bad, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_transition_body_accepts_both_spellings() {
        let camel: TransitionRequestBody =
            serde_json::from_value(json!({"status": "approved", "expectedCurrentStatus": "pending"})).unwrap();
        let snake: TransitionRequestBody =
            serde_json::from_value(json!({"status": "in-progress", "expected_current_status": "approved"})).unwrap();
        assert_eq!(camel.statuses().unwrap(), (RequestStatus::Pending, RequestStatus::Approved));
        assert_eq!(snake.statuses().unwrap(), (RequestStatus::Approved, RequestStatus::InProgress));

        let unknown: TransitionRequestBody =
            serde_json::from_value(json!({"status": "archived", "expectedCurrentStatus": "pending"})).unwrap();
        assert!(unknown.statuses().is_err());
    }

    #[test]
    fn test_list_limit_is_capped() {
        let filters = RequestListQuery {
            limit: Some(1000),
            ..RequestListQuery::default()
        }
        .into_filters()
        .unwrap();
        assert_eq!(filters.limit, MAX_REQUEST_PAGE);
        assert_eq!(filters.offset, 0);
    }
}
