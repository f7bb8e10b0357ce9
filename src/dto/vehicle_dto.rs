use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::vehicle::{VehicleCondition, VehicleFilters, VehiclePatch, VehicleStatus};
use crate::utils::errors::{validation_error, AppResult};
use crate::utils::validation::{validate_license_plate, validate_not_empty};

use super::common_dto::{clamp_limit, clamp_offset};

// Request para crear un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[serde(alias = "license_plate")]
    #[validate(custom = "validate_license_plate")]
    pub plate_number: String,
    #[validate(custom = "validate_not_empty", length(max = 100))]
    pub model: String,
    #[validate(length(max = 40))]
    pub color: Option<String>,
    /// Condición inicial; después sólo cambia por ConditionUpdate aprobada
    pub condition: Option<VehicleCondition>,
    /// Obligatorio para admin; un owner siempre registra a su nombre
    pub owner_id: Option<Uuid>,
}

// Request para actualizar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(custom = "validate_not_empty", length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 40))]
    pub color: Option<String>,
    pub status: Option<VehicleStatus>,
    pub owner_id: Option<Uuid>,
    /// Sólo para rechazarlo con un mensaje claro
    pub condition: Option<serde_json::Value>,
}

impl UpdateVehicleRequest {
    pub fn into_patch(self) -> AppResult<VehiclePatch> {
        if self.condition.is_some() {
            return Err(validation_error(
                "condition",
                "condition changes only through an approved ConditionUpdate",
            ));
        }
        let patch = VehiclePatch {
            model: self.model.map(|m| m.trim().to_string()),
            color: self.color.map(|c| c.trim().to_string()),
            status: self.status,
            owner_id: self.owner_id,
        };
        if patch.is_empty() {
            return Err(validation_error("body", "no updatable field present"));
        }
        Ok(patch)
    }
}

// Query de GET /vehicles
#[derive(Debug, Default, Deserialize)]
pub struct VehicleListQuery {
    pub status: Option<VehicleStatus>,
    pub condition: Option<VehicleCondition>,
    pub owner_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl VehicleListQuery {
    pub fn into_filters(self) -> VehicleFilters {
        VehicleFilters {
            owner_id: self.owner_id,
            status: self.status,
            condition: self.condition,
            limit: clamp_limit(self.limit, 50, 100),
            offset: clamp_offset(self.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::AppError;
    use serde_json::json;

    #[test]
    fn test_patch_rejects_condition() {
        let body: UpdateVehicleRequest = serde_json::from_value(json!({"condition": "Poor"})).unwrap();
        assert!(matches!(body.into_patch(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let body: UpdateVehicleRequest = serde_json::from_value(json!({})).unwrap();
        assert!(body.into_patch().is_err());
    }

    #[test]
    fn test_create_accepts_license_plate_alias() {
        let body: CreateVehicleRequest =
            serde_json::from_value(json!({"license_plate": "ab-123", "model": "Kangoo"})).unwrap();
        assert!(body.validate().is_ok());
        assert_eq!(body.plate_number, "ab-123");
    }
}
