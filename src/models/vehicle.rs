//! Modelo de Vehicle
//!
//! La matrícula es la clave natural (única). La condición sólo cambia a través
//! de un ConditionUpdate aprobado.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Condición del vehículo - mapea al ENUM vehicle_condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_condition")]
pub enum VehicleCondition {
    Good,
    Fair,
    Poor,
}

impl VehicleCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCondition::Good => "Good",
            VehicleCondition::Fair => "Fair",
            VehicleCondition::Poor => "Poor",
        }
    }
}

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Created,
    Active,
    Inactive,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Created => "created",
            VehicleStatus::Active => "active",
            VehicleStatus::Inactive => "inactive",
        }
    }
}

/// Vehicle - mapea a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub model: String,
    pub color: Option<String>,
    pub condition: VehicleCondition,
    pub status: VehicleStatus,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Cambios parciales sobre un vehículo. La condición no forma parte a propósito.
#[derive(Debug, Clone, Default)]
pub struct VehiclePatch {
    pub model: Option<String>,
    pub color: Option<String>,
    pub status: Option<VehicleStatus>,
    pub owner_id: Option<Uuid>,
}

impl VehiclePatch {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.color.is_none() && self.status.is_none() && self.owner_id.is_none()
    }

    /// Nombres de los campos modificados, para la auditoría
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.model.is_some() {
            fields.push("model");
        }
        if self.color.is_some() {
            fields.push("color");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.owner_id.is_some() {
            fields.push("owner_id");
        }
        fields
    }

    /// (campo, valor anterior, valor nuevo) de cada campo presente
    pub fn changes(&self, current: &Vehicle) -> Vec<(&'static str, Option<String>, Option<String>)> {
        let mut changes = Vec::new();
        if let Some(model) = &self.model {
            changes.push(("model", Some(current.model.clone()), Some(model.clone())));
        }
        if let Some(color) = &self.color {
            changes.push(("color", current.color.clone(), Some(color.clone())));
        }
        if let Some(status) = self.status {
            changes.push((
                "status",
                Some(current.status.as_str().to_string()),
                Some(status.as_str().to_string()),
            ));
        }
        if let Some(owner_id) = self.owner_id {
            changes.push(("owner_id", Some(current.owner_id.to_string()), Some(owner_id.to_string())));
        }
        changes
    }
}

/// Filtros para búsqueda de vehículos
#[derive(Debug, Clone, Default)]
pub struct VehicleFilters {
    pub owner_id: Option<Uuid>,
    pub status: Option<VehicleStatus>,
    pub condition: Option<VehicleCondition>,
    pub limit: i64,
    pub offset: i64,
}
