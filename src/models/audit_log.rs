//! Modelo de AuditLogEntry
//!
//! Registro inmutable: se inserta, nunca se actualiza ni se borra.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::models::request::RequestKind;
use crate::models::user::UserRole;

/// Tipo de entidad auditada - mapea al ENUM audit_entity_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "audit_entity_type")]
pub enum EntityType {
    User,
    Vehicle,
    FuelRequest,
    MaintenanceRequest,
    ConditionUpdate,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "User",
            EntityType::Vehicle => "Vehicle",
            EntityType::FuelRequest => "FuelRequest",
            EntityType::MaintenanceRequest => "MaintenanceRequest",
            EntityType::ConditionUpdate => "ConditionUpdate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Some(EntityType::User),
            "vehicle" | "vehicles" => Some(EntityType::Vehicle),
            other => RequestKind::parse(other).map(EntityType::from),
        }
    }
}

impl From<RequestKind> for EntityType {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Fuel => EntityType::FuelRequest,
            RequestKind::Maintenance => EntityType::MaintenanceRequest,
            RequestKind::Condition => EntityType::ConditionUpdate,
        }
    }
}

/// AuditLogEntry - mapea a la tabla audit_logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: String,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor_id: Uuid,
    pub actor_role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Entrada pendiente de sellar con id y marca de tiempo
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: String,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor_id: Uuid,
    pub actor_role: UserRole,
}

impl NewAuditEntry {
    pub fn new(entity_type: EntityType, entity_id: Uuid, action: &str, actor_id: Uuid, actor_role: UserRole) -> Self {
        Self {
            entity_type,
            entity_id,
            action: action.to_string(),
            field_changed: None,
            old_value: None,
            new_value: None,
            actor_id,
            actor_role,
        }
    }

    pub fn with_change(mut self, field: &str, old_value: Option<String>, new_value: Option<String>) -> Self {
        self.field_changed = Some(field.to_string());
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn seal(self, at: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: self.action,
            field_changed: self.field_changed,
            old_value: self.old_value,
            new_value: self.new_value,
            actor_id: self.actor_id,
            actor_role: self.actor_role,
            created_at: at,
        }
    }
}

/// Filtros de consulta de la auditoría (offset/limit, más reciente primero)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl AuditQuery {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.entity_type.map_or(true, |t| t == entry.entity_type)
            && self.entity_id.map_or(true, |id| id == entry.entity_id)
            && self.actor_id.map_or(true, |id| id == entry.actor_id)
            && self.from.map_or(true, |from| entry.created_at >= from)
            && self.to.map_or(true, |to| entry.created_at <= to)
    }
}

/// Página de auditoría
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub has_more: bool,
}
