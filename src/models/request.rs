//! Modelos de solicitudes
//!
//! FuelRequest, MaintenanceRequest y ConditionUpdate comparten ciclo de vida.
//! El grafo de transiciones de cada tipo vive aquí y es la única fuente de
//! verdad sobre qué estados son alcanzables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::models::vehicle::VehicleCondition;

/// Tipo de solicitud
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequestKind {
    #[serde(rename = "FuelRequest")]
    Fuel,
    #[serde(rename = "MaintenanceRequest")]
    Maintenance,
    #[serde(rename = "ConditionUpdate")]
    Condition,
}

impl RequestKind {
    pub const ALL: [RequestKind; 3] = [RequestKind::Fuel, RequestKind::Maintenance, RequestKind::Condition];

    /// Nombre de la entidad tal como aparece en la auditoría
    pub fn entity_type(&self) -> &'static str {
        match self {
            RequestKind::Fuel => "FuelRequest",
            RequestKind::Maintenance => "MaintenanceRequest",
            RequestKind::Condition => "ConditionUpdate",
        }
    }

    /// Segmento de ruta en /requests/{type}
    pub fn path_segment(&self) -> &'static str {
        match self {
            RequestKind::Fuel => "fuel",
            RequestKind::Maintenance => "maintenance",
            RequestKind::Condition => "condition",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            RequestKind::Fuel => "fuel_requests",
            RequestKind::Maintenance => "maintenance_requests",
            RequestKind::Condition => "condition_updates",
        }
    }

    /// Acepta el segmento de ruta, el nombre de la tabla o el nombre de la entidad
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fuel" | "fuel_request" | "fuel_requests" | "fuelrequest" => Some(RequestKind::Fuel),
            "maintenance" | "maintenance_request" | "maintenance_requests" | "maintenancerequest" => {
                Some(RequestKind::Maintenance)
            }
            "condition" | "condition_update" | "condition_updates" | "conditionupdate" => {
                Some(RequestKind::Condition)
            }
            _ => None,
        }
    }

    pub fn transitions(&self) -> &'static [Transition] {
        match self {
            RequestKind::Fuel | RequestKind::Condition => APPROVAL_GRAPH,
            RequestKind::Maintenance => MAINTENANCE_GRAPH,
        }
    }

    /// Arista `from -> to` del grafo, si existe
    pub fn find_transition(&self, from: RequestStatus, to: RequestStatus) -> Option<&'static Transition> {
        self.transitions().iter().find(|t| t.from == from && t.to == to)
    }

    pub fn is_terminal(&self, status: RequestStatus) -> bool {
        !self.transitions().iter().any(|t| t.from == status)
    }

    /// Estados alcanzables desde `pending` siguiendo el grafo
    pub fn reachable_statuses(&self) -> Vec<RequestStatus> {
        let mut reached = vec![RequestStatus::Pending];
        let mut cursor = 0;
        while cursor < reached.len() {
            let current = reached[cursor];
            for t in self.transitions().iter().filter(|t| t.from == current) {
                if !reached.contains(&t.to) {
                    reached.push(t.to);
                }
            }
            cursor += 1;
        }
        reached
    }
}

/// Estado de una solicitud - mapea al ENUM request_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    InProgress,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "in_progress" => Some(RequestStatus::InProgress),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }
}

/// Acción que nombra una arista del grafo (se registra en la auditoría)
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Approve,
    Reject,
    Start,
    Complete,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Approve => "approve",
            TransitionAction::Reject => "reject",
            TransitionAction::Start => "start",
            TransitionAction::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub action: TransitionAction,
}

const fn edge(from: RequestStatus, to: RequestStatus, action: TransitionAction) -> Transition {
    Transition { from, to, action }
}

/// FuelRequest y ConditionUpdate
const APPROVAL_GRAPH: &[Transition] = &[
    edge(RequestStatus::Pending, RequestStatus::Approved, TransitionAction::Approve),
    edge(RequestStatus::Pending, RequestStatus::Rejected, TransitionAction::Reject),
];

/// MaintenanceRequest: además de aprobar/rechazar, se ejecuta y se completa.
/// Un mantenimiento aprobado todavía puede cancelarse (rechazarse).
const MAINTENANCE_GRAPH: &[Transition] = &[
    edge(RequestStatus::Pending, RequestStatus::Approved, TransitionAction::Approve),
    edge(RequestStatus::Pending, RequestStatus::Rejected, TransitionAction::Reject),
    edge(RequestStatus::Approved, RequestStatus::InProgress, TransitionAction::Start),
    edge(RequestStatus::Approved, RequestStatus::Rejected, TransitionAction::Reject),
    edge(RequestStatus::InProgress, RequestStatus::Completed, TransitionAction::Complete),
];

/// Prioridad de mantenimiento - mapea al ENUM maintenance_priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "maintenance_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaintenancePriority {
    Low,
    Medium,
    High,
}

/// FuelRequest - mapea a la tabla fuel_requests
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FuelRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub vehicle_id: Uuid,
    pub quantity_litres: Decimal,
    pub reason: String,
    pub reimbursement_bank: Option<String>,
    pub reimbursement_account: Option<String>,
    pub status: RequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// MaintenanceRequest - mapea a la tabla maintenance_requests
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub vehicle_id: Uuid,
    pub issue_description: String,
    pub priority: MaintenancePriority,
    pub estimated_cost: Option<Decimal>,
    pub status: RequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ConditionUpdate - mapea a la tabla condition_updates
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConditionUpdate {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub vehicle_id: Uuid,
    pub condition: VehicleCondition,
    pub note: Option<String>,
    pub status: RequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cualquier solicitud sujeta al ciclo de vida
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServiceRequest {
    #[serde(rename = "FuelRequest")]
    Fuel(FuelRequest),
    #[serde(rename = "MaintenanceRequest")]
    Maintenance(MaintenanceRequest),
    #[serde(rename = "ConditionUpdate")]
    Condition(ConditionUpdate),
}

impl ServiceRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ServiceRequest::Fuel(_) => RequestKind::Fuel,
            ServiceRequest::Maintenance(_) => RequestKind::Maintenance,
            ServiceRequest::Condition(_) => RequestKind::Condition,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ServiceRequest::Fuel(r) => r.id,
            ServiceRequest::Maintenance(r) => r.id,
            ServiceRequest::Condition(r) => r.id,
        }
    }

    pub fn status(&self) -> RequestStatus {
        match self {
            ServiceRequest::Fuel(r) => r.status,
            ServiceRequest::Maintenance(r) => r.status,
            ServiceRequest::Condition(r) => r.status,
        }
    }

    /// Usuario que creó la solicitud (requester o reporter)
    pub fn owner_id(&self) -> Uuid {
        match self {
            ServiceRequest::Fuel(r) => r.requester_id,
            ServiceRequest::Maintenance(r) => r.requester_id,
            ServiceRequest::Condition(r) => r.reporter_id,
        }
    }

    pub fn vehicle_id(&self) -> Uuid {
        match self {
            ServiceRequest::Fuel(r) => r.vehicle_id,
            ServiceRequest::Maintenance(r) => r.vehicle_id,
            ServiceRequest::Condition(r) => r.vehicle_id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ServiceRequest::Fuel(r) => r.created_at,
            ServiceRequest::Maintenance(r) => r.created_at,
            ServiceRequest::Condition(r) => r.created_at,
        }
    }

    /// Aplica un nuevo estado en memoria (el store decide si la escritura procede)
    pub fn set_status(&mut self, status: RequestStatus, reviewer: Uuid, at: DateTime<Utc>) {
        match self {
            ServiceRequest::Fuel(r) => {
                r.status = status;
                r.reviewed_by = Some(reviewer);
                r.updated_at = at;
            }
            ServiceRequest::Maintenance(r) => {
                r.status = status;
                r.reviewed_by = Some(reviewer);
                r.updated_at = at;
            }
            ServiceRequest::Condition(r) => {
                r.status = status;
                r.reviewed_by = Some(reviewer);
                r.updated_at = at;
            }
        }
    }
}

impl From<FuelRequest> for ServiceRequest {
    fn from(r: FuelRequest) -> Self {
        ServiceRequest::Fuel(r)
    }
}

impl From<MaintenanceRequest> for ServiceRequest {
    fn from(r: MaintenanceRequest) -> Self {
        ServiceRequest::Maintenance(r)
    }
}

impl From<ConditionUpdate> for ServiceRequest {
    fn from(r: ConditionUpdate) -> Self {
        ServiceRequest::Condition(r)
    }
}

/// Filtros para listados de solicitudes
#[derive(Debug, Clone, Default)]
pub struct RequestFilters {
    pub status: Option<RequestStatus>,
    pub vehicle_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuel_and_condition_only_reach_approval_states() {
        for kind in [RequestKind::Fuel, RequestKind::Condition] {
            let reachable = kind.reachable_statuses();
            assert_eq!(reachable.len(), 3);
            assert!(!reachable.contains(&RequestStatus::InProgress));
            assert!(!reachable.contains(&RequestStatus::Completed));
            assert!(kind.is_terminal(RequestStatus::Approved));
            assert!(kind.is_terminal(RequestStatus::Rejected));
        }
    }

    #[test]
    fn test_maintenance_graph() {
        let kind = RequestKind::Maintenance;
        assert_eq!(kind.reachable_statuses().len(), 5);
        assert!(kind.find_transition(RequestStatus::Pending, RequestStatus::InProgress).is_none());
        assert!(kind.find_transition(RequestStatus::Rejected, RequestStatus::Approved).is_none());
        assert_eq!(
            kind.find_transition(RequestStatus::Approved, RequestStatus::Rejected).map(|t| t.action),
            Some(TransitionAction::Reject)
        );
        assert_eq!(
            kind.find_transition(RequestStatus::InProgress, RequestStatus::Completed).map(|t| t.action),
            Some(TransitionAction::Complete)
        );
        assert!(kind.is_terminal(RequestStatus::Completed));
        assert!(!kind.is_terminal(RequestStatus::Approved));
    }

    #[test]
    fn test_no_edge_leaves_a_terminal_state_or_returns_to_pending() {
        for kind in RequestKind::ALL {
            for t in kind.transitions() {
                assert_ne!(t.to, RequestStatus::Pending);
                assert!(!matches!(t.from, RequestStatus::Rejected | RequestStatus::Completed));
            }
        }
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(RequestKind::parse("fuel"), Some(RequestKind::Fuel));
        assert_eq!(RequestKind::parse("FuelRequest"), Some(RequestKind::Fuel));
        assert_eq!(RequestKind::parse("maintenance-requests"), Some(RequestKind::Maintenance));
        assert_eq!(RequestKind::parse("condition_updates"), Some(RequestKind::Condition));
        assert_eq!(RequestKind::parse("payments"), None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(RequestStatus::parse("in-progress"), Some(RequestStatus::InProgress));
        assert_eq!(RequestStatus::parse("APPROVED"), Some(RequestStatus::Approved));
        assert_eq!(RequestStatus::parse("reopened"), None);
    }
}
