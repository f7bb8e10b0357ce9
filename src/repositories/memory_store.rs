//! Entity Store en memoria
//!
//! Implementación de `FleetStore` sobre un único `RwLock`. Todas las
//! escrituras toman el lock de escritura y añaden su auditoría antes de
//! soltarlo, así que ningún lector ve un cambio sin su entrada.
//! Se usa en tests y con `STORE_BACKEND=memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::FleetStore;
use crate::models::audit_log::{AuditLogEntry, AuditQuery};
use crate::models::request::{ConditionUpdate, RequestFilters, RequestKind, RequestStatus, ServiceRequest};
use crate::models::user::{User, UserFilters, UserRole, UserStatus};
use crate::models::vehicle::{Vehicle, VehicleCondition, VehicleFilters, VehiclePatch};
use crate::utils::errors::{conflict_error, AppResult};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    vehicles: HashMap<Uuid, Vehicle>,
    requests: HashMap<(RequestKind, Uuid), ServiceRequest>,
    audit: Vec<AuditLogEntry>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = offset.max(0) as usize;
    let limit = if limit <= 0 { usize::MAX } else { limit as usize };
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl FleetStore for InMemoryStore {
    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User, audit: &[AuditLogEntry]) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(conflict_error("User", "email", &user.email));
        }
        tables.users.insert(user.id, user.clone());
        tables.audit.extend_from_slice(audit);
        Ok(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, filters: &UserFilters) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .filter(|u| filters.role.map_or(true, |r| r == u.role))
            .filter(|u| filters.status.map_or(true, |s| s == u.status))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(users, filters.limit.unwrap_or(0), filters.offset.unwrap_or(0)))
    }

    async fn count_active_admins(&self) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.role == UserRole::Admin && u.is_active())
            .count() as i64)
    }

    async fn update_user_status(
        &self,
        id: Uuid,
        status: UserStatus,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let updated = tables.users.get_mut(&id).filter(|u| u.deleted_at.is_none()).map(|u| {
            u.status = status;
            u.updated_at = Utc::now();
            u.clone()
        });
        if updated.is_some() {
            tables.audit.extend_from_slice(audit);
        }
        Ok(updated)
    }

    async fn soft_delete_user(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            Some(user) => {
                let now = Utc::now();
                user.status = UserStatus::Inactive;
                user.deleted_at = Some(now);
                user.updated_at = now;
                tables.audit.extend_from_slice(audit);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle, audit: &[AuditLogEntry]) -> AppResult<Vehicle> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .vehicles
            .values()
            .any(|v| v.deleted_at.is_none() && v.plate_number == vehicle.plate_number);
        if taken {
            return Err(conflict_error("Vehicle", "plate_number", &vehicle.plate_number));
        }
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        tables.audit.extend_from_slice(audit);
        Ok(vehicle.clone())
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables.vehicles.get(&id).filter(|v| v.deleted_at.is_none()).cloned())
    }

    async fn find_vehicle_by_plate(&self, plate_number: &str) -> AppResult<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .values()
            .find(|v| v.deleted_at.is_none() && v.plate_number == plate_number)
            .cloned())
    }

    async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| v.deleted_at.is_none())
            .filter(|v| filters.owner_id.map_or(true, |o| o == v.owner_id))
            .filter(|v| filters.status.map_or(true, |s| s == v.status))
            .filter(|v| filters.condition.map_or(true, |c| c == v.condition))
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(vehicles, filters.limit, filters.offset))
    }

    async fn update_vehicle(
        &self,
        id: Uuid,
        patch: &VehiclePatch,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<Vehicle>> {
        let mut tables = self.tables.write().await;
        let updated = tables.vehicles.get_mut(&id).filter(|v| v.deleted_at.is_none()).map(|v| {
            if let Some(model) = &patch.model {
                v.model = model.clone();
            }
            if let Some(color) = &patch.color {
                v.color = Some(color.clone());
            }
            if let Some(status) = patch.status {
                v.status = status;
            }
            if let Some(owner_id) = patch.owner_id {
                v.owner_id = owner_id;
            }
            v.updated_at = Utc::now();
            v.clone()
        });
        if updated.is_some() {
            tables.audit.extend_from_slice(audit);
        }
        Ok(updated)
    }

    async fn set_vehicle_condition(
        &self,
        id: Uuid,
        condition: VehicleCondition,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<Vehicle>> {
        let mut tables = self.tables.write().await;
        let updated = tables.vehicles.get_mut(&id).filter(|v| v.deleted_at.is_none()).map(|v| {
            v.condition = condition;
            v.updated_at = Utc::now();
            v.clone()
        });
        if updated.is_some() {
            tables.audit.extend_from_slice(audit);
        }
        Ok(updated)
    }

    async fn soft_delete_vehicle(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.vehicles.get_mut(&id).filter(|v| v.deleted_at.is_none()) {
            Some(vehicle) => {
                let now = Utc::now();
                vehicle.deleted_at = Some(now);
                vehicle.updated_at = now;
                tables.audit.extend_from_slice(audit);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_request(&self, request: &ServiceRequest, audit: &AuditLogEntry) -> AppResult<ServiceRequest> {
        let mut tables = self.tables.write().await;
        tables.requests.insert((request.kind(), request.id()), request.clone());
        tables.audit.push(audit.clone());
        Ok(request.clone())
    }

    async fn get_request(&self, kind: RequestKind, id: Uuid) -> AppResult<Option<ServiceRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.requests.get(&(kind, id)).cloned())
    }

    async fn list_requests(&self, kind: RequestKind, filters: &RequestFilters) -> AppResult<Vec<ServiceRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<ServiceRequest> = tables
            .requests
            .values()
            .filter(|r| r.kind() == kind)
            .filter(|r| filters.status.map_or(true, |s| s == r.status()))
            .filter(|r| filters.vehicle_id.map_or(true, |v| v == r.vehicle_id()))
            .filter(|r| filters.requester_id.map_or(true, |o| o == r.owner_id()))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(page(requests, filters.limit, filters.offset))
    }

    async fn transition_request(
        &self,
        kind: RequestKind,
        id: Uuid,
        expected: RequestStatus,
        to: RequestStatus,
        reviewer: Uuid,
        audit: &AuditLogEntry,
    ) -> AppResult<Option<ServiceRequest>> {
        let mut tables = self.tables.write().await;
        let updated = match tables.requests.get_mut(&(kind, id)) {
            Some(request) if request.status() == expected => {
                request.set_status(to, reviewer, audit.created_at);
                request.clone()
            }
            _ => return Ok(None),
        };
        tables.audit.push(audit.clone());
        Ok(Some(updated))
    }

    async fn latest_approved_conditions(&self) -> AppResult<Vec<ConditionUpdate>> {
        let tables = self.tables.read().await;
        let mut latest: HashMap<Uuid, ConditionUpdate> = HashMap::new();
        for request in tables.requests.values() {
            let ServiceRequest::Condition(update) = request else {
                continue;
            };
            if update.status != RequestStatus::Approved {
                continue;
            }
            let live_vehicle = tables
                .vehicles
                .get(&update.vehicle_id)
                .map_or(false, |v| v.deleted_at.is_none());
            if !live_vehicle {
                continue;
            }
            let newer = latest
                .get(&update.vehicle_id)
                .map_or(true, |current| (update.updated_at, update.id) > (current.updated_at, current.id));
            if newer {
                latest.insert(update.vehicle_id, update.clone());
            }
        }
        let mut updates: Vec<ConditionUpdate> = latest.into_values().collect();
        updates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(updates)
    }

    async fn append_audit(&self, entry: &AuditLogEntry) -> AppResult<AuditLogEntry> {
        let mut tables = self.tables.write().await;
        tables.audit.push(entry.clone());
        Ok(entry.clone())
    }

    async fn query_audit(&self, query: &AuditQuery) -> AppResult<(Vec<AuditLogEntry>, i64)> {
        let tables = self.tables.read().await;
        let mut entries: Vec<AuditLogEntry> = tables.audit.iter().filter(|e| query.matches(e)).cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = entries.len() as i64;
        Ok((page(entries, query.limit, query.offset), total))
    }
}
