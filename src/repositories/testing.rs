//! Store de pruebas: delega en `InMemoryStore` e inyecta fallos.
//!
//! Un fallo de auditoría rechaza la escritura completa, igual que una
//! transacción de PostgreSQL que no llega a hacer commit.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::{FleetStore, InMemoryStore};
use crate::models::audit_log::{AuditLogEntry, AuditQuery};
use crate::models::request::{ConditionUpdate, RequestFilters, RequestKind, RequestStatus, ServiceRequest};
use crate::models::user::{User, UserFilters, UserStatus};
use crate::models::vehicle::{Vehicle, VehicleCondition, VehicleFilters, VehiclePatch};
use crate::utils::errors::{AppError, AppResult};

pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    vehicles_down: bool,
    audit_down: bool,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            vehicles_down: false,
            audit_down: false,
        }
    }

    /// `set_vehicle_condition` falla siempre
    pub fn with_vehicles_down(mut self) -> Self {
        self.vehicles_down = true;
        self
    }

    /// Toda escritura que lleve auditoría falla sin aplicar nada
    pub fn with_audit_down(mut self) -> Self {
        self.audit_down = true;
        self
    }

    fn check_audit(&self, audit: &[AuditLogEntry]) -> AppResult<()> {
        if self.audit_down && !audit.is_empty() {
            return Err(AppError::Dependency("audit_logs unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FleetStore for FaultyStore {
    async fn health_check(&self) -> AppResult<()> {
        self.inner.health_check().await
    }
    async fn insert_user(&self, user: &User, audit: &[AuditLogEntry]) -> AppResult<User> {
        self.check_audit(audit)?;
        self.inner.insert_user(user, audit).await
    }
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        self.inner.get_user(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
    async fn list_users(&self, filters: &UserFilters) -> AppResult<Vec<User>> {
        self.inner.list_users(filters).await
    }
    async fn count_active_admins(&self) -> AppResult<i64> {
        self.inner.count_active_admins().await
    }
    async fn update_user_status(
        &self,
        id: Uuid,
        status: UserStatus,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<User>> {
        self.check_audit(audit)?;
        self.inner.update_user_status(id, status, audit).await
    }
    async fn soft_delete_user(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool> {
        self.check_audit(audit)?;
        self.inner.soft_delete_user(id, audit).await
    }
    async fn insert_vehicle(&self, vehicle: &Vehicle, audit: &[AuditLogEntry]) -> AppResult<Vehicle> {
        self.check_audit(audit)?;
        self.inner.insert_vehicle(vehicle, audit).await
    }
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        self.inner.get_vehicle(id).await
    }
    async fn find_vehicle_by_plate(&self, plate_number: &str) -> AppResult<Option<Vehicle>> {
        self.inner.find_vehicle_by_plate(plate_number).await
    }
    async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
        self.inner.list_vehicles(filters).await
    }
    async fn update_vehicle(
        &self,
        id: Uuid,
        patch: &VehiclePatch,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<Vehicle>> {
        self.check_audit(audit)?;
        self.inner.update_vehicle(id, patch, audit).await
    }
    async fn set_vehicle_condition(
        &self,
        id: Uuid,
        condition: VehicleCondition,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<Vehicle>> {
        if self.vehicles_down {
            return Err(AppError::Dependency("vehicles table unavailable".to_string()));
        }
        self.check_audit(audit)?;
        self.inner.set_vehicle_condition(id, condition, audit).await
    }
    async fn soft_delete_vehicle(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool> {
        self.check_audit(audit)?;
        self.inner.soft_delete_vehicle(id, audit).await
    }
    async fn insert_request(&self, request: &ServiceRequest, audit: &AuditLogEntry) -> AppResult<ServiceRequest> {
        self.check_audit(std::slice::from_ref(audit))?;
        self.inner.insert_request(request, audit).await
    }
    async fn get_request(&self, kind: RequestKind, id: Uuid) -> AppResult<Option<ServiceRequest>> {
        self.inner.get_request(kind, id).await
    }
    async fn list_requests(&self, kind: RequestKind, filters: &RequestFilters) -> AppResult<Vec<ServiceRequest>> {
        self.inner.list_requests(kind, filters).await
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
        self.check_audit(std::slice::from_ref(audit))?;
        self.inner.transition_request(kind, id, expected, to, reviewer, audit).await
    }
    async fn latest_approved_conditions(&self) -> AppResult<Vec<ConditionUpdate>> {
        self.inner.latest_approved_conditions().await
    }
    async fn append_audit(&self, entry: &AuditLogEntry) -> AppResult<AuditLogEntry> {
        self.check_audit(std::slice::from_ref(entry))?;
        self.inner.append_audit(entry).await
    }
    async fn query_audit(&self, query: &AuditQuery) -> AppResult<(Vec<AuditLogEntry>, i64)> {
        self.inner.query_audit(query).await
    }
}
