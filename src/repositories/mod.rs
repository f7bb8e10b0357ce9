//! Entity Store
//!
//! Interfaz de persistencia de la que depende el núcleo. Toda escritura que
//! cambia una entidad recibe sus entradas de auditoría ya selladas y las
//! persiste en la misma unidad (transacción o lock): o quedan ambas, o
//! ninguna. `transition_request` añade además el compare-and-set de estado.

pub mod memory_store;
pub mod pg_store;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::audit_log::{AuditLogEntry, AuditQuery};
use crate::models::request::{ConditionUpdate, RequestFilters, RequestKind, RequestStatus, ServiceRequest};
use crate::models::user::{User, UserFilters, UserStatus};
use crate::models::vehicle::{Vehicle, VehicleCondition, VehicleFilters, VehiclePatch};
use crate::utils::errors::AppResult;

pub use memory_store::InMemoryStore;
pub use pg_store::PgStore;

#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn health_check(&self) -> AppResult<()>;

    // Users (las lecturas excluyen los borrados lógicos)
    async fn insert_user(&self, user: &User, audit: &[AuditLogEntry]) -> AppResult<User>;
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, filters: &UserFilters) -> AppResult<Vec<User>>;
    async fn count_active_admins(&self) -> AppResult<i64>;
    async fn update_user_status(&self, id: Uuid, status: UserStatus, audit: &[AuditLogEntry])
        -> AppResult<Option<User>>;
    async fn soft_delete_user(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool>;

    // Vehicles (sin fila afectada no se escribe auditoría)
    async fn insert_vehicle(&self, vehicle: &Vehicle, audit: &[AuditLogEntry]) -> AppResult<Vehicle>;
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn find_vehicle_by_plate(&self, plate_number: &str) -> AppResult<Option<Vehicle>>;
    async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>>;
    async fn update_vehicle(&self, id: Uuid, patch: &VehiclePatch, audit: &[AuditLogEntry])
        -> AppResult<Option<Vehicle>>;
    async fn set_vehicle_condition(
        &self,
        id: Uuid,
        condition: VehicleCondition,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<Vehicle>>;
    async fn soft_delete_vehicle(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool>;

    // Requests
    /// Inserta la solicitud junto con su entrada de auditoría `create`
    async fn insert_request(&self, request: &ServiceRequest, audit: &AuditLogEntry) -> AppResult<ServiceRequest>;
    async fn get_request(&self, kind: RequestKind, id: Uuid) -> AppResult<Option<ServiceRequest>>;
    async fn list_requests(&self, kind: RequestKind, filters: &RequestFilters) -> AppResult<Vec<ServiceRequest>>;

    /// `UPDATE … SET status = to WHERE id = id AND status = expected` más la
    /// inserción de `audit`, todo o nada. `None` si ninguna fila cumplió la
    /// precondición (no existe o el estado ya cambió).
    async fn transition_request(
        &self,
        kind: RequestKind,
        id: Uuid,
        expected: RequestStatus,
        to: RequestStatus,
        reviewer: Uuid,
        audit: &AuditLogEntry,
    ) -> AppResult<Option<ServiceRequest>>;

    /// El ConditionUpdate aprobado más reciente de cada vehículo no borrado
    async fn latest_approved_conditions(&self) -> AppResult<Vec<ConditionUpdate>>;

    // Audit (sólo inserción y lectura)
    /// Entrada suelta, sin escritura de entidad asociada
    async fn append_audit(&self, entry: &AuditLogEntry) -> AppResult<AuditLogEntry>;
    async fn query_audit(&self, query: &AuditQuery) -> AppResult<(Vec<AuditLogEntry>, i64)>;
}
