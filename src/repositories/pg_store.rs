//! Entity Store sobre PostgreSQL
//!
//! Consultas sqlx en tiempo de ejecución (`query_as` + `FromRow`). Cada
//! escritura de entidad abre una transacción que incluye sus filas de
//! audit_logs; la transición de estado usa además
//! `UPDATE … WHERE status = $expected`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::FleetStore;
use crate::models::audit_log::{AuditLogEntry, AuditQuery};
use crate::models::request::{
    ConditionUpdate, FuelRequest, MaintenanceRequest, RequestFilters, RequestKind, RequestStatus, ServiceRequest,
};
use crate::models::user::{User, UserFilters, UserStatus};
use crate::models::vehicle::{Vehicle, VehicleCondition, VehicleFilters, VehiclePatch};
use crate::utils::errors::{conflict_error, AppError, AppResult};

/// Fila de cualquiera de las tablas de solicitudes
trait RequestRow: for<'r> FromRow<'r, PgRow> + Send + Unpin + Into<ServiceRequest> {}

impl RequestRow for FuelRequest {}
impl RequestRow for MaintenanceRequest {}
impl RequestRow for ConditionUpdate {}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Traduce violaciones de unicidad a Conflict; el resto es DependencyError
fn map_unique(e: sqlx::Error, resource: &str, field: &str, value: &str) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return conflict_error(resource, field, value);
        }
    }
    AppError::from(e)
}

async fn get_typed<T: RequestRow>(pool: &PgPool, kind: RequestKind, id: Uuid) -> Result<Option<ServiceRequest>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} WHERE id = $1", kind.table());
    Ok(sqlx::query_as::<_, T>(&sql).bind(id).fetch_optional(pool).await?.map(Into::into))
}

async fn list_typed<T: RequestRow>(
    pool: &PgPool,
    qb: &mut QueryBuilder<'_, Postgres>,
) -> Result<Vec<ServiceRequest>, sqlx::Error> {
    let rows = qb.build_query_as::<T>().fetch_all(pool).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn compare_and_set_typed<T: RequestRow>(
    conn: &mut PgConnection,
    kind: RequestKind,
    id: Uuid,
    expected: RequestStatus,
    to: RequestStatus,
    reviewer: Uuid,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<Option<ServiceRequest>, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET status = $1, reviewed_by = $2, updated_at = $3 WHERE id = $4 AND status = $5 RETURNING *",
        kind.table()
    );
    Ok(sqlx::query_as::<_, T>(&sql)
        .bind(to)
        .bind(reviewer)
        .bind(at)
        .bind(id)
        .bind(expected)
        .fetch_optional(conn)
        .await?
        .map(Into::into))
}

async fn insert_audit_row(conn: &mut PgConnection, entry: &AuditLogEntry) -> Result<AuditLogEntry, sqlx::Error> {
    sqlx::query_as::<_, AuditLogEntry>(
        r#"
        INSERT INTO audit_logs (id, entity_type, entity_id, action, field_changed, old_value, new_value, actor_id, actor_role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(entry.id)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.action)
    .bind(&entry.field_changed)
    .bind(&entry.old_value)
    .bind(&entry.new_value)
    .bind(entry.actor_id)
    .bind(entry.actor_role)
    .bind(entry.created_at)
    .fetch_one(conn)
    .await
}

async fn insert_audit_rows(conn: &mut PgConnection, entries: &[AuditLogEntry]) -> Result<(), sqlx::Error> {
    for entry in entries {
        insert_audit_row(&mut *conn, entry).await?;
    }
    Ok(())
}

fn push_audit_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AuditQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(entity_type) = query.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type);
    }
    if let Some(entity_id) = query.entity_id {
        qb.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(actor_id) = query.actor_id {
        qb.push(" AND actor_id = ").push_bind(actor_id);
    }
    if let Some(from) = query.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

#[async_trait]
impl FleetStore for PgStore {
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User, audit: &[AuditLogEntry]) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, full_name, phone, password_hash, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.status)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "User", "email", &user.email))?;
        insert_audit_rows(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self, filters: &UserFilters) -> AppResult<Vec<User>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users WHERE deleted_at IS NULL");
        if let Some(role) = filters.role {
            qb.push(" AND role = ").push_bind(role);
        }
        if let Some(status) = filters.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        qb.push(" LIMIT ").push_bind(filters.limit.unwrap_or(50));
        qb.push(" OFFSET ").push_bind(filters.offset.unwrap_or(0));
        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn count_active_admins(&self) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND status = 'active' AND deleted_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_user_status(
        &self,
        id: Uuid,
        status: UserStatus,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(user) = user else {
            tx.rollback().await?;
            return Ok(None);
        };
        insert_audit_rows(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(Some(user))
    }

    async fn soft_delete_user(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET status = 'inactive', deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        insert_audit_rows(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle, audit: &[AuditLogEntry]) -> AppResult<Vehicle> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (id, plate_number, model, color, condition, status, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.plate_number)
        .bind(&vehicle.model)
        .bind(&vehicle.color)
        .bind(vehicle.condition)
        .bind(vehicle.status)
        .bind(vehicle.owner_id)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "Vehicle", "plate_number", &vehicle.plate_number))?;
        insert_audit_rows(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn find_vehicle_by_plate(&self, plate_number: &str) -> AppResult<Option<Vehicle>> {
        let vehicle =
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE plate_number = $1 AND deleted_at IS NULL")
                .bind(plate_number)
                .fetch_optional(&self.pool)
                .await?;
        Ok(vehicle)
    }

    async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM vehicles WHERE deleted_at IS NULL");
        if let Some(owner_id) = filters.owner_id {
            qb.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(status) = filters.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(condition) = filters.condition {
            qb.push(" AND condition = ").push_bind(condition);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        qb.push(" LIMIT ").push_bind(filters.limit);
        qb.push(" OFFSET ").push_bind(filters.offset);
        let vehicles = qb.build_query_as::<Vehicle>().fetch_all(&self.pool).await?;
        Ok(vehicles)
    }

    async fn update_vehicle(
        &self,
        id: Uuid,
        patch: &VehiclePatch,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<Vehicle>> {
        let mut tx = self.pool.begin().await?;
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET model = COALESCE($2, model),
                color = COALESCE($3, color),
                status = COALESCE($4, status),
                owner_id = COALESCE($5, owner_id),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.model)
        .bind(&patch.color)
        .bind(patch.status)
        .bind(patch.owner_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(vehicle) = vehicle else {
            tx.rollback().await?;
            return Ok(None);
        };
        insert_audit_rows(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(Some(vehicle))
    }

    async fn set_vehicle_condition(
        &self,
        id: Uuid,
        condition: VehicleCondition,
        audit: &[AuditLogEntry],
    ) -> AppResult<Option<Vehicle>> {
        let mut tx = self.pool.begin().await?;
        let vehicle = sqlx::query_as::<_, Vehicle>(
            "UPDATE vehicles SET condition = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(condition)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(vehicle) = vehicle else {
            tx.rollback().await?;
            return Ok(None);
        };
        insert_audit_rows(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(Some(vehicle))
    }

    async fn soft_delete_vehicle(&self, id: Uuid, audit: &[AuditLogEntry]) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result =
            sqlx::query("UPDATE vehicles SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        insert_audit_rows(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn insert_request(&self, request: &ServiceRequest, audit: &AuditLogEntry) -> AppResult<ServiceRequest> {
        let mut tx = self.pool.begin().await?;
        let inserted: ServiceRequest = match request {
            ServiceRequest::Fuel(r) => sqlx::query_as::<_, FuelRequest>(
                r#"
                INSERT INTO fuel_requests (id, requester_id, vehicle_id, quantity_litres, reason,
                    reimbursement_bank, reimbursement_account, status, reviewed_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
                "#,
            )
            .bind(r.id)
            .bind(r.requester_id)
            .bind(r.vehicle_id)
            .bind(r.quantity_litres)
            .bind(&r.reason)
            .bind(&r.reimbursement_bank)
            .bind(&r.reimbursement_account)
            .bind(r.status)
            .bind(r.reviewed_by)
            .bind(r.created_at)
            .bind(r.updated_at)
            .fetch_one(&mut *tx)
            .await?
            .into(),
            ServiceRequest::Maintenance(r) => sqlx::query_as::<_, MaintenanceRequest>(
                r#"
                INSERT INTO maintenance_requests (id, requester_id, vehicle_id, issue_description, priority,
                    estimated_cost, status, reviewed_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
                "#,
            )
            .bind(r.id)
            .bind(r.requester_id)
            .bind(r.vehicle_id)
            .bind(&r.issue_description)
            .bind(r.priority)
            .bind(r.estimated_cost)
            .bind(r.status)
            .bind(r.reviewed_by)
            .bind(r.created_at)
            .bind(r.updated_at)
            .fetch_one(&mut *tx)
            .await?
            .into(),
            ServiceRequest::Condition(r) => sqlx::query_as::<_, ConditionUpdate>(
                r#"
                INSERT INTO condition_updates (id, reporter_id, vehicle_id, condition, note,
                    status, reviewed_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(r.id)
            .bind(r.reporter_id)
            .bind(r.vehicle_id)
            .bind(r.condition)
            .bind(&r.note)
            .bind(r.status)
            .bind(r.reviewed_by)
            .bind(r.created_at)
            .bind(r.updated_at)
            .fetch_one(&mut *tx)
            .await?
            .into(),
        };
        insert_audit_row(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_request(&self, kind: RequestKind, id: Uuid) -> AppResult<Option<ServiceRequest>> {
        let request = match kind {
            RequestKind::Fuel => get_typed::<FuelRequest>(&self.pool, kind, id).await?,
            RequestKind::Maintenance => get_typed::<MaintenanceRequest>(&self.pool, kind, id).await?,
            RequestKind::Condition => get_typed::<ConditionUpdate>(&self.pool, kind, id).await?,
        };
        Ok(request)
    }

    async fn list_requests(&self, kind: RequestKind, filters: &RequestFilters) -> AppResult<Vec<ServiceRequest>> {
        let owner_column = match kind {
            RequestKind::Condition => "reporter_id",
            RequestKind::Fuel | RequestKind::Maintenance => "requester_id",
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT * FROM {} WHERE 1 = 1", kind.table()));
        if let Some(status) = filters.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(vehicle_id) = filters.vehicle_id {
            qb.push(" AND vehicle_id = ").push_bind(vehicle_id);
        }
        if let Some(requester_id) = filters.requester_id {
            qb.push(format!(" AND {} = ", owner_column)).push_bind(requester_id);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        qb.push(" LIMIT ").push_bind(filters.limit);
        qb.push(" OFFSET ").push_bind(filters.offset);

        let requests = match kind {
            RequestKind::Fuel => list_typed::<FuelRequest>(&self.pool, &mut qb).await?,
            RequestKind::Maintenance => list_typed::<MaintenanceRequest>(&self.pool, &mut qb).await?,
            RequestKind::Condition => list_typed::<ConditionUpdate>(&self.pool, &mut qb).await?,
        };
        Ok(requests)
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
        let mut tx = self.pool.begin().await?;
        let at = audit.created_at;

        let updated = match kind {
            RequestKind::Fuel => {
                compare_and_set_typed::<FuelRequest>(&mut tx, kind, id, expected, to, reviewer, at).await?
            }
            RequestKind::Maintenance => {
                compare_and_set_typed::<MaintenanceRequest>(&mut tx, kind, id, expected, to, reviewer, at).await?
            }
            RequestKind::Condition => {
                compare_and_set_typed::<ConditionUpdate>(&mut tx, kind, id, expected, to, reviewer, at).await?
            }
        };

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        insert_audit_row(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn latest_approved_conditions(&self) -> AppResult<Vec<ConditionUpdate>> {
        let updates = sqlx::query_as::<_, ConditionUpdate>(
            r#"
            SELECT DISTINCT ON (cu.vehicle_id) cu.*
            FROM condition_updates cu
            JOIN vehicles v ON v.id = cu.vehicle_id AND v.deleted_at IS NULL
            WHERE cu.status = 'approved'
            ORDER BY cu.vehicle_id, cu.updated_at DESC, cu.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(updates)
    }

    async fn append_audit(&self, entry: &AuditLogEntry) -> AppResult<AuditLogEntry> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_audit_row(&mut conn, entry).await?)
    }

    async fn query_audit(&self, query: &AuditQuery) -> AppResult<(Vec<AuditLogEntry>, i64)> {
        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs");
        push_audit_filters(&mut count_qb, query);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM audit_logs");
        push_audit_filters(&mut qb, query);
        qb.push(" ORDER BY created_at DESC, id DESC");
        qb.push(" LIMIT ").push_bind(query.limit);
        qb.push(" OFFSET ").push_bind(query.offset);
        let entries = qb.build_query_as::<AuditLogEntry>().fetch_all(&self.pool).await?;

        Ok((entries, total))
    }
}
