//! Request Lifecycle Engine
//!
//! Única vía para crear solicitudes y mover su estado. Cada transición es un
//! compare-and-set en el store que escribe también su entrada de auditoría;
//! ningún llamador puede cambiar un estado sin dejar rastro.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::audit_log::{EntityType, NewAuditEntry};
use crate::models::auth::Principal;
use crate::models::request::{ConditionUpdate, RequestKind, RequestStatus, ServiceRequest};
use crate::models::vehicle::Vehicle;
use crate::repositories::FleetStore;
use crate::services::audit_service::AuditRecorder;
use crate::services::authorization_service::{Action, AuthorizationService, ResourceType, Target};
use crate::utils::errors::{bad_request_error, not_found_error, status_conflict_error, AppError, AppResult};

pub struct LifecycleEngine {
    store: Arc<dyn FleetStore>,
    recorder: Arc<AuditRecorder>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn FleetStore>, recorder: Arc<AuditRecorder>) -> Self {
        Self { store, recorder }
    }

    /// Registra una solicitud nueva en `pending` junto con su auditoría `create`
    pub async fn submit(&self, principal: &Principal, request: ServiceRequest) -> AppResult<ServiceRequest> {
        let kind = request.kind();
        AuthorizationService::authorize(Some(principal), Action::Create, &Target::collection(kind.into()))?;

        if request.status() != RequestStatus::Pending {
            return Err(bad_request_error("New requests must start as 'pending'"));
        }
        if request.owner_id() != principal.user_id {
            return Err(bad_request_error("Requests are filed on behalf of the authenticated user"));
        }

        let vehicle = self
            .store
            .get_vehicle(request.vehicle_id())
            .await?
            .ok_or_else(|| not_found_error("Vehicle", request.vehicle_id()))?;
        // Un owner sólo puede pedir sobre sus propios vehículos
        AuthorizationService::authorize(Some(principal), Action::Read, &Target::vehicle(&vehicle))?;

        let audit = self.recorder.stamp(
            NewAuditEntry::new(kind.into(), request.id(), "create", principal.user_id, principal.role).with_change(
                "status",
                None,
                Some(RequestStatus::Pending.as_str().to_string()),
            ),
        )?;
        let created = self.store.insert_request(&request, &audit).await?;

        info!(
            "🆕 {} {} submitted by {} for vehicle {}",
            kind.entity_type(),
            created.id(),
            principal.user_id,
            vehicle.plate_number
        );
        Ok(created)
    }

    /// `transition(entity, fromStatusExpected, toStatus, actor)`
    pub async fn transition(
        &self,
        principal: &Principal,
        kind: RequestKind,
        id: Uuid,
        expected: RequestStatus,
        to: RequestStatus,
    ) -> AppResult<ServiceRequest> {
        // update-status depende sólo del rol
        AuthorizationService::authorize(
            Some(principal),
            Action::UpdateStatus,
            &Target::collection(ResourceType::from(kind)),
        )?;

        let current = self
            .store
            .get_request(kind, id)
            .await?
            .ok_or_else(|| not_found_error(kind.entity_type(), id))?;

        let transition = kind.find_transition(expected, to).ok_or_else(|| AppError::InvalidTransition {
            entity_type: kind.entity_type().to_string(),
            from: expected.as_str().to_string(),
            to: to.as_str().to_string(),
        })?;

        if current.status() != expected {
            return Err(status_conflict_error(
                kind.entity_type(),
                id,
                expected.as_str(),
                current.status().as_str(),
            ));
        }

        let audit = self.recorder.stamp(
            NewAuditEntry::new(kind.into(), id, transition.action.as_str(), principal.user_id, principal.role)
                .with_change(
                    "status",
                    Some(expected.as_str().to_string()),
                    Some(to.as_str().to_string()),
                ),
        )?;

        let updated = match self
            .store
            .transition_request(kind, id, expected, to, principal.user_id, &audit)
            .await?
        {
            Some(updated) => updated,
            None => return Err(self.lost_race(kind, id, expected).await),
        };

        info!(
            "🔁 {} {} {} -> {} ({}) by {} [{}]",
            kind.entity_type(),
            id,
            expected.as_str(),
            to.as_str(),
            transition.action.as_str(),
            principal.user_id,
            principal.role.as_str()
        );

        if let ServiceRequest::Condition(update) = &updated {
            if to == RequestStatus::Approved {
                self.apply_condition(principal, update).await;
            }
        }

        Ok(updated)
    }

    /// El compare-and-set no tocó ninguna fila: se vuelve a leer para informar
    async fn lost_race(&self, kind: RequestKind, id: Uuid, expected: RequestStatus) -> AppError {
        match self.store.get_request(kind, id).await {
            Ok(Some(current)) => {
                warn!(
                    "⚠️ {} {} changed concurrently: expected '{}', found '{}'",
                    kind.entity_type(),
                    id,
                    expected.as_str(),
                    current.status().as_str()
                );
                status_conflict_error(kind.entity_type(), id, expected.as_str(), current.status().as_str())
            }
            Ok(None) => not_found_error(kind.entity_type(), id),
            Err(e) => e,
        }
    }

    /// Efecto secundario de una ConditionUpdate aprobada. Best-effort: la
    /// transición ya está confirmada; un fallo aquí queda en el log y lo
    /// detecta la reconciliación. El cambio de condición y su auditoría se
    /// escriben juntos.
    async fn apply_condition(&self, principal: &Principal, update: &ConditionUpdate) {
        if let Err(e) = self.try_apply_condition(principal, update).await {
            error!(
                "❌ Vehicle condition not applied: condition_update={} vehicle={} condition={}: {}",
                update.id,
                update.vehicle_id,
                update.condition.as_str(),
                e
            );
        }
    }

    async fn try_apply_condition(&self, principal: &Principal, update: &ConditionUpdate) -> AppResult<Vehicle> {
        let previous = self
            .store
            .get_vehicle(update.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", update.vehicle_id))?;
        let audit = self.recorder.stamp(
            NewAuditEntry::new(
                EntityType::Vehicle,
                update.vehicle_id,
                "condition_change",
                principal.user_id,
                principal.role,
            )
            .with_change(
                "condition",
                Some(previous.condition.as_str().to_string()),
                Some(update.condition.as_str().to_string()),
            ),
        )?;
        self.store
            .set_vehicle_condition(update.vehicle_id, update.condition, &[audit])
            .await?
            .ok_or_else(|| not_found_error("Vehicle", update.vehicle_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audit_log::{AuditLogEntry, AuditQuery};
    use crate::models::request::{FuelRequest, MaintenancePriority, MaintenanceRequest};
    use crate::models::user::UserRole;
    use crate::models::vehicle::{VehicleCondition, VehicleStatus};
    use crate::repositories::testing::FaultyStore;
    use crate::repositories::InMemoryStore;
    use chrono::Utc;
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<InMemoryStore>,
        engine: LifecycleEngine,
        owner: Principal,
        manager: Principal,
        admin: Principal,
        vehicle: Vehicle,
    }

    fn principal(role: UserRole) -> Principal {
        Principal::new(Uuid::new_v4(), format!("{}@fleet.test", role.as_str()), role)
    }

    fn vehicle_of(owner: Uuid) -> Vehicle {
        let now = Utc::now();
        Vehicle {
            id: Uuid::new_v4(),
            plate_number: format!("V1-{}", &owner.simple().to_string()[..6]).to_uppercase(),
            model: "Transit".to_string(),
            color: None,
            condition: VehicleCondition::Good,
            status: VehicleStatus::Active,
            owner_id: owner,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    async fn fixture_with(store: Arc<InMemoryStore>, dyn_store: Arc<dyn FleetStore>) -> Fixture {
        let owner = principal(UserRole::Owner);
        let vehicle = store.insert_vehicle(&vehicle_of(owner.user_id), &[]).await.unwrap();
        let recorder = Arc::new(AuditRecorder::new(Arc::clone(&dyn_store), 100));
        Fixture {
            engine: LifecycleEngine::new(dyn_store, recorder),
            store,
            owner,
            manager: principal(UserRole::Manager),
            admin: principal(UserRole::Admin),
            vehicle,
        }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        fixture_with(Arc::clone(&store), store).await
    }

    fn fuel(owner: Uuid, vehicle: Uuid) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest::Fuel(FuelRequest {
            id: Uuid::new_v4(),
            requester_id: owner,
            vehicle_id: vehicle,
            quantity_litres: Decimal::new(20, 0),
            reason: "trip".to_string(),
            reimbursement_bank: None,
            reimbursement_account: None,
            status: RequestStatus::Pending,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn maintenance(owner: Uuid, vehicle: Uuid) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest::Maintenance(MaintenanceRequest {
            id: Uuid::new_v4(),
            requester_id: owner,
            vehicle_id: vehicle,
            issue_description: "brakes squeal".to_string(),
            priority: MaintenancePriority::High,
            estimated_cost: Some(Decimal::new(15000, 2)),
            status: RequestStatus::Pending,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn condition(owner: Uuid, vehicle: Uuid, condition: VehicleCondition) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest::Condition(ConditionUpdate {
            id: Uuid::new_v4(),
            reporter_id: owner,
            vehicle_id: vehicle,
            condition,
            note: Some("dent on the left door".to_string()),
            status: RequestStatus::Pending,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn audit_of(store: &InMemoryStore, entity_id: Uuid) -> Vec<AuditLogEntry> {
        let query = AuditQuery {
            entity_id: Some(entity_id),
            limit: 100,
            ..AuditQuery::default()
        };
        store.query_audit(&query).await.unwrap().0
    }

    #[tokio::test]
    async fn test_owner_submits_and_manager_approves_fuel_request() {
        let f = fixture().await;
        let created = f.engine.submit(&f.owner, fuel(f.owner.user_id, f.vehicle.id)).await.unwrap();
        assert_eq!(created.status(), RequestStatus::Pending);

        let approved = f
            .engine
            .transition(&f.manager, RequestKind::Fuel, created.id(), RequestStatus::Pending, RequestStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status(), RequestStatus::Approved);

        let trail = audit_of(&f.store, created.id()).await;
        let approvals: Vec<_> = trail.iter().filter(|e| e.action == "approve").collect();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].entity_type, EntityType::FuelRequest);
        assert_eq!(approvals[0].new_value.as_deref(), Some("approved"));
        assert_eq!(approvals[0].actor_id, f.manager.user_id);
        assert_eq!(trail.len(), 2);
    }

    #[tokio::test]
    async fn test_owner_cannot_approve_own_request() {
        let f = fixture().await;
        let created = f.engine.submit(&f.owner, fuel(f.owner.user_id, f.vehicle.id)).await.unwrap();
        let err = f
            .engine
            .transition(&f.owner, RequestKind::Fuel, created.id(), RequestStatus::Pending, RequestStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let stored = f.store.get_request(RequestKind::Fuel, created.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_stale_expected_status_is_conflict() {
        let f = fixture().await;
        let created = f.engine.submit(&f.owner, fuel(f.owner.user_id, f.vehicle.id)).await.unwrap();
        f.engine
            .transition(&f.manager, RequestKind::Fuel, created.id(), RequestStatus::Pending, RequestStatus::Approved)
            .await
            .unwrap();

        let err = f
            .engine
            .transition(&f.manager, RequestKind::Fuel, created.id(), RequestStatus::Pending, RequestStatus::Rejected)
            .await
            .unwrap_err();
        match err {
            AppError::Conflict { entity_id, expected, actual, .. } => {
                assert_eq!(entity_id, Some(created.id()));
                assert_eq!(expected.as_deref(), Some("pending"));
                assert_eq!(actual.as_deref(), Some("approved"));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        let stored = f.store.get_request(RequestKind::Fuel, created.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_skipping_approval_is_invalid_transition() {
        let f = fixture().await;
        let created = f
            .engine
            .submit(&f.owner, maintenance(f.owner.user_id, f.vehicle.id))
            .await
            .unwrap();
        let err = f
            .engine
            .transition(
                &f.admin,
                RequestKind::Maintenance,
                created.id(),
                RequestStatus::Pending,
                RequestStatus::InProgress,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        let stored = f.store.get_request(RequestKind::Maintenance, created.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Pending);
        assert_eq!(audit_of(&f.store, created.id()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_is_terminal() {
        let f = fixture().await;
        let created = f.engine.submit(&f.owner, fuel(f.owner.user_id, f.vehicle.id)).await.unwrap();
        f.engine
            .transition(&f.manager, RequestKind::Fuel, created.id(), RequestStatus::Pending, RequestStatus::Rejected)
            .await
            .unwrap();
        let err = f
            .engine
            .transition(&f.admin, RequestKind::Fuel, created.id(), RequestStatus::Rejected, RequestStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_maintenance_walks_full_graph() {
        let f = fixture().await;
        let created = f
            .engine
            .submit(&f.owner, maintenance(f.owner.user_id, f.vehicle.id))
            .await
            .unwrap();
        let steps = [
            (RequestStatus::Pending, RequestStatus::Approved),
            (RequestStatus::Approved, RequestStatus::InProgress),
            (RequestStatus::InProgress, RequestStatus::Completed),
        ];
        for (from, to) in steps {
            let updated = f
                .engine
                .transition(&f.manager, RequestKind::Maintenance, created.id(), from, to)
                .await
                .unwrap();
            assert_eq!(updated.status(), to);
        }
        let actions: Vec<String> = audit_of(&f.store, created.id())
            .await
            .into_iter()
            .rev()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec!["create", "approve", "start", "complete"]);
    }

    #[tokio::test]
    async fn test_concurrent_transitions_exactly_one_wins() {
        let f = fixture().await;
        let created = f.engine.submit(&f.owner, fuel(f.owner.user_id, f.vehicle.id)).await.unwrap();
        let other_manager = principal(UserRole::Manager);

        let (first, second) = tokio::join!(
            f.engine
                .transition(&f.manager, RequestKind::Fuel, created.id(), RequestStatus::Pending, RequestStatus::Approved),
            f.engine.transition(
                &other_manager,
                RequestKind::Fuel,
                created.id(),
                RequestStatus::Pending,
                RequestStatus::Approved
            ),
        );
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict { .. }))));

        let approvals = audit_of(&f.store, created.id())
            .await
            .into_iter()
            .filter(|e| e.action == "approve")
            .count();
        assert_eq!(approvals, 1);
    }

    #[tokio::test]
    async fn test_concurrent_transitions_on_tasks() {
        let store = Arc::new(InMemoryStore::new());
        let f = fixture_with(Arc::clone(&store), store).await;
        let created = f.engine.submit(&f.owner, fuel(f.owner.user_id, f.vehicle.id)).await.unwrap();
        let engine = Arc::new(f.engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let manager = principal(UserRole::Manager);
                let id = created.id();
                tokio::spawn(async move {
                    engine
                        .transition(&manager, RequestKind::Fuel, id, RequestStatus::Pending, RequestStatus::Approved)
                        .await
                })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(AppError::Conflict { .. }) => {}
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_approved_condition_update_sets_vehicle_condition() {
        let f = fixture().await;
        let created = f
            .engine
            .submit(&f.owner, condition(f.owner.user_id, f.vehicle.id, VehicleCondition::Poor))
            .await
            .unwrap();
        f.engine
            .transition(
                &f.manager,
                RequestKind::Condition,
                created.id(),
                RequestStatus::Pending,
                RequestStatus::Approved,
            )
            .await
            .unwrap();

        let vehicle = f.store.get_vehicle(f.vehicle.id).await.unwrap().unwrap();
        assert_eq!(vehicle.condition, VehicleCondition::Poor);

        let trail = audit_of(&f.store, f.vehicle.id).await;
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "condition_change");
        assert_eq!(trail[0].old_value.as_deref(), Some("Good"));
        assert_eq!(trail[0].new_value.as_deref(), Some("Poor"));
    }

    #[tokio::test]
    async fn test_rejected_condition_update_leaves_vehicle_alone() {
        let f = fixture().await;
        let created = f
            .engine
            .submit(&f.owner, condition(f.owner.user_id, f.vehicle.id, VehicleCondition::Poor))
            .await
            .unwrap();
        f.engine
            .transition(
                &f.manager,
                RequestKind::Condition,
                created.id(),
                RequestStatus::Pending,
                RequestStatus::Rejected,
            )
            .await
            .unwrap();
        let vehicle = f.store.get_vehicle(f.vehicle.id).await.unwrap().unwrap();
        assert_eq!(vehicle.condition, VehicleCondition::Good);
    }

    #[tokio::test]
    async fn test_owner_cannot_file_for_someone_elses_vehicle() {
        let f = fixture().await;
        let other_owner = principal(UserRole::Owner);
        let err = f
            .engine
            .submit(&other_owner, fuel(other_owner.user_id, f.vehicle.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_submit_requires_existing_vehicle_and_creator_role() {
        let f = fixture().await;
        let err = f
            .engine
            .submit(&f.owner, fuel(f.owner.user_id, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = f
            .engine
            .submit(&f.manager, fuel(f.manager.user_id, f.vehicle.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_missing_request_is_not_found() {
        let f = fixture().await;
        let err = f
            .engine
            .transition(&f.manager, RequestKind::Fuel, Uuid::new_v4(), RequestStatus::Pending, RequestStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_condition_side_effect_failure_keeps_approval() {
        let inner = Arc::new(InMemoryStore::new());
        let outage: Arc<dyn FleetStore> = Arc::new(FaultyStore::new(Arc::clone(&inner)).with_vehicles_down());
        let f = fixture_with(Arc::clone(&inner), outage).await;

        let created = f
            .engine
            .submit(&f.owner, condition(f.owner.user_id, f.vehicle.id, VehicleCondition::Fair))
            .await
            .unwrap();
        let approved = f
            .engine
            .transition(
                &f.manager,
                RequestKind::Condition,
                created.id(),
                RequestStatus::Pending,
                RequestStatus::Approved,
            )
            .await
            .unwrap();
        assert_eq!(approved.status(), RequestStatus::Approved);

        let vehicle = inner.get_vehicle(f.vehicle.id).await.unwrap().unwrap();
        assert_eq!(vehicle.condition, VehicleCondition::Good);

        // La divergencia queda visible para la reconciliación
        let approved_updates = inner.latest_approved_conditions().await.unwrap();
        assert_eq!(approved_updates.len(), 1);
        assert_eq!(approved_updates[0].condition, VehicleCondition::Fair);
    }

    #[tokio::test]
    async fn test_transition_without_audit_leaves_request_untouched() {
        let inner = Arc::new(InMemoryStore::new());
        let f = fixture_with(Arc::clone(&inner), Arc::clone(&inner) as Arc<dyn FleetStore>).await;
        let created = f.engine.submit(&f.owner, fuel(f.owner.user_id, f.vehicle.id)).await.unwrap();

        let recorder = Arc::new(AuditRecorder::new(Arc::clone(&inner) as Arc<dyn FleetStore>, 100));
        let broken: Arc<dyn FleetStore> = Arc::new(FaultyStore::new(Arc::clone(&inner)).with_audit_down());
        let engine = LifecycleEngine::new(broken, recorder);

        let err = engine
            .transition(&f.manager, RequestKind::Fuel, created.id(), RequestStatus::Pending, RequestStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Dependency(_)));

        let stored = inner.get_request(RequestKind::Fuel, created.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Pending);
        let trail = audit_of(&inner, created.id()).await;
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "create");
    }
}
