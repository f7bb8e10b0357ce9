//! Reconciliación de condiciones de vehículo
//!
//! Compara la última ConditionUpdate aprobada de cada vehículo con su
//! condición actual. Una diferencia sólo aparece cuando el efecto secundario
//! de la aprobación falló.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::audit_log::{EntityType, NewAuditEntry};
use crate::models::auth::Principal;
use crate::models::vehicle::VehicleCondition;
use crate::repositories::FleetStore;
use crate::services::audit_service::AuditRecorder;
use crate::services::authorization_service::{Action, AuthorizationService, ResourceType, Target};
use crate::utils::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionDrift {
    pub vehicle_id: Uuid,
    pub plate_number: String,
    pub vehicle_condition: VehicleCondition,
    pub approved_condition: VehicleCondition,
    pub condition_update_id: Uuid,
    pub approved_at: DateTime<Utc>,
}

pub struct ReconciliationService {
    store: Arc<dyn FleetStore>,
    recorder: Arc<AuditRecorder>,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn FleetStore>, recorder: Arc<AuditRecorder>) -> Self {
        Self { store, recorder }
    }

    /// Reservado a quien puede modificar cualquier vehículo (admin)
    fn authorize(principal: &Principal) -> AppResult<()> {
        AuthorizationService::authorize(
            Some(principal),
            Action::Update,
            &Target::collection(ResourceType::Vehicle),
        )
    }

    pub async fn vehicle_condition_drift(&self, principal: &Principal) -> AppResult<Vec<ConditionDrift>> {
        Self::authorize(principal)?;
        self.find_drift().await
    }

    async fn find_drift(&self) -> AppResult<Vec<ConditionDrift>> {
        let mut drift = Vec::new();
        for update in self.store.latest_approved_conditions().await? {
            let Some(vehicle) = self.store.get_vehicle(update.vehicle_id).await? else {
                continue;
            };
            if vehicle.condition != update.condition {
                drift.push(ConditionDrift {
                    vehicle_id: vehicle.id,
                    plate_number: vehicle.plate_number,
                    vehicle_condition: vehicle.condition,
                    approved_condition: update.condition,
                    condition_update_id: update.id,
                    approved_at: update.updated_at,
                });
            }
        }
        if !drift.is_empty() {
            warn!("⚠️ {} vehicle(s) diverge from their approved condition", drift.len());
        }
        Ok(drift)
    }

    /// Reaplica la condición aprobada; devuelve lo reparado
    pub async fn repair(&self, principal: &Principal) -> AppResult<Vec<ConditionDrift>> {
        Self::authorize(principal)?;

        let mut repaired = Vec::new();
        for item in self.find_drift().await? {
            let audit = self.recorder.stamp(
                NewAuditEntry::new(
                    EntityType::Vehicle,
                    item.vehicle_id,
                    "reconcile",
                    principal.user_id,
                    principal.role,
                )
                .with_change(
                    "condition",
                    Some(item.vehicle_condition.as_str().to_string()),
                    Some(item.approved_condition.as_str().to_string()),
                ),
            )?;
            if self
                .store
                .set_vehicle_condition(item.vehicle_id, item.approved_condition, &[audit])
                .await?
                .is_none()
            {
                continue;
            }
            info!(
                "🔧 Vehicle {} condition {} -> {} (condition_update {})",
                item.plate_number,
                item.vehicle_condition.as_str(),
                item.approved_condition.as_str(),
                item.condition_update_id
            );
            repaired.push(item);
        }
        Ok(repaired)
    }
}
