use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::common_dto::ListResponse;
use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest, VehicleListQuery};
use crate::models::audit_log::{EntityType, NewAuditEntry};
use crate::models::auth::Principal;
use crate::models::user::UserRole;
use crate::models::vehicle::{Vehicle, VehicleCondition, VehicleStatus};
use crate::repositories::FleetStore;
use crate::services::authorization_service::{Action, AuthorizationService, ResourceType, Target};
use crate::services::AuditRecorder;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, not_found_error, validation_error, AppResult};
use crate::utils::validation::normalize_plate;

pub struct VehicleController {
    store: Arc<dyn FleetStore>,
    recorder: Arc<AuditRecorder>,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            recorder: Arc::clone(&state.recorder),
        }
    }

    async fn load(&self, id: Uuid) -> AppResult<Vehicle> {
        self.store.get_vehicle(id).await?.ok_or_else(|| not_found_error("Vehicle", id))
    }

    /// El propietario debe ser un usuario existente
    async fn ensure_user_exists(&self, id: Uuid) -> AppResult<()> {
        self.store.get_user(id).await?.ok_or_else(|| not_found_error("User", id))?;
        Ok(())
    }

    pub async fn create(&self, principal: &Principal, request: CreateVehicleRequest) -> AppResult<Vehicle> {
        AuthorizationService::authorize(Some(principal), Action::Create, &Target::collection(ResourceType::Vehicle))?;
        request.validate()?;

        let owner_id = match (principal.role, request.owner_id) {
            (UserRole::Admin, Some(owner_id)) => owner_id,
            (UserRole::Admin, None) => return Err(validation_error("owner_id", "owner_id is required")),
            (_, Some(owner_id)) if owner_id != principal.user_id => {
                return Err(forbidden_error("create Vehicle", "owners register vehicles in their own name"))
            }
            _ => principal.user_id,
        };
        self.ensure_user_exists(owner_id).await?;

        let now = Utc::now();
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate_number: normalize_plate(&request.plate_number),
            model: request.model.trim().to_string(),
            color: request.color.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            condition: request.condition.unwrap_or(VehicleCondition::Good),
            status: VehicleStatus::Created,
            owner_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let audit = self.recorder.stamp(
            NewAuditEntry::new(EntityType::Vehicle, vehicle.id, "create", principal.user_id, principal.role)
                .with_change("plate_number", None, Some(vehicle.plate_number.clone())),
        )?;
        let vehicle = self.store.insert_vehicle(&vehicle, &[audit]).await?;
        info!("🚗 Vehicle {} registered by {}", vehicle.plate_number, principal.email);
        Ok(vehicle)
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> AppResult<Vehicle> {
        let vehicle = self.load(id).await?;
        AuthorizationService::authorize(Some(principal), Action::Read, &Target::vehicle(&vehicle))?;
        Ok(vehicle)
    }

    pub async fn list(&self, principal: &Principal, query: VehicleListQuery) -> AppResult<ListResponse<Vehicle>> {
        let scope = AuthorizationService::read_scope(principal, ResourceType::Vehicle)?;
        let mut filters = query.into_filters();
        if let Some(owner) = scope.owner_filter() {
            filters.owner_id = Some(owner);
        }
        let items = self.store.list_vehicles(&filters).await?;
        Ok(ListResponse {
            items,
            limit: filters.limit,
            offset: filters.offset,
        })
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, request: UpdateVehicleRequest) -> AppResult<Vehicle> {
        let current = self.load(id).await?;
        AuthorizationService::authorize(Some(principal), Action::Update, &Target::vehicle(&current))?;
        request.validate()?;
        let patch = request.into_patch()?;

        if (patch.status.is_some() || patch.owner_id.is_some()) && principal.role != UserRole::Admin {
            return Err(forbidden_error("update Vehicle", "only admins change status or owner"));
        }
        if let Some(owner_id) = patch.owner_id {
            self.ensure_user_exists(owner_id).await?;
        }

        // Una entrada por campo modificado
        let audit = patch
            .changes(&current)
            .into_iter()
            .map(|(field, old, new)| {
                self.recorder.stamp(
                    NewAuditEntry::new(EntityType::Vehicle, id, "update", principal.user_id, principal.role)
                        .with_change(field, old, new),
                )
            })
            .collect::<AppResult<Vec<_>>>()?;
        let updated = self
            .store
            .update_vehicle(id, &patch, &audit)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", id))?;
        info!(
            "🚗 Vehicle {} updated ({}) by {}",
            updated.plate_number,
            patch.changed_fields().join(", "),
            principal.email
        );
        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        let current = self.load(id).await?;
        AuthorizationService::authorize(Some(principal), Action::Delete, &Target::vehicle(&current))?;
        let audit = self
            .recorder
            .stamp(NewAuditEntry::new(EntityType::Vehicle, id, "delete", principal.user_id, principal.role))?;
        if !self.store.soft_delete_vehicle(id, &[audit]).await? {
            return Err(not_found_error("Vehicle", id));
        }
        info!("🗑️ Vehicle {} deleted by {}", current.plate_number, principal.email);
        Ok(())
    }
}
