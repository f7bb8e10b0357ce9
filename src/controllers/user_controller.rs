use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::common_dto::{clamp_limit, clamp_offset, ListResponse};
use crate::dto::user_dto::{CreateUserRequest, UpdateUserStatusRequest};
use crate::models::audit_log::{EntityType, NewAuditEntry};
use crate::models::auth::Principal;
use crate::models::user::{User, UserFilters, UserRole, UserStatus};
use crate::repositories::FleetStore;
use crate::services::authorization_service::{Action, AuthorizationService, ResourceType, Target};
use crate::services::{AuditRecorder, AuthService};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct UserController {
    store: Arc<dyn FleetStore>,
    recorder: Arc<AuditRecorder>,
    auth: Arc<AuthService>,
}

fn users() -> Target {
    Target::collection(ResourceType::User)
}

impl UserController {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            recorder: Arc::clone(&state.recorder),
            auth: Arc::clone(&state.auth),
        }
    }

    pub async fn create(&self, principal: &Principal, request: CreateUserRequest) -> AppResult<User> {
        AuthorizationService::authorize(Some(principal), Action::Create, &users())?;
        request.validate()?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: request.email.trim().to_lowercase(),
            full_name: request.full_name.trim().to_string(),
            phone: request.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            password_hash: self.auth.hash_password(&request.password)?,
            role: request.role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let audit = self.recorder.stamp(
            NewAuditEntry::new(EntityType::User, user.id, "create", principal.user_id, principal.role)
                .with_change("role", None, Some(user.role.as_str().to_string())),
        )?;
        let user = self.store.insert_user(&user, &[audit]).await?;
        info!("👤 User {} created as {} by {}", user.email, user.role.as_str(), principal.email);
        Ok(user)
    }

    pub async fn list(&self, principal: &Principal, filters: UserFilters) -> AppResult<ListResponse<User>> {
        AuthorizationService::authorize(Some(principal), Action::Read, &users())?;
        let filters = UserFilters {
            limit: Some(clamp_limit(filters.limit, 50, 100)),
            offset: Some(clamp_offset(filters.offset)),
            ..filters
        };
        let items = self.store.list_users(&filters).await?;
        Ok(ListResponse {
            items,
            limit: filters.limit.unwrap_or(50),
            offset: filters.offset.unwrap_or(0),
        })
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> AppResult<User> {
        AuthorizationService::authorize(Some(principal), Action::Read, &users())?;
        self.store.get_user(id).await?.ok_or_else(|| not_found_error("User", id))
    }

    pub async fn update_status(
        &self,
        principal: &Principal,
        id: Uuid,
        request: UpdateUserStatusRequest,
    ) -> AppResult<User> {
        AuthorizationService::authorize(Some(principal), Action::UpdateStatus, &users())?;
        let current = self.store.get_user(id).await?.ok_or_else(|| not_found_error("User", id))?;
        if current.status == request.status {
            return Ok(current);
        }
        if request.status != UserStatus::Active {
            self.ensure_not_last_admin(&current).await?;
        }

        let audit = self.recorder.stamp(
            NewAuditEntry::new(EntityType::User, id, "status_change", principal.user_id, principal.role).with_change(
                "status",
                Some(current.status.as_str().to_string()),
                Some(request.status.as_str().to_string()),
            ),
        )?;
        let updated = self
            .store
            .update_user_status(id, request.status, &[audit])
            .await?
            .ok_or_else(|| not_found_error("User", id))?;
        info!(
            "👤 User {} {} -> {} by {}",
            updated.email,
            current.status.as_str(),
            updated.status.as_str(),
            principal.email
        );
        Ok(updated)
    }

    /// Borrado lógico: el historial de auditoría sigue resolviendo el id
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        AuthorizationService::authorize(Some(principal), Action::Delete, &users())?;
        let current = self.store.get_user(id).await?.ok_or_else(|| not_found_error("User", id))?;
        self.ensure_not_last_admin(&current).await?;

        let audit = self
            .recorder
            .stamp(NewAuditEntry::new(EntityType::User, id, "delete", principal.user_id, principal.role))?;
        if !self.store.soft_delete_user(id, &[audit]).await? {
            return Err(not_found_error("User", id));
        }
        info!("🗑️ User {} deleted by {}", current.email, principal.email);
        Ok(())
    }

    async fn ensure_not_last_admin(&self, user: &User) -> AppResult<()> {
        if user.role == UserRole::Admin && user.is_active() && self.store.count_active_admins().await? <= 1 {
            return Err(AppError::Conflict {
                message: "The last active admin cannot be deactivated or deleted".to_string(),
                entity_id: Some(user.id),
                expected: None,
                actual: None,
            });
        }
        Ok(())
    }
}
