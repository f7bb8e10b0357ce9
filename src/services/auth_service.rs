//! Servicio de autenticación
//!
//! Verificación de credenciales (bcrypt), emisión de tokens y el
//! administrador inicial configurado por entorno.

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::environment::BootstrapAdmin;
use crate::models::audit_log::{EntityType, NewAuditEntry};
use crate::models::auth::{LoginRequest, LoginResponse};
use crate::models::user::{User, UserRole, UserStatus};
use crate::repositories::FleetStore;
use crate::services::audit_service::AuditRecorder;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::jwt::{generate_token, JwtConfig};

pub struct AuthService {
    store: Arc<dyn FleetStore>,
    recorder: Arc<AuditRecorder>,
    jwt: JwtConfig,
    bcrypt_cost: u32,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthenticated("Invalid credentials".to_string())
}

impl AuthService {
    pub fn new(store: Arc<dyn FleetStore>, recorder: Arc<AuditRecorder>, jwt: JwtConfig, bcrypt_cost: u32) -> Self {
        Self {
            store,
            recorder,
            jwt,
            bcrypt_cost,
        }
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        hash(password, self.bcrypt_cost).map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Login con email y password; sólo usuarios activos
    pub async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        let user = self
            .store
            .find_user_by_email(request.email.trim())
            .await?
            .ok_or_else(invalid_credentials)?;

        let matches = verify(&request.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))?;
        if !matches {
            warn!("🔒 Failed login for {}", user.email);
            return Err(invalid_credentials());
        }
        if !user.is_active() {
            warn!("🔒 Login refused for {} ({})", user.email, user.status.as_str());
            return Err(AppError::Unauthenticated("User is inactive or suspended".to_string()));
        }

        let (token, expires_at) = generate_token(user.id, user.role, &self.jwt)?;
        info!("🔑 {} logged in as {}", user.email, user.role.as_str());
        Ok(LoginResponse { token, expires_at, user })
    }

    /// Crea el administrador inicial si no queda ningún admin activo
    pub async fn ensure_bootstrap_admin(&self, bootstrap: &BootstrapAdmin) -> AppResult<Option<User>> {
        if self.store.count_active_admins().await? > 0 {
            return Ok(None);
        }
        if self.store.find_user_by_email(&bootstrap.email).await?.is_some() {
            warn!(
                "⚠️ No active admin, but {} already exists with another role or status; not bootstrapping",
                bootstrap.email
            );
            return Ok(None);
        }

        let now = Utc::now();
        let admin = User {
            id: Uuid::new_v4(),
            email: bootstrap.email.trim().to_lowercase(),
            full_name: "Administrator".to_string(),
            phone: None,
            password_hash: self.hash_password(&bootstrap.password)?,
            role: UserRole::Admin,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let audit = self
            .recorder
            .stamp(NewAuditEntry::new(EntityType::User, admin.id, "create", admin.id, UserRole::Admin))?;
        let admin = self.store.insert_user(&admin, &[audit]).await?;
        info!("👤 Bootstrap admin {} created", admin.email);
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryStore;

    fn service() -> (Arc<InMemoryStore>, AuthService) {
        let store = Arc::new(InMemoryStore::new());
        let recorder = Arc::new(AuditRecorder::new(store.clone(), 50));
        let jwt = JwtConfig {
            secret: "auth-service-test".to_string(),
            expiration: 60,
        };
        (store.clone(), AuthService::new(store, recorder, jwt, 4))
    }

    fn bootstrap() -> BootstrapAdmin {
        BootstrapAdmin {
            email: "root@fleet.test".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_created_once() {
        let (store, auth) = service();
        assert!(auth.ensure_bootstrap_admin(&bootstrap()).await.unwrap().is_some());
        assert!(auth.ensure_bootstrap_admin(&bootstrap()).await.unwrap().is_none());
        assert_eq!(store.count_active_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_checks_password_and_status() {
        let (store, auth) = service();
        let admin = auth.ensure_bootstrap_admin(&bootstrap()).await.unwrap().unwrap();

        let ok = auth
            .login(&LoginRequest {
                email: "root@fleet.test".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ok.user.id, admin.id);
        assert!(!ok.token.is_empty());

        let wrong = auth
            .login(&LoginRequest {
                email: "root@fleet.test".to_string(),
                password: "battery staple".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(AppError::Unauthenticated(_))));

        store.update_user_status(admin.id, UserStatus::Suspended, &[]).await.unwrap();
        let suspended = auth
            .login(&LoginRequest {
                email: "root@fleet.test".to_string(),
                password: "correct horse".to_string(),
            })
            .await;
        assert!(matches!(suspended, Err(AppError::Unauthenticated(_))));
    }
}
