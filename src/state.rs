//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::repositories::FleetStore;
use crate::services::{AuditRecorder, AuthService, LifecycleEngine, ReconciliationService};
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FleetStore>,
    pub recorder: Arc<AuditRecorder>,
    pub lifecycle: Arc<LifecycleEngine>,
    pub auth: Arc<AuthService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub config: EnvironmentConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitState,
}

impl AppState {
    pub fn new(store: Arc<dyn FleetStore>, config: EnvironmentConfig) -> Self {
        let jwt = JwtConfig::from(&config);
        let recorder = Arc::new(AuditRecorder::new(Arc::clone(&store), config.audit_max_page_size));
        let lifecycle = Arc::new(LifecycleEngine::new(Arc::clone(&store), Arc::clone(&recorder)));
        let auth = Arc::new(AuthService::new(
            Arc::clone(&store),
            Arc::clone(&recorder),
            jwt.clone(),
            config.bcrypt_cost,
        ));
        let reconciliation = Arc::new(ReconciliationService::new(Arc::clone(&store), Arc::clone(&recorder)));

        Self {
            rate_limit: RateLimitState::new(&config),
            store,
            recorder,
            lifecycle,
            auth,
            reconciliation,
            config,
            jwt,
        }
    }
}
