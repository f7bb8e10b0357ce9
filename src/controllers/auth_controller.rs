use std::sync::Arc;

use crate::models::auth::{LoginRequest, LoginResponse, Principal};
use crate::models::user::User;
use crate::repositories::FleetStore;
use crate::services::AuthService;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, not_found_error, AppResult};

pub struct AuthController {
    store: Arc<dyn FleetStore>,
    auth: Arc<AuthService>,
}

impl AuthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            auth: Arc::clone(&state.auth),
        }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(bad_request_error("email and password are required"));
        }
        self.auth.login(&request).await
    }

    pub async fn me(&self, principal: &Principal) -> AppResult<User> {
        self.store
            .get_user(principal.user_id)
            .await?
            .ok_or_else(|| not_found_error("User", principal.user_id))
    }
}
