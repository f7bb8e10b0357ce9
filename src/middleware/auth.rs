//! Autenticación JWT
//!
//! Extractor `Principal`: valida el Bearer token y vuelve a leer el usuario
//! del store, de modo que un cambio de rol o de estado surte efecto en la
//! siguiente petición.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use tracing::debug;
use uuid::Uuid;

use crate::models::auth::Principal;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::{extract_token_from_header, verify_token};

#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated("Authorization token required".to_string()))?;

        let token = extract_token_from_header(auth_header)?;
        let claims = verify_token(token, &state.jwt)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthenticated("Invalid user id in token".to_string()))?;

        let user = state
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User not found".to_string()))?;

        if !user.is_active() {
            return Err(AppError::Unauthenticated("User is inactive or suspended".to_string()));
        }

        debug!("🔐 {} authenticated as {}", user.email, user.role.as_str());
        Ok(Principal::from(&user))
    }
}
