//! Utilidades JWT
//!
//! Emisión y verificación de tokens HS256 para el login.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::models::auth::JwtClaims;
use crate::models::user::UserRole;
use crate::utils::errors::AppError;

/// Configuración de JWT
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: u64,
}

impl From<&EnvironmentConfig> for JwtConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration: config.jwt_expiration,
        }
    }
}

/// Generar JWT token para un usuario; devuelve el token y su expiración
pub fn generate_token(user_id: Uuid, role: UserRole, config: &JwtConfig) -> Result<(String, DateTime<Utc>), AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(config.expiration as i64);

    let claims = JwtClaims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
    let token = encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;
    Ok((token, expires_at))
}

/// Verificar y decodificar JWT token
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<JwtClaims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

    let token_data = decode::<JwtClaims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Extraer token del header Authorization
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AppError> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthenticated("Authorization header must start with 'Bearer '".to_string()))?
        .trim();
    if token.is_empty() {
        return Err(AppError::Unauthenticated("Token must not be empty".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret".to_string(),
            expiration: 60,
        }
    }

    #[test]
    fn test_token_carries_subject_and_role() {
        let user_id = Uuid::new_v4();
        let (token, expires_at) = generate_token(user_id, UserRole::Manager, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let (token, _) = generate_token(Uuid::new_v4(), UserRole::Admin, &config()).unwrap();
        let other = JwtConfig {
            secret: "another-secret".to_string(),
            expiration: 60,
        };
        assert!(matches!(verify_token(&token, &other), Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
    }
}
