//! Sistema de manejo de errores
//!
//! Este módulo define la taxonomía de errores del sistema de flota
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Precondición optimista fallida o recurso duplicado
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        entity_id: Option<Uuid>,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// La transición pedida no existe en el grafo de estados
    #[error("Invalid transition for {entity_type}: {from} -> {to}")]
    InvalidTransition {
        entity_type: String,
        from: String,
        to: String,
    },

    /// Entity Store o Audit Recorder inalcanzables
    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Dependency(format!("database: {}", e))
    }
}

impl AppError {
    /// Código estable del tipo de error, usado por la capa de presentación
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::Dependency(_) => "DEPENDENCY_ERROR",
            AppError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code().to_string();

        let (error, message, details) = match self {
            AppError::Unauthenticated(msg) => {
                tracing::warn!("🔒 Unauthenticated: {}", msg);
                ("Unauthorized", msg, None)
            }
            AppError::Forbidden(msg) => {
                tracing::warn!("⛔ Forbidden: {}", msg);
                ("Forbidden", msg, None)
            }
            AppError::NotFound(msg) => {
                tracing::debug!("🔍 Not found: {}", msg);
                ("Not Found", msg, None)
            }
            AppError::Validation(e) => {
                tracing::debug!("📝 Validation error: {}", e);
                (
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    Some(json!(e)),
                )
            }
            AppError::BadRequest(msg) => {
                tracing::debug!("📝 Bad request: {}", msg);
                ("Bad Request", msg, None)
            }
            AppError::Conflict { message, entity_id, expected, actual } => {
                tracing::info!("⚠️ Conflict: {}", message);
                let details = if entity_id.is_some() || expected.is_some() || actual.is_some() {
                    Some(json!({
                        "entity_id": entity_id,
                        "expected": expected,
                        "actual": actual,
                    }))
                } else {
                    None
                };
                ("Conflict", message, details)
            }
            AppError::InvalidTransition { entity_type, from, to } => {
                tracing::info!("⚠️ Invalid transition {}: {} -> {}", entity_type, from, to);
                (
                    "Invalid Transition",
                    format!("{} cannot move from '{}' to '{}'", entity_type, from, to),
                    Some(json!({ "entity_type": entity_type, "from": from, "to": to })),
                )
            }
            AppError::Dependency(msg) => {
                tracing::error!("❌ Dependency error: {}", msg);
                (
                    "Service Unavailable",
                    "A backing service is unavailable".to_string(),
                    Some(json!({ "dependency_error": msg })),
                )
            }
            AppError::RateLimitExceeded => {
                tracing::warn!("🚦 Rate limit exceeded");
                (
                    "Rate Limit Exceeded",
                    "Too many requests. Please try again later".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("❌ Internal error: {}", msg);
                (
                    "Internal Server Error",
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            details,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(message.into());

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: Uuid) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de recurso duplicado
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict {
        message: format!("{} with {} '{}' already exists", resource, field, value),
        entity_id: None,
        expected: None,
        actual: None,
    }
}

/// Función helper para el fallo de la precondición de estado
pub fn status_conflict_error(resource: &str, id: Uuid, expected: &str, actual: &str) -> AppError {
    AppError::Conflict {
        message: format!(
            "{} '{}' is '{}', expected '{}'; reload and decide again",
            resource, id, actual, expected
        ),
        entity_id: Some(id),
        expected: Some(expected.to_string()),
        actual: Some(actual.to_string()),
    }
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthenticated("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(not_found_error("Vehicle", Uuid::nil()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(bad_request_error("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_conflict_error("FuelRequest", Uuid::nil(), "pending", "approved").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Dependency("down".into()).status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invalid_transition_has_its_own_code() {
        let err = AppError::InvalidTransition {
            entity_type: "MaintenanceRequest".into(),
            from: "pending".into(),
            to: "in_progress".into(),
        };
        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_conflict_carries_context() {
        let id = Uuid::new_v4();
        match status_conflict_error("FuelRequest", id, "pending", "approved") {
            AppError::Conflict { entity_id, expected, actual, .. } => {
                assert_eq!(entity_id, Some(id));
                assert_eq!(expected.as_deref(), Some("pending"));
                assert_eq!(actual.as_deref(), Some("approved"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
