//! Services module
//!
//! Lógica de negocio: autorización, ciclo de vida de las solicitudes,
//! auditoría, autenticación y reconciliación.

pub mod audit_service;
pub mod auth_service;
pub mod authorization_service;
pub mod lifecycle_service;
pub mod reconciliation_service;

pub use audit_service::AuditRecorder;
pub use auth_service::AuthService;
pub use authorization_service::AuthorizationService;
pub use lifecycle_service::LifecycleEngine;
pub use reconciliation_service::ReconciliationService;
