use serde::Deserialize;
use validator::Validate;

use crate::models::user::{UserRole, UserStatus};
use crate::utils::validation::validate_phone;

// Request para crear un usuario (admin)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: UserRole,
}

// Request para cambiar el estado de un usuario
#[derive(Debug, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub status: UserStatus,
}
