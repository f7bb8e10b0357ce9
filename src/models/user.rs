//! Modelo de User
//!
//! Usuarios del sistema de flota. Un "owner" (o "driver") es simplemente un
//! usuario con ese rol; no existe una tabla de propietarios aparte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Rol del usuario - mapea al ENUM user_role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    #[serde(alias = "driver")]
    Owner,
    Auditor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Owner => "owner",
            UserRole::Auditor => "auditor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "manager" => Some(UserRole::Manager),
            "owner" | "driver" => Some(UserRole::Owner),
            "auditor" => Some(UserRole::Auditor),
            _ => None,
        }
    }
}

/// Estado del usuario - mapea al ENUM user_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }
}

/// User - mapea a la tabla users
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active && self.deleted_at.is_none()
    }
}

/// Filtros para listados de usuarios
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilters {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_accepts_driver_alias() {
        assert_eq!(UserRole::parse("driver"), Some(UserRole::Owner));
        assert_eq!(UserRole::parse(" Manager "), Some(UserRole::Manager));
        assert_eq!(UserRole::parse("root"), None);
    }

    #[test]
    fn test_role_serde_alias() {
        let role: UserRole = serde_json::from_str("\"driver\"").unwrap();
        assert_eq!(role, UserRole::Owner);
        assert_eq!(serde_json::to_string(&UserRole::Owner).unwrap(), "\"owner\"");
    }
}
