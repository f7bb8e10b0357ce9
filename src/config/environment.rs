//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Backend del Entity Store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other)),
        }
    }
}

/// Credenciales del administrador inicial
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub store_backend: StoreBackend,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub audit_max_page_size: i64,
    pub bcrypt_cost: u32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{} must be a valid number, got '{}': {}", name, raw, e))
}

impl EnvironmentConfig {
    /// Lee la configuración del proceso (tras `dotenvy`)
    pub fn from_env() -> Result<Self> {
        let bootstrap_admin = match (env::var("BOOTSTRAP_ADMIN_EMAIL"), env::var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            environment: var_or("ENVIRONMENT", "development"),
            port: parsed("PORT", "3000")?,
            host: var_or("HOST", "0.0.0.0"),
            store_backend: var_or("STORE_BACKEND", "postgres").parse()?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiration: parsed("JWT_EXPIRATION", "86400")?,
            cors_origins: var_or("CORS_ORIGINS", "")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS", "120")?,
            rate_limit_window: parsed("RATE_LIMIT_WINDOW", "60")?,
            audit_max_page_size: parsed("AUDIT_MAX_PAGE_SIZE", "200")?,
            bcrypt_cost: parsed("BCRYPT_COST", "12")?,
            bootstrap_admin,
        })
    }

    /// Configuración fija para tests
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            port: 0,
            host: "127.0.0.1".to_string(),
            store_backend: StoreBackend::Memory,
            jwt_secret: "test-secret-with-enough-entropy".to_string(),
            jwt_expiration: 3600,
            cors_origins: Vec::new(),
            rate_limit_requests: 10_000,
            rate_limit_window: 60,
            audit_max_page_size: 200,
            bcrypt_cost: 4,
            bootstrap_admin: None,
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(" Postgres ".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_server_url() {
        let config = EnvironmentConfig::for_tests();
        assert_eq!(config.server_url(), "127.0.0.1:0");
        assert!(!config.is_production());
    }
}
