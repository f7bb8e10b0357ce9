//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean al schema PostgreSQL
//! con enums cerrados para roles, estados y condiciones.

pub mod audit_log;
pub mod auth;
pub mod request;
pub mod user;
pub mod vehicle;
