//! Middleware del sistema
//!
//! Este módulo contiene el extractor de autenticación, CORS y rate limiting.

pub mod auth;
pub mod cors;
pub mod extract;
pub mod rate_limit;

pub use cors::*;
pub use rate_limit::*;
