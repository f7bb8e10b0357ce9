//! Fleet management backend
//!
//! Usuarios, vehículos y solicitudes de combustible, mantenimiento y
//! condición, con un ciclo de vida por roles y auditoría inmutable.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app;
pub use state::AppState;
