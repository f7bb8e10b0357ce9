pub mod audit_controller;
pub mod auth_controller;
pub mod request_controller;
pub mod user_controller;
pub mod vehicle_controller;
