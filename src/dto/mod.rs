pub mod audit_dto;
pub mod common_dto;
pub mod request_dto;
pub mod user_dto;
pub mod vehicle_dto;
