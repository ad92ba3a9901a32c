//! 业务服务层

pub mod audit_recorder;
pub mod auth_service;
pub mod car_service;
pub mod seed_service;
pub mod token_service;

pub use audit_recorder::AuditRecorder;
pub use auth_service::AuthService;
pub use car_service::CarService;
pub use token_service::TokenService;
