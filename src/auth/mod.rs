//! 认证原语：JWT、口令哈希、刷新令牌、认证中间件

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;

pub use jwt::JwtService;
pub use password::PasswordHasher;
pub use refresh::RefreshTokenGenerator;
