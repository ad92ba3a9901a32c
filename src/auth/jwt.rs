//! JWT access token generation and validation
//! The refresh credential is opaque and lives in `auth::refresh`

use crate::{config::AppConfig, error::AppError, models::user::User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Email
    pub email: String,

    /// Username
    pub name: String,

    pub first_name: String,
    pub last_name: String,
    pub full_name: String,

    /// Assigned role names
    pub roles: Vec<String>,

    /// Permission claims, carried verbatim
    pub permissions: Vec<String>,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID (unique token identifier)
    pub jti: String,
}

/// JWT service
///
/// Holds the signing configuration explicitly; nothing is read from
/// ambient/static state.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config.security.jwt_secret.expose_secret();

        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        Ok(Self {
            encoding_key,
            decoding_key,
            issuer: config.security.jwt_issuer.clone(),
            audience: config.security.jwt_audience.clone(),
            access_token_exp_secs: config.security.access_token_exp_secs,
        })
    }

    /// Generate a signed access token for the user
    /// Returns the encoded token and its expiry timestamp
    pub fn generate_access_token(
        &self,
        user: &User,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let expiration = now + Duration::seconds(self.access_token_exp_secs as i64);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            roles,
            permissions,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode access token: {:?}", e);
            AppError::Internal(format!("Failed to encode access token: {}", e))
        })?;

        Ok((token, expiration))
    }

    /// Validate and decode an access token
    /// Signature, issuer and audience must all check out before any claim
    /// is trusted
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                AppError::Unauthorized
            })?
            .claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    // Mock config for testing
    fn test_config() -> AppConfig {
        AppConfig {
            server: crate::config::ServerConfig {
                addr: "127.0.0.1:3000".to_string(),
                graceful_shutdown_timeout_secs: 30,
            },
            database: crate::config::DatabaseConfig {
                url: Secret::new("postgresql://localhost/test".to_string()),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_secs: 30,
                idle_timeout_secs: 600,
                max_lifetime_secs: 1800,
            },
            audit: crate::config::AuditStoreConfig {
                url: None,
                max_connections: 5,
                acquire_timeout_secs: 10,
            },
            logging: crate::config::LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
            security: crate::config::SecurityConfig {
                jwt_secret: Secret::new("test_secret_key_32_characters_long!".to_string()),
                jwt_issuer: "fleet-system".to_string(),
                jwt_audience: "fleet-admin".to_string(),
                access_token_exp_secs: 3600,
                refresh_token_exp_days: 7,
                refresh_token_retention_days: 30,
                token_sweep_interval_secs: 3600,
                password_min_length: 8,
                password_require_uppercase: true,
                password_require_digit: true,
                password_require_special: false,
                trust_proxy: true,
                seed_admin_email: "admin@fleet.local".to_string(),
                seed_admin_password: None,
            },
        }
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            username: "jane@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let user = test_user();

        let (token, expires_at) = service
            .generate_access_token(
                &user,
                vec!["Admin".to_string()],
                vec!["cars.manage".to_string()],
            )
            .unwrap();

        assert!(expires_at > Utc::now());

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.full_name, "Jane Doe");
        assert_eq!(claims.iss, "fleet-system");
        assert_eq!(claims.aud, "fleet-admin");
        assert!(claims.roles.contains(&"Admin".to_string()));
        assert!(claims.permissions.contains(&"cars.manage".to_string()));
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let service = JwtService::from_config(&test_config()).unwrap();

        let mut other_config = test_config();
        other_config.security.jwt_issuer = "someone-else".to_string();
        let other_service = JwtService::from_config(&other_config).unwrap();

        let (token, _) = other_service
            .generate_access_token(&test_user(), vec![], vec![])
            .unwrap();

        assert!(service.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_audience_mismatch_rejected() {
        let service = JwtService::from_config(&test_config()).unwrap();

        let mut other_config = test_config();
        other_config.security.jwt_audience = "other-app".to_string();
        let other_service = JwtService::from_config(&other_config).unwrap();

        let (token, _) = other_service
            .generate_access_token(&test_user(), vec![], vec![])
            .unwrap();

        assert!(service.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_invalid_token_fails() {
        let service = JwtService::from_config(&test_config()).unwrap();
        assert!(service.validate_access_token("invalid_token").is_err());
    }

    #[test]
    fn test_tampered_signature_fails() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let (token, _) = service
            .generate_access_token(&test_user(), vec![], vec![])
            .unwrap();

        let mut tampered = token;
        tampered.pop();
        tampered.push('x');
        assert!(service.validate_access_token(&tampered).is_err());
    }
}
