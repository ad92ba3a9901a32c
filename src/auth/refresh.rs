//! Opaque refresh token generation and hashing
//! The token value carries no embedded structure; callers treat it as an
//! uninterpreted bearer value

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Number of random characters in a refresh token value.
/// 48 alphanumeric chars ≈ 285 bits of entropy.
const TOKEN_LEN: usize = 48;

/// Refresh token generator
pub struct RefreshTokenGenerator;

impl RefreshTokenGenerator {
    /// Generate a new refresh token value
    /// Format: rt_<48-char-random>
    pub fn generate() -> String {
        let random: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        format!("rt_{}", random)
    }

    /// Hash a token value for storage using SHA-256
    pub fn hash(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_refresh_token() {
        let token = RefreshTokenGenerator::generate();
        assert!(token.starts_with("rt_"));
        assert_eq!(token.len(), 51); // "rt_" (3 chars) + 48 chars
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = RefreshTokenGenerator::generate();
        let b = RefreshTokenGenerator::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let token = RefreshTokenGenerator::generate();
        let hash1 = RefreshTokenGenerator::hash(&token);
        let hash2 = RefreshTokenGenerator::hash(&token);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_is_different_for_different_tokens() {
        let hash1 = RefreshTokenGenerator::hash("rt_aaaaaaaa");
        let hash2 = RefreshTokenGenerator::hash("rt_bbbbbbbb");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_length() {
        let hash = RefreshTokenGenerator::hash("rt_test");
        // SHA-256 produces 64 hex characters
        assert_eq!(hash.len(), 64);
    }
}
