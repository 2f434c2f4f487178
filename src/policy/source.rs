//! Default secret material source

use crate::domain::ports::SecretSource;
use crate::error::Result;

/// bcrypt cost factor for the console shared password
pub const BCRYPT_COST: u32 = 10;

/// UUIDv4 tokens from the OS random source and bcrypt password hashes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSecretSource;

impl SecretSource for SystemSecretSource {
    fn random_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn hash_password(&self, plaintext: &str) -> Result<String> {
        Ok(bcrypt::hash(plaintext, BCRYPT_COST)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let source = SystemSecretSource;
        let a = source.random_token();
        let b = source.random_token();
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_verifies_against_plaintext() {
        let hash = SystemSecretSource.hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(hash.contains("$10$"));
        assert!(bcrypt::verify("hunter22", &hash).unwrap());
        assert!(!bcrypt::verify("hunter23", &hash).unwrap());
    }
}
