//! Password hashing service
//!
//! Argon2id with a random 16-byte salt, stored as a PHC string. Verification
//! reads the parameters back out of the stored hash, so changing the hashing
//! parameters never locks out existing users.

use std::sync::OnceLock;

use argon2::password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;

/// Input for the timing-equalizing verification of unknown users
const DUMMY_PASSWORD: &str = "gatehouse-dummy-password";

/// Hashes and verifies passwords
pub struct PasswordHasher {
    params: Argon2Params,
    dummy_hash: OnceLock<Option<String>>,
}

impl PasswordHasher {
    pub fn new(params: Argon2Params) -> Self {
        Self {
            params,
            dummy_hash: OnceLock::new(),
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            None,
        )
        .map_err(|e| Error::hashing(format!("Invalid argon2 params: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password into a PHC string
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt_bytes: [u8; 16] = rand::thread_rng().gen();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::hashing(format!("Failed to encode salt: {}", e)))?;

        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::hashing(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Check a candidate against a stored PHC string
    ///
    /// A mismatch is `Ok(false)`; a stored value that is not a valid hash is
    /// an error.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| Error::hashing(format!("Stored password hash is malformed: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::hashing(format!("Failed to verify password: {}", e))),
        }
    }

    /// Spend roughly the cost of one verification without a real hash
    ///
    /// Used when the user does not exist, so response time does not reveal
    /// whether an identifier is registered.
    pub fn verify_dummy(&self, password: &str) {
        let dummy = self.dummy_hash.get_or_init(|| match self.hash(DUMMY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(error = %e, "dummy hash unavailable, unknown-user timing is not equalized");
                None
            }
        });
        if let Some(hash) = dummy {
            let _ = self.verify(password, hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(Argon2Params {
            memory_cost: 64,
            time_cost: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("password123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("password123"));
        assert!(hasher.verify("password123", &hash).unwrap());
        assert!(!hasher.verify("password124", &hash).unwrap());
    }

    #[test]
    fn test_salt_is_random() {
        let hasher = hasher();
        assert_ne!(hasher.hash("password123").unwrap(), hasher.hash("password123").unwrap());
    }

    #[test]
    fn test_verify_uses_stored_params() {
        let hash = hasher().hash("password123").unwrap();
        let other = PasswordHasher::new(Argon2Params {
            memory_cost: 128,
            time_cost: 2,
            parallelism: 1,
        });
        assert!(other.verify("password123", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let err = hasher().verify("password123", "5f4dcc3b5aa765d61d8327deb882cf99");
        assert!(matches!(err, Err(Error::Hashing(_))));
    }

    #[test]
    fn test_invalid_params_is_error() {
        let hasher = PasswordHasher::new(Argon2Params {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 1,
        });
        assert!(matches!(hasher.hash("password123"), Err(Error::Hashing(_))));
    }

    #[test]
    fn test_verify_dummy_does_not_panic() {
        hasher().verify_dummy("anything");
    }
}
