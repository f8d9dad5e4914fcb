//! Password hashing parameters and strength policy

use serde::{Deserialize, Serialize};

/// Default Argon2id parameters (OWASP minimum recommendation)
pub const DEFAULT_MEMORY_COST: u32 = 19456; // 19 MiB
pub const DEFAULT_TIME_COST: u32 = 2;
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Default minimum password length in characters
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound on password size in bytes, keeps hashing cost bounded
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Argon2id parameters used when hashing new passwords
///
/// Verification always uses the parameters encoded in the stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Number of iterations
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Check the parameters against the ranges argon2 accepts
    pub fn validate(&self) -> std::result::Result<(), String> {
        argon2::Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map(|_| ())
            .map_err(|e| format!("Invalid argon2 parameters: {}", e))
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_cost: DEFAULT_MEMORY_COST,
            time_cost: DEFAULT_TIME_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// Minimum password strength enforced on registration and password change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Returns the rejection message, or `None` when the password is acceptable
    pub fn check(&self, password: &str) -> Option<String> {
        if password.chars().count() < self.min_length {
            return Some(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Some(format!(
                "Password must be at most {} bytes long",
                MAX_PASSWORD_BYTES
            ));
        }
        if password.chars().all(|c| c.is_ascii_digit()) {
            return Some("Password must not consist of digits only".to_string());
        }
        None
    }
}
