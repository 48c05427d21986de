use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use password_hash::{PasswordHash, PasswordHasher as ArgonPasswordHasher, SaltString};
use rand::rngs::OsRng;
use rand::Rng;

use crate::CrmError;

/// Trait for password hashing and verification.
///
/// The default implementation is [`Argon2Hasher`]. Verification is an exact,
/// case-sensitive comparison of the supplied password with the stored hash.
///
/// ```rust
/// use ulpan_crm::crypto::{Argon2Hasher, PasswordHasher};
///
/// let hasher = Argon2Hasher::default();
/// let hash = hasher.hash("teach123").unwrap();
/// assert!(hasher.verify("teach123", &hash).unwrap());
/// assert!(!hasher.verify("TEACH123", &hash).unwrap());
/// ```
pub trait PasswordHasher: Send + Sync {
    /// # Errors
    ///
    /// Returns `CrmError::Internal` if hashing fails.
    fn hash(&self, password: &str) -> Result<String, CrmError>;

    /// # Errors
    ///
    /// Returns `CrmError::Internal` if the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, CrmError>;

    /// A well-formed hash that no password matches, verified in place of a
    /// stored hash when the username has no active account.
    fn dummy_hash(&self) -> String {
        self.hash("").unwrap_or_default()
    }
}

/// Argon2id password hasher with configurable parameters.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    /// Memory cost in KiB
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Cheap parameters for tests and seeded demo users.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Fixed salt and all-zero 32-byte output of the stand-in hash, in PHC base64.
const DUMMY_SALT: &str = "dWxwYW4tY3JtLWR1bW15";
const DUMMY_OUTPUT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, CrmError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| CrmError::Internal(format!("invalid argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| CrmError::Internal(format!("failed to hash password: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, CrmError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| CrmError::Internal(format!("malformed password hash: {e}")))?;

        // parameters come from the hash itself
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Carries this hasher's parameters, so verifying it costs the same as
    /// verifying a stored hash.
    fn dummy_hash(&self) -> String {
        format!(
            "$argon2id$v=19$m={},t={},p={}${DUMMY_SALT}${DUMMY_OUTPUT}",
            self.memory_cost, self.time_cost, self.parallelism
        )
    }
}

/// Random string of uppercase ASCII letters and digits.
pub fn random_uppercase(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            char::from(CHARSET[idx])
        })
        .collect()
}
