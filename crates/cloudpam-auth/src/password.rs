//! Password hashing atop `argon2`, memory-hard with a per-password salt.
//! Parameters are tuned so a single verify takes roughly 100ms on
//! commodity hardware, per the configured cost.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params};

use cloudpam_core::validation::validate_password;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("{0}")]
    Policy(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Tunable cost parameters. Defaults target ~100ms verify time; callers
/// running on constrained hardware (tests, CI) can lower them.
#[derive(Debug, Clone, Copy)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self { memory_kib: 19 * 1024, iterations: 2, parallelism: 1 }
    }
}

impl HashCost {
    /// Much cheaper parameters for tests, where real cost only slows the suite.
    #[must_use]
    pub fn insecure_for_tests() -> Self {
        Self { memory_kib: 8, iterations: 1, parallelism: 1 }
    }

    fn argon2(self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
    }
}

/// Validates the password against policy and returns its PHC-formatted hash.
pub fn hash_password(password: &str, cost: HashCost) -> Result<String, PasswordError> {
    validate_password(password).map_err(|e| PasswordError::Policy(e.to_string()))?;
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = cost.argon2()?;
    let hash = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash. Any malformed hash or
/// mismatch is reported as `false`, never an error — callers should treat
/// both identically to avoid leaking which case occurred.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("correct horse battery staple", HashCost::insecure_for_tests()).unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password entirely", &hash));
    }

    #[test]
    fn rejects_passwords_outside_policy() {
        let err = hash_password("short", HashCost::insecure_for_tests()).unwrap_err();
        assert!(matches!(err, PasswordError::Policy(_)));
    }

    #[test]
    fn malformed_hash_fails_closed() {
        assert!(!verify_password("anything", "not a phc hash"));
    }
}
