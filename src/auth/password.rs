//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::{PeacemakingError, Result};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password into a PHC string carrying salt and parameters
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PeacemakingError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PeacemakingError::Internal(format!("Stored password hash is invalid: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("olive-branch-1914").unwrap();
        assert!(hash.starts_with("$argon2id"));
        assert!(verify_password("olive-branch-1914", &hash).unwrap());
        assert!(!verify_password("olive-branch-1915", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same words").unwrap();
        let b = hash_password("same words").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_corrupt_hash_is_internal() {
        assert!(matches!(
            verify_password("whatever", "plaintext"),
            Err(PeacemakingError::Internal(_))
        ));
    }
}
