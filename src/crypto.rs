//! Password hashing for local credentials
//!
//! Local accounts store an Argon2id digest; external-identity accounts
//! never touch this module.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::error::{AppError, Result};

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let digest = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::validation("password", &format!("hashing failed: {}", e)))?
        .to_string();

    Ok(digest)
}

/// Verify a password against a stored digest.
///
/// An unparseable digest verifies as false rather than erroring; the
/// caller cannot do anything useful with the distinction.
pub fn verify_password(password: &str, digest: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let digest = hash_password("correct horse battery").unwrap();

        assert!(verify_password("correct horse battery", &digest));
        assert!(!verify_password("wrong password", &digest));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same input").unwrap();
        let b = hash_password("same input").unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_digest_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
