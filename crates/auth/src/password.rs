//! Password hashing with Argon2 (PHC string format).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hashing failed");
            PasswordError::Hashing(e.to_string())
        })
}

/// Returns `Ok(false)` on mismatch; errors are reserved for broken hashes.
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool, PasswordError> {
    if candidate.is_empty() {
        return Ok(false);
    }

    let parsed = PasswordHash::new(stored_hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => {
            debug!("password mismatch");
            Ok(false)
        }
        Err(e) => Err(PasswordError::Hashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "battery staple").unwrap());
        assert!(!verify_password(&hash, "").unwrap());
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn empty_password_is_rejected() {
        assert_eq!(hash_password(""), Err(PasswordError::Empty));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(verify_password("plain-text", "x"), Err(PasswordError::MalformedHash(_))));
    }
}
