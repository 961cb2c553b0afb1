use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use std::sync::LazyLock;
use tracing::error;

use crate::error::ZakiError;

/// Hash compared against when the account does not exist, so unknown emails
/// cost the same Argon2 work as wrong passwords.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    hash_password("zaki-dummy-password")
        .inspect_err(|e| error!(error = %e, "failed to prepare dummy password hash"))
        .ok()
});

pub fn validate_password(password: &str, min_len: usize) -> Result<(), ZakiError> {
    if password.chars().count() < min_len {
        return Err(ZakiError::WeakPassword { min: min_len });
    }
    Ok(())
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, ZakiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ZakiError::PasswordHash)
}

/// Run a verification that always fails.
pub fn burn_verify(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), ZakiError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| ZakiError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ZakiError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("sesame-123").expect("hashing works");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("sesame-123", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(ZakiError::InvalidCredentials)
        ));
    }

    #[test]
    fn dummy_hash_rejects_any_password() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash prepared");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("sesame-123", hash).is_err());
        burn_verify("sesame-123");
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            validate_password("abc", 6),
            Err(ZakiError::WeakPassword { min: 6 })
        ));
        // counted in characters, not bytes
        assert!(validate_password("كلمةسر", 6).is_ok());
    }
}
