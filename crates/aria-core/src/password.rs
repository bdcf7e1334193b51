//! Password hashing (argon2, PHC strings).

use crate::error::CoreError;

/// Verifies a password against a stored PHC hash.
///
/// An unparsable hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> Result<String, CoreError> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("korrekt-hest").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("korrekt-hest", &hash));
        assert!(!verify_password("feil-hest", &hash));
        assert!(!verify_password("korrekt-hest", "not-a-hash"));
    }
}
