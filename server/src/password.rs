//! Password hashing for the email + password login path.
//!
//! Hashes are Argon2id PHC strings (e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`).
//! Verification goes through `argon2`'s `PasswordVerifier`, which compares in
//! constant time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use color_eyre::eyre::eyre;

/// Hashing scheme used by registration and the credential check
pub trait PasswordScheme: Send + Sync {
    fn hash(&self, password: &str) -> color_eyre::Result<String>;

    /// `Ok(false)` on mismatch, `Err` only when the stored hash is malformed
    fn verify(&self, password: &str, hash: &str) -> color_eyre::Result<bool>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Scheme;

impl PasswordScheme for Argon2Scheme {
    fn hash(&self, password: &str) -> color_eyre::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| eyre!("Failed to hash password: {e}"))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> color_eyre::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| eyre!("Invalid password hash: {e}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let scheme = Argon2Scheme;
        let hash = scheme.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(scheme.verify("correct horse", &hash).unwrap());
        assert!(!scheme.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(Argon2Scheme.verify("anything", "not-a-phc-string").is_err());
    }
}
