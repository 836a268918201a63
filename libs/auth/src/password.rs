//! Password and edit-secret hashing
//!
//! Account passwords and event edit secrets are both stored as argon2 PHC
//! strings; the plaintext never reaches storage.

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::{Rng, distributions::Alphanumeric};

/// Length of the secret handed out when an event is created
pub const EDIT_SECRET_LENGTH: usize = 8;

/// Hash a secret with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Check a plaintext secret against a stored hash
///
/// A malformed stored hash is an error, a mismatch is `Ok(false)`.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate the random alphanumeric secret that gates edits of an event
pub fn generate_edit_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EDIT_SECRET_LENGTH)
        .map(char::from)
        .collect()
}
