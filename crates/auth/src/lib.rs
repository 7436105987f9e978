use argon2::password_hash::{Error as PasswordHashError, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::thread_rng;

pub fn hash_password(raw: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut thread_rng());
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(raw.as_bytes(), &salt)?.to_string();
    Ok(hash)
}

/// Verifies a candidate against the stored credential. Rows written before
/// the hashing migration hold the raw password; anything that does not parse
/// as a PHC string is compared byte-for-byte instead.
pub fn verify_password(raw: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => !stored.is_empty() && raw.as_bytes() == stored.as_bytes(),
    }
}
