use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

const SALT_DELIMITER: char = '$';

/// Prefix the password with `email + "$"`.
///
/// Stored digests were produced this way, so the prefix must stay stable.
/// It is derived from the email and therefore not secret; argon2 still adds
/// its own random salt inside the PHC string.
fn salted(email: &str, plain: &str) -> String {
    format!("{email}{SALT_DELIMITER}{plain}")
}

pub fn hash_password(email: &str, plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(salted(email, plain).as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(email: &str, plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(salted(email, plain).as_bytes(), &parsed)
        .is_ok())
}
