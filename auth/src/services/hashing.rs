use crate::error::AuthError;
use anyhow::Context;

const BCRYPT_COST: u32 = 10;

/// Hashes a password off the async runtime. bcrypt burns tens of milliseconds
/// of CPU per call, which would stall the worker otherwise.
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(&password, BCRYPT_COST))
        .await
        .context("password hashing task panicked")?
        .context("failed to hash password")
        .map_err(AuthError::Internal)
}

/// Verifies a password against a stored bcrypt hash on the blocking pool.
/// An unparsable hash counts as a mismatch rather than an error so a bad
/// stored value cannot leak through the generic login failure message.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
        .await
        .context("password verification task panicked")?
        .unwrap_or(false);
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_round_trip() {
        let hash = hash_password("hunter2!").await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("hunter2!", &hash).await.unwrap());
        assert!(!verify_password("hunter3!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("hunter2!", "not-a-bcrypt-hash").await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let first = hash_password("same password").await.unwrap();
        let second = hash_password("same password").await.unwrap();
        assert_ne!(first, second);
    }
}
