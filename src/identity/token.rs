//! Opaque bearer tokens.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Create a new random token.
/// The raw value is only handed to the client; stores keep its hash.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token so raw values never sit in a store.
#[must_use]
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn generate_token_is_url_safe_32_bytes() {
        let token = generate_token();
        assert!(token.is_ok());
        let token = token.unwrap_or_default();
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes());
        assert_eq!(decoded.map(|bytes| bytes.len()).ok(), Some(32));
    }

    #[test]
    fn generate_token_is_random() {
        let first = generate_token().unwrap_or_default();
        let second = generate_token().unwrap_or_default();
        assert_ne!(first, second);
    }

    #[test]
    fn hash_token_is_sha256() {
        let hash = hash_token("token");
        assert_eq!(hash.len(), 32);
        assert_eq!(hash, hash_token("token"));
        assert_ne!(hash, hash_token("other"));
    }
}
