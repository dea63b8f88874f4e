//! Session-token codec: AES-256-GCM over a JSON claims payload.
//!
//! The wire format is base64url(nonce || ciphertext || tag) with a
//! 12-byte nonce and the 16-byte GCM authentication tag. Any token the
//! key did not seal, or that was modified afterwards, fails to open.

use aes_gcm::{Aes256Gcm, Nonce, aead::Aead};
use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// The length of the AES-GCM nonce in bytes
const NONCE_LENGTH: usize = 12;

/// Claims carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id the session belongs to
    pub sub: i32,
    pub iss: String,
    pub aud: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Seals claims into a compact token. A fresh random nonce makes every
/// token distinct even for identical claims.
pub fn seal(cipher: &Aes256Gcm, claims: &SessionClaims) -> Result<String> {
    use rand::RngCore;

    let payload = serde_json::to_vec(claims).context("Failed to serialize session claims")?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, payload.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to seal session token: {e}"))?;

    let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(&combined))
}

/// Opens a sealed token and returns its claims. Fails on malformed
/// base64, truncation, a wrong key, or a tampered payload.
pub fn open(cipher: &Aes256Gcm, token: &str) -> Result<SessionClaims> {
    let combined = URL_SAFE_NO_PAD
        .decode(token)
        .context("Session token is not valid base64url")?;

    if combined.len() <= NONCE_LENGTH {
        anyhow::bail!("Session token too short");
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
    let nonce = Nonce::from_slice(nonce_bytes);

    let payload = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow::anyhow!("Failed to open session token (wrong key or tampered): {e}"))?;

    serde_json::from_slice(&payload).context("Session token payload is not valid claims JSON")
}
