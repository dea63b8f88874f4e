//! Session-key lifecycle: a single symmetric AES-256 key held as a
//! JWK-style JSON file on disk, generated on first start and loaded on
//! every start after that. No rotation; replacing the file invalidates
//! every outstanding session token.

use std::fmt;
use std::path::Path;

use aes_gcm::{Aes256Gcm, aead::KeyInit};
use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// The length of the AES-256 key in bytes
pub const KEY_LENGTH: usize = 32;

const JWK_KTY: &str = "oct";
const JWK_ALG: &str = "A256GCM";
const JWK_USE: &str = "enc";

#[derive(Debug, Serialize, Deserialize)]
struct JwkFile {
    kty: String,
    #[serde(rename = "use")]
    use_: String,
    alg: String,
    kid: String,
    k: String,
}

#[derive(Clone)]
pub struct SessionKey {
    kid: String,
    key: [u8; KEY_LENGTH],
}

impl SessionKey {
    /// Loads the key file at `path`, or generates and writes one if the
    /// file does not exist. A present-but-unusable file is an error, not
    /// a trigger for regeneration.
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::generate(path)
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session key file {}", path.display()))?;
        let jwk: JwkFile = serde_json::from_str(&raw)
            .with_context(|| format!("Session key file {} is not valid JWK JSON", path.display()))?;

        if jwk.kty != JWK_KTY || jwk.alg != JWK_ALG {
            anyhow::bail!(
                "Session key file {} has unsupported kty/alg ({}/{})",
                path.display(),
                jwk.kty,
                jwk.alg
            );
        }

        let material = URL_SAFE_NO_PAD
            .decode(&jwk.k)
            .context("Session key material is not valid base64url")?;
        let key: [u8; KEY_LENGTH] = material
            .try_into()
            .map_err(|_| anyhow::anyhow!("Session key material is not {KEY_LENGTH} bytes"))?;

        Ok(Self { kid: jwk.kid, key })
    }

    fn generate(path: &Path) -> Result<Self> {
        use rand::RngCore;

        let mut key = [0u8; KEY_LENGTH];
        rand::rng().fill_bytes(&mut key);
        let kid = uuid::Uuid::new_v4().to_string();

        let jwk = JwkFile {
            kty: JWK_KTY.to_string(),
            use_: JWK_USE.to_string(),
            alg: JWK_ALG.to_string(),
            kid: kid.clone(),
            k: URL_SAFE_NO_PAD.encode(key),
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session key directory {}", parent.display())
            })?;
        }

        let body = serde_json::to_string_pretty(&jwk).context("Failed to serialize session key")?;
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write session key file {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {} permissions", path.display()))?;
        }

        tracing::info!("Generated new session key (kid {kid}) at {}", path.display());
        Ok(Self { kid, key })
    }

    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    #[must_use]
    pub fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new((&self.key).into())
    }
}

// Key material stays out of logs.
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("kid", &self.kid)
            .field("key", &"[redacted]")
            .finish()
    }
}
