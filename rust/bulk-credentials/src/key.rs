//! Storage account key used to sign delegation tokens.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{MintError, Secret};

/// Storage account signing key.
///
/// Built from the base64 account key held by the secret provider. The raw
/// key bytes never leave this type.
#[derive(Clone)]
pub struct AccountKey(Hmac<Sha256>);

impl AccountKey {
    /// Decode an account key from its base64 secret form.
    pub(crate) fn decode(secret: &Secret) -> Result<Self, MintError> {
        let bytes = STANDARD
            .decode(secret.expose().trim())
            .map_err(|e| MintError::SigningFailure(format!("account key is not base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(MintError::SigningFailure("account key is empty".into()));
        }
        let mac = Hmac::<Sha256>::new_from_slice(&bytes)
            .map_err(|e| MintError::SigningFailure(e.to_string()))?;
        Ok(Self(mac))
    }

    /// Sign a message, returning the base64 encoded HMAC-SHA256.
    pub fn sign(&self, message: &[u8]) -> String {
        let mut mac = self.0.clone();
        mac.update(message);
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccountKey(<redacted>)")
    }
}
