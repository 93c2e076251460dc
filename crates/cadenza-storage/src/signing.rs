//! Signed write URLs for backends that receive uploads through this service.
//!
//! Signature = hex(HMAC-SHA256(secret, "PUT\n{key}\n{expires}")), `expires` being a unix
//! timestamp in seconds. The URL carries `expires` and `signature` as query parameters.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::keys::encode_key;
use crate::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UploadSigner {
    secret: Arc<[u8]>,
}

impl fmt::Debug for UploadSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSigner").finish_non_exhaustive()
    }
}

impl UploadSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    fn mac(&self, storage_key: &str, expires: i64) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;
        mac.update(format!("PUT\n{}\n{}", storage_key, expires).as_bytes());
        Ok(mac)
    }

    pub fn sign(&self, storage_key: &str, expires: i64) -> StorageResult<String> {
        let tag = self.mac(storage_key, expires)?.finalize().into_bytes();
        Ok(hex::encode(tag))
    }

    /// Build a signed `PUT` URL under `base_url`
    pub fn signed_url(
        &self,
        base_url: &str,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        let signature = self.sign(storage_key, expires)?;
        Ok(format!(
            "{}/{}?expires={}&signature={}",
            base_url.trim_end_matches('/'),
            encode_key(storage_key),
            expires,
            signature
        ))
    }

    pub fn verify(&self, storage_key: &str, expires: i64, signature: &str) -> StorageResult<()> {
        self.verify_at(storage_key, expires, signature, Utc::now().timestamp())
    }

    /// Verify against an explicit clock; comparison is constant-time
    pub fn verify_at(
        &self,
        storage_key: &str,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> StorageResult<()> {
        if now > expires {
            return Err(StorageError::InvalidSignature(
                "Upload URL has expired".to_string(),
            ));
        }
        let tag = hex::decode(signature)
            .map_err(|_| StorageError::InvalidSignature("Malformed signature".to_string()))?;
        self.mac(storage_key, expires)?
            .verify_slice(&tag)
            .map_err(|_| StorageError::InvalidSignature("Signature does not match".to_string()))
    }
}
