//! Field-level encryption for profile values.
//!
//! Tokens have the form `base64(nonce):base64(ciphertext)` where the
//! plaintext is the JSON serialization of the value, the nonce is 12 random
//! bytes and the key is PBKDF2-HMAC-SHA256 over the account secret.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use moka::sync::Cache;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CryptoSettings;

pub const DEFAULT_SALT: &str = "collegeTrackerSalt";
pub const DEFAULT_ITERATIONS: u32 = 100_000;
pub const DEFAULT_KEY_CACHE_SIZE: u64 = 1_024;

const NONCE_LEN: usize = 12;

pub type DerivedKey = [u8; 32];

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Failed to encrypt field: {0}")]
    Encryption(String),

    /// Deliberately carries no detail about which step failed
    #[error("Failed to decrypt field")]
    Decryption,
}

/// Encrypts and decrypts individual profile fields.
///
/// Cloning is cheap; clones share the derived-key cache.
#[derive(Clone)]
pub struct FieldCipher {
    salt: String,
    iterations: u32,
    keys: Cache<[u8; 32], DerivedKey>,
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("salt", &self.salt)
            .field("iterations", &self.iterations)
            .field("cached_keys", &self.keys.entry_count())
            .finish()
    }
}

impl FieldCipher {
    pub fn new(salt: impl Into<String>, iterations: u32, key_cache_size: u64) -> Self {
        Self {
            salt: salt.into(),
            iterations: iterations.max(1),
            keys: Cache::new(key_cache_size),
        }
    }

    pub fn from_settings(settings: &CryptoSettings) -> Self {
        Self::new(settings.salt.clone(), settings.iterations, settings.key_cache_size)
    }

    /// PBKDF2-HMAC-SHA256 key for `secret`, memoized per secret digest
    pub fn derive_key(&self, secret: &str) -> DerivedKey {
        let digest: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        self.keys.get_with(digest, || {
            let mut key = [0u8; 32];
            pbkdf2::pbkdf2_hmac::<Sha256>(
                secret.as_bytes(),
                self.salt.as_bytes(),
                self.iterations,
                &mut key,
            );
            key
        })
    }

    pub fn encrypt_field<T: Serialize + ?Sized>(&self, secret: &str, value: &T) -> Result<String, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        self.encrypt_with_nonce(secret, value, nonce)
    }

    pub(crate) fn encrypt_with_nonce<T: Serialize + ?Sized>(
        &self,
        secret: &str,
        value: &T,
        nonce: [u8; NONCE_LEN],
    ) -> Result<String, CryptoError> {
        let plaintext = serde_json::to_vec(value).map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let key = self.derive_key(secret);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok(format!("{}:{}", BASE64.encode(nonce), BASE64.encode(ciphertext)))
    }

    /// Reverse of [`FieldCipher::encrypt_field`]. Any malformed token, tag
    /// mismatch or non-JSON plaintext is [`CryptoError::Decryption`].
    pub fn decrypt_field<T: DeserializeOwned>(&self, secret: &str, token: &str) -> Result<T, CryptoError> {
        let (nonce_b64, ciphertext_b64) = token.split_once(':').ok_or(CryptoError::Decryption)?;

        let nonce = BASE64
            .decode(nonce_b64.as_bytes())
            .map_err(|_| CryptoError::Decryption)?;
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::Decryption);
        }
        let ciphertext = BASE64
            .decode(ciphertext_b64.as_bytes())
            .map_err(|_| CryptoError::Decryption)?;

        let key = self.derive_key(secret);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Decryption)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| CryptoError::Decryption)?;

        serde_json::from_slice(&plaintext).map_err(|_| CryptoError::Decryption)
    }
}

impl Default for FieldCipher {
    fn default() -> Self {
        Self::new(DEFAULT_SALT, DEFAULT_ITERATIONS, DEFAULT_KEY_CACHE_SIZE)
    }
}
