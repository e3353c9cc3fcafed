use pasetors::Local;
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::{LocalToken, V4};
use sha2::{Digest, Sha256};

use super::Storage;
use crate::error::Error;

/// 256-bit key for [`EncryptedStorage`].
#[derive(Clone)]
pub struct StorageKey {
    bytes: [u8; 32],
}

impl StorageKey {
    /// Parses a hex-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the hex is invalid or the key length is not 32 bytes.
    pub fn from_hex(key_hex: &str) -> Result<Self, Error> {
        let bytes =
            hex::decode(key_hex).map_err(|e| Error::Config(format!("invalid key hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(Error::Config(format!(
                "invalid key length: expected 32, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self { bytes: arr })
    }

    /// Derives a key from an arbitrary secret (SHA-256 of its bytes).
    #[must_use]
    pub fn derive(secret: &str) -> Self {
        Self {
            bytes: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// 64 hex characters are taken as a raw key, anything else is derived.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        if secret.len() == 64 {
            if let Ok(key) = Self::from_hex(secret) {
                return key;
            }
        }
        Self::derive(secret)
    }

    fn symmetric(&self) -> Result<SymmetricKey<V4>, Error> {
        SymmetricKey::<V4>::from(&self.bytes).map_err(|e| Error::Storage(e.to_string()))
    }
}

impl std::fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StorageKey(..)")
    }
}

/// Storage wrapper that encrypts every value as a PASETO `v4.local` token.
///
/// The storage key is bound as the implicit assertion, so a ciphertext copied
/// under a different key fails to decrypt.
pub struct EncryptedStorage<S> {
    inner: S,
    key: StorageKey,
}

impl<S: Storage> EncryptedStorage<S> {
    #[must_use]
    pub fn new(inner: S, key: StorageKey) -> Self {
        Self { inner, key }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Storage> Storage for EncryptedStorage<S> {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let Some(token) = self.inner.get(key)? else {
            return Ok(None);
        };

        let sk = self.key.symmetric()?;
        let untrusted = UntrustedToken::<Local, V4>::try_from(token.as_str())
            .map_err(|e| Error::Storage(format!("{key}: {e}")))?;
        let trusted = LocalToken::decrypt(&sk, &untrusted, None, Some(key.as_bytes()))
            .map_err(|e| Error::Storage(format!("{key}: {e}")))?;

        Ok(Some(trusted.payload().to_owned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let sk = self.key.symmetric()?;
        let token = LocalToken::encrypt(&sk, value.as_bytes(), None, Some(key.as_bytes()))
            .map_err(|e| Error::Storage(format!("{key}: {e}")))?;
        self.inner.set(key, &token)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn roundtrip_hides_plaintext() {
        let storage = EncryptedStorage::new(MemoryStorage::new(), StorageKey::derive("build-secret"));
        storage.set("jwtToken", "{\"access_token\":\"T1\"}").unwrap();

        let raw = storage.inner().raw("jwtToken").unwrap();
        assert!(raw.starts_with("v4.local."));
        assert!(!raw.contains("T1"));

        assert_eq!(
            storage.get("jwtToken").unwrap().as_deref(),
            Some("{\"access_token\":\"T1\"}")
        );
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let writer = EncryptedStorage::new(MemoryStorage::new(), StorageKey::derive("one"));
        writer.set("k", "secret").unwrap();
        let raw = writer.inner().raw("k").unwrap();

        let other = MemoryStorage::new();
        other.set("k", &raw).unwrap();
        let reader = EncryptedStorage::new(other, StorageKey::derive("two"));
        assert!(reader.get("k").is_err());
    }

    #[test]
    fn value_moved_to_another_key_fails() {
        let storage = EncryptedStorage::new(MemoryStorage::new(), StorageKey::derive("s"));
        storage.set("a", "value").unwrap();
        let raw = storage.inner().raw("a").unwrap();
        storage.inner().set("b", &raw).unwrap();
        assert!(storage.get("b").is_err());
    }

    #[test]
    fn plaintext_value_is_an_error() {
        let storage = EncryptedStorage::new(MemoryStorage::new(), StorageKey::derive("s"));
        storage.inner().set("k", "not a token").unwrap();
        assert!(storage.get("k").is_err());
    }

    #[test]
    fn key_parsing() {
        let hex_key = "00".repeat(32);
        assert!(StorageKey::from_hex(&hex_key).is_ok());
        assert!(StorageKey::from_hex("abcd").is_err());
        assert!(StorageKey::from_hex("zz").is_err());

        let a = StorageKey::from_secret(&hex_key);
        let b = StorageKey::from_hex(&hex_key).unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_ne!(StorageKey::from_secret("short").bytes, b.bytes);
    }
}
