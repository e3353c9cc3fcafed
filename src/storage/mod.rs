//! Key/value persistence behind the token store.
//!
//! [`Storage`] is the seam between the session logic and wherever the bytes
//! end up: [`MemoryStorage`] for tests and short-lived processes,
//! [`FileStorage`] for a JSON file that survives restarts, and (with the
//! `encryption` feature) [`EncryptedStorage`] wrapping either of them.

#[cfg(feature = "encryption")]
mod encrypted;
mod file;
mod memory;

#[cfg(feature = "encryption")]
pub use encrypted::{EncryptedStorage, StorageKey};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::sync::Arc;

use crate::error::Error;

/// String key/value store.
///
/// Implementations must be safe to share between the HTTP client and the
/// route guard; all methods take `&self`.
pub trait Storage: Send + Sync + 'static {
    /// Value stored under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` when the value exists but cannot be read back
    /// (I/O failure, failed decryption).
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// # Errors
    ///
    /// Returns `Error::Storage` when the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` when the removal cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        (**self).remove(key)
    }
}
