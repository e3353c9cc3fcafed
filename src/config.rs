use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::Error;
#[cfg(feature = "encryption")]
use crate::storage::{EncryptedStorage, StorageKey};
use crate::storage::Storage;
use crate::store::TokenStore;

/// API paths, relative to the configured base URL.
pub mod endpoints {
    pub const SIGN_UP: &str = "auth/register";
    pub const SIGN_IN: &str = "auth/login";
    pub const REFRESH_TOKENS: &str = "auth/refresh-tokens";
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const PRODUCT_DOCUMENT_TYPES: &str = "productdocumenttype";
    pub const COUNTRIES: &str = "countries";
    pub const HSN_CODES: &str = "hsncodes";
    pub const USER_DOCUMENTS: &str = "userdocuments";
    /// Suffix of `products/{productId}/import-status/{countryId}`.
    pub const IMPORT_STATUS: &str = "import-status";
}

/// Envelope `code` values that trigger a success notification.
pub const DEFAULT_SUCCESS_CODES: [u16; 4] = [200, 201, 202, 203];

pub const DEFAULT_STORAGE_PREFIX: &str = "@ambillion";

/// Client configuration.
///
/// The base URL is the only required value; everything else has a default
/// and a `with_*` override.
///
/// ```rust,ignore
/// let config = ClientConfig::new("https://api.example.com/v1".parse()?)
///     .with_timeout(std::time::Duration::from_secs(20));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) success_codes: Vec<u16>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) storage_prefix: Option<String>,
    #[cfg(feature = "encryption")]
    pub(crate) storage_key: Option<StorageKey>,
}

impl ClientConfig {
    /// Defaults: no timeout, `@ambillion` prefix, success codes 200-203.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            success_codes: DEFAULT_SUCCESS_CODES.to_vec(),
            timeout: None,
            storage_prefix: Some(DEFAULT_STORAGE_PREFIX.into()),
            #[cfg(feature = "encryption")]
            storage_key: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `AMBILLION_API_URL`: API base URL
    ///
    /// # Optional env vars
    /// - `AMBILLION_STORAGE_KEY`: enables encrypted storage (64 hex chars = raw key)
    /// - `AMBILLION_STORAGE_PREFIX`: storage namespace, empty string disables it
    /// - `AMBILLION_TIMEOUT_SECS`: per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or a value does not parse.
    pub fn from_env() -> Result<Self, Error> {
        let url_str = std::env::var("AMBILLION_API_URL")
            .map_err(|_| Error::Config("AMBILLION_API_URL is required".into()))?;
        let base_url: Url = url_str
            .parse()
            .map_err(|e| Error::Config(format!("AMBILLION_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(secs) = std::env::var("AMBILLION_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("AMBILLION_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Ok(prefix) = std::env::var("AMBILLION_STORAGE_PREFIX") {
            config = if prefix.is_empty() {
                config.without_storage_prefix()
            } else {
                config.with_storage_prefix(prefix)
            };
        }
        if let Ok(secret) = std::env::var("AMBILLION_STORAGE_KEY") {
            #[cfg(feature = "encryption")]
            {
                config = config.with_storage_key(StorageKey::from_secret(&secret));
            }
            #[cfg(not(feature = "encryption"))]
            {
                let _ = secret;
                return Err(Error::Config(
                    "AMBILLION_STORAGE_KEY is set but the `encryption` feature is disabled".into(),
                ));
            }
        }

        Ok(config)
    }

    /// Per-request timeout for every call, including token refresh.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override which envelope codes produce a success notification.
    #[must_use]
    pub fn with_success_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    /// Namespace stored keys as `{prefix}:{key}`.
    #[must_use]
    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = Some(prefix.into());
        self
    }

    /// Store keys bare, without a namespace.
    #[must_use]
    pub fn without_storage_prefix(mut self) -> Self {
        self.storage_prefix = None;
        self
    }

    /// Encrypt every stored value with `key`.
    #[cfg(feature = "encryption")]
    #[must_use]
    pub fn with_storage_key(mut self, key: StorageKey) -> Self {
        self.storage_key = Some(key);
        self
    }

    /// Base URL, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-request timeout, `None` for reqwest's default.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Envelope codes that produce a success notification.
    #[must_use]
    pub fn success_codes(&self) -> &[u16] {
        &self.success_codes
    }

    /// Absolute URL for an API path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path cannot be joined onto the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("{path}: {e}")))
    }

    /// Token store over `storage`, encrypted and namespaced as configured.
    #[must_use]
    pub fn token_store(&self, storage: Arc<dyn Storage>) -> TokenStore {
        #[cfg(feature = "encryption")]
        let storage: Arc<dyn Storage> = match &self.storage_key {
            Some(key) => Arc::new(EncryptedStorage::new(storage, key.clone())),
            None => storage,
        };

        let store = TokenStore::new(storage);
        match &self.storage_prefix {
            Some(prefix) => store.with_prefix(prefix.clone()),
            None => store,
        }
    }
}

/// `Url::join` replaces the last segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let config = ClientConfig::new("https://api.example.com/v1".parse().unwrap());
        assert_eq!(
            config.endpoint(endpoints::SIGN_IN).unwrap().as_str(),
            "https://api.example.com/v1/auth/login"
        );
        assert_eq!(
            config.endpoint("/products/7").unwrap().as_str(),
            "https://api.example.com/v1/products/7"
        );
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new("http://localhost:3000".parse().unwrap());
        assert_eq!(config.success_codes(), &DEFAULT_SUCCESS_CODES);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.base_url().as_str(), "http://localhost:3000/");
    }

    #[test]
    fn overrides() {
        let config = ClientConfig::new("http://localhost:3000".parse().unwrap())
            .with_timeout(Duration::from_secs(5))
            .with_success_codes([200]);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.success_codes(), &[200]);
    }

    #[test]
    fn token_store_uses_prefix() {
        use crate::storage::MemoryStorage;
        use crate::types::Session;

        let storage = Arc::new(MemoryStorage::new());
        let store = ClientConfig::new("http://localhost".parse().unwrap())
            .token_store(storage.clone());
        store.save_session(&Session::new("T1", None)).unwrap();
        assert!(storage.raw("@ambillion:jwtToken").is_some());
    }

    #[cfg(feature = "encryption")]
    #[test]
    fn token_store_encrypts_with_key() {
        use crate::storage::MemoryStorage;
        use crate::types::Session;

        let storage = Arc::new(MemoryStorage::new());
        let store = ClientConfig::new("http://localhost".parse().unwrap())
            .with_storage_key(StorageKey::derive("secret"))
            .token_store(storage.clone());
        store.save_session(&Session::new("T1", None)).unwrap();

        let raw = storage.raw("@ambillion:jwtToken").unwrap();
        assert!(raw.starts_with("v4.local."));
        assert_eq!(store.load().unwrap().access_token, "T1");
    }
}
