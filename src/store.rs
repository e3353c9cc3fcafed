use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::resources::Category;
use crate::storage::{MemoryStorage, Storage};
use crate::types::{AuthTokens, Session, UserProfile};

pub const JWT_TOKEN_KEY: &str = "jwtToken";
pub const USER_PROFILE_KEY: &str = "userProfile";
pub const PRODUCT_CATEGORIES_KEY: &str = "productCategories";

/// Persisted session state: tokens, the signed-in profile, cached categories.
///
/// Reads never fail: a value that is missing, malformed, or cannot be
/// decrypted reads as `None`. A value that fails to *decrypt* additionally
/// clears everything this store owns, since the key no longer matches.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
    prefix: Option<String>,
}

impl TokenStore {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            prefix: None,
        }
    }

    /// Store backed by a fresh [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Namespace every key as `{prefix}:{key}`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Persist a new session together with its profile.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if either write fails. The session is written
    /// first; on a profile write failure both are removed again.
    pub fn save(&self, session: &Session, profile: &UserProfile) -> Result<(), Error> {
        self.write(JWT_TOKEN_KEY, session)?;
        if let Err(e) = self.write(USER_PROFILE_KEY, profile) {
            if let Err(rollback) = self.storage.remove(&self.key(JWT_TOKEN_KEY)) {
                tracing::warn!(error = %rollback, "Failed to roll back session after profile write failure");
            }
            return Err(e);
        }
        tracing::debug!(role = %profile.role_name, "Session saved");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Error::Storage` if the write fails.
    pub fn save_session(&self, session: &Session) -> Result<(), Error> {
        self.write(JWT_TOKEN_KEY, session)
    }

    #[must_use]
    pub fn load(&self) -> Option<Session> {
        self.read(JWT_TOKEN_KEY)
    }

    #[must_use]
    pub fn load_profile(&self) -> Option<UserProfile> {
        self.read(USER_PROFILE_KEY)
    }

    /// Apply the tokens of a refresh response to the stored session.
    ///
    /// A response without a refresh token keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReauthenticationRequired` if no session is stored, or
    /// `Error::Storage` if the write fails.
    pub fn update_tokens(&self, tokens: AuthTokens) -> Result<Session, Error> {
        let current = self.load().ok_or(Error::ReauthenticationRequired)?;
        let mut session = tokens.into_session();
        if session.refresh_token.is_none() {
            session.refresh_token = current.refresh_token;
        }
        self.save_session(&session)?;
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `Error::Storage` if the write fails.
    pub fn save_categories(&self, categories: &[Category]) -> Result<(), Error> {
        self.write(PRODUCT_CATEGORIES_KEY, categories)
    }

    #[must_use]
    pub fn load_categories(&self) -> Option<Vec<Category>> {
        self.read(PRODUCT_CATEGORIES_KEY)
    }

    /// Remove everything this store owns. Clearing an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first `Error::Storage` encountered; every key is still
    /// attempted.
    pub fn clear(&self) -> Result<(), Error> {
        let mut first_err = None;
        for key in [JWT_TOKEN_KEY, USER_PROFILE_KEY, PRODUCT_CATEGORIES_KEY] {
            if let Err(e) = self.storage.remove(&self.key(key)) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_owned(),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), Error> {
        let json = serde_json::to_string(value).map_err(|e| Error::Storage(e.to_string()))?;
        self.storage.set(&self.key(key), &json)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(&self.key(key)) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Unreadable stored value, clearing session");
                if let Err(e) = self.clear() {
                    tracing::warn!(error = %e, "Failed to clear session storage");
                }
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Malformed stored value ignored");
                None
            }
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
