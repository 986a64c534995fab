//! Session Credential Storage
//!
//! Persists the access token, refresh token and cached user profile through
//! the host `SecureStore`, so a session survives restarts.
//!
//! ## Security Features
//!
//! - Token values are never logged or included in error messages
//! - Reads and writes are serialized, so a reader never observes a
//!   half-written or half-cleared session
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{TokenPair, TokenStore, UserProfile};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//!
//! let tokens = TokenPair::new("access", Some("refresh".to_string()));
//! let user = UserProfile {
//!     id: "u-1".to_string(),
//!     email: "staff@example.com".to_string(),
//!     role: "admin".to_string(),
//! };
//! token_store.set_session(&tokens, &user).await?;
//!
//! assert!(token_store.get_tokens().await?.is_some());
//! token_store.clear_tokens().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{TokenPair, UserProfile};
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const ACCESS_TOKEN_KEY: &str = "session.access_token";
pub const REFRESH_TOKEN_KEY: &str = "session.refresh_token";
pub const USER_KEY: &str = "session.user";

/// Persistent storage for the session credentials.
///
/// Share it as `Arc<TokenStore>`; the internal lock only serializes callers
/// that use the same instance.
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    lock: RwLock<()>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing TokenStore");
        Self {
            secure_store,
            lock: RwLock::new(()),
        }
    }

    /// Returns the stored tokens.
    ///
    /// `None` unless an access token is present. The refresh token is
    /// optional.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SecureStorageUnavailable` if the store cannot be
    /// read.
    pub async fn get_tokens(&self) -> Result<Option<TokenPair>> {
        let _guard = self.lock.read().await;
        self.read_tokens().await
    }

    /// Persists both tokens, overwriting previous values.
    ///
    /// A `None` refresh token removes any stored refresh token.
    pub async fn set_tokens(&self, tokens: &TokenPair) -> Result<()> {
        let _guard = self.lock.write().await;
        self.write_tokens(tokens).await?;
        info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "Session tokens stored"
        );
        Ok(())
    }

    pub async fn set_user(&self, user: &UserProfile) -> Result<()> {
        let _guard = self.lock.write().await;
        self.write_user(user).await
    }

    /// Returns the cached profile.
    ///
    /// Malformed stored data yields `Ok(None)`; only storage failures are
    /// errors.
    pub async fn get_user(&self) -> Result<Option<UserProfile>> {
        let _guard = self.lock.read().await;
        self.read_user().await
    }

    /// Writes tokens and profile under one lock acquisition.
    pub async fn set_session(&self, tokens: &TokenPair, user: &UserProfile) -> Result<()> {
        let _guard = self.lock.write().await;
        self.write_tokens(tokens).await?;
        self.write_user(user).await?;
        info!(user_id = %user.id, "Session stored");
        Ok(())
    }

    /// Reads tokens and profile as one consistent view.
    pub async fn get_session(&self) -> Result<(Option<TokenPair>, Option<UserProfile>)> {
        let _guard = self.lock.read().await;
        let tokens = self.read_tokens().await?;
        let user = self.read_user().await?;
        Ok((tokens, user))
    }

    /// Removes tokens and the cached profile.
    ///
    /// Every key is attempted even if an earlier delete fails; the first
    /// failure is returned.
    pub async fn clear_tokens(&self) -> Result<()> {
        let _guard = self.lock.write().await;

        let mut first_error = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.secure_store.delete_secret(key).await {
                warn!(key, error = %e, "Failed to delete session entry");
                first_error.get_or_insert(AuthError::from_storage(e));
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                info!("Session cleared");
                Ok(())
            }
        }
    }

    async fn read_string(&self, key: &str) -> Result<Option<String>> {
        let Some(bytes) = self
            .secure_store
            .get_secret(key)
            .await
            .map_err(AuthError::from_storage)?
        else {
            return Ok(None);
        };

        match String::from_utf8(bytes) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            Ok(_) => Ok(None),
            Err(_) => {
                warn!(key, "Stored session entry is not valid UTF-8");
                Ok(None)
            }
        }
    }

    async fn read_tokens(&self) -> Result<Option<TokenPair>> {
        let Some(access_token) = self.read_string(ACCESS_TOKEN_KEY).await? else {
            return Ok(None);
        };
        let refresh_token = self.read_string(REFRESH_TOKEN_KEY).await?;
        Ok(Some(TokenPair {
            access_token,
            refresh_token,
        }))
    }

    async fn write_tokens(&self, tokens: &TokenPair) -> Result<()> {
        self.secure_store
            .set_secret(ACCESS_TOKEN_KEY, tokens.access_token.as_bytes())
            .await
            .map_err(AuthError::from_storage)?;

        match &tokens.refresh_token {
            Some(refresh) => self
                .secure_store
                .set_secret(REFRESH_TOKEN_KEY, refresh.as_bytes())
                .await
                .map_err(AuthError::from_storage),
            None => self
                .secure_store
                .delete_secret(REFRESH_TOKEN_KEY)
                .await
                .map_err(AuthError::from_storage),
        }
    }

    async fn read_user(&self) -> Result<Option<UserProfile>> {
        let Some(bytes) = self
            .secure_store
            .get_secret(USER_KEY)
            .await
            .map_err(AuthError::from_storage)?
        else {
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Cached user profile is malformed");
                Ok(None)
            }
        }
    }

    async fn write_user(&self, user: &UserProfile) -> Result<()> {
        let json = serde_json::to_vec(user).map_err(|e| AuthError::SerializationFailed {
            context: "user profile".to_string(),
            source: e,
        })?;
        self.secure_store
            .set_secret(USER_KEY, &json)
            .await
            .map_err(AuthError::from_storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::InMemorySecureStore;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    fn user() -> UserProfile {
        UserProfile {
            id: "u-1".to_string(),
            email: "staff@example.com".to_string(),
            role: "admin".to_string(),
        }
    }

    fn store() -> (Arc<InMemorySecureStore>, TokenStore) {
        let secure_store = Arc::new(InMemorySecureStore::new());
        let token_store = TokenStore::new(secure_store.clone());
        (secure_store, token_store)
    }

    #[tokio::test]
    async fn test_round_trip_tokens() {
        let (_, token_store) = store();
        let tokens = TokenPair::new("access-1", Some("refresh-1".to_string()));

        token_store.set_tokens(&tokens).await.unwrap();
        assert_eq!(token_store.get_tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn test_empty_store_has_no_tokens() {
        let (_, token_store) = store();
        assert!(token_store.get_tokens().await.unwrap().is_none());
        assert!(token_store.get_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_is_optional() {
        let (secure_store, token_store) = store();
        token_store
            .set_tokens(&TokenPair::new("a", Some("r".to_string())))
            .await
            .unwrap();
        token_store
            .set_tokens(&TokenPair::new("b", None))
            .await
            .unwrap();

        let tokens = token_store.get_tokens().await.unwrap().unwrap();
        assert_eq!(tokens.access_token, "b");
        assert!(tokens.refresh_token.is_none());
        assert!(secure_store.get_secret(REFRESH_TOKEN_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_alone_is_not_a_session() {
        let (secure_store, token_store) = store();
        secure_store
            .set_secret(REFRESH_TOKEN_KEY, b"orphan")
            .await
            .unwrap();
        assert!(token_store.get_tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_user_reads_as_none() {
        let (secure_store, token_store) = store();
        secure_store.set_secret(USER_KEY, b"{not json").await.unwrap();
        assert!(token_store.get_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_session_and_clear() {
        let (secure_store, token_store) = store();
        token_store
            .set_session(&TokenPair::new("a", Some("r".to_string())), &user())
            .await
            .unwrap();

        let (tokens, cached) = token_store.get_session().await.unwrap();
        assert_eq!(tokens.unwrap().access_token, "a");
        assert_eq!(cached, Some(user()));

        token_store.clear_tokens().await.unwrap();
        assert!(token_store.get_tokens().await.unwrap().is_none());
        assert!(token_store.get_user().await.unwrap().is_none());
        assert!(secure_store.list_keys().await.unwrap().is_empty());
    }

    /// Store whose deletes fail for one key.
    struct FlakyDeleteStore {
        entries: Mutex<HashMap<String, Vec<u8>>>,
        failing_key: &'static str,
    }

    #[async_trait::async_trait]
    impl SecureStore for FlakyDeleteStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.entries.lock().await.insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            if key == self.failing_key {
                return Err(BridgeError::OperationFailed("locked".to_string()));
            }
            self.entries.lock().await.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.entries.lock().await.keys().cloned().collect())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            self.entries.lock().await.clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_clear_attempts_every_key() {
        let secure_store = Arc::new(FlakyDeleteStore {
            entries: Mutex::new(HashMap::new()),
            failing_key: REFRESH_TOKEN_KEY,
        });
        let token_store = TokenStore::new(secure_store.clone());
        token_store
            .set_session(&TokenPair::new("a", Some("r".to_string())), &user())
            .await
            .unwrap();

        let err = token_store.clear_tokens().await.unwrap_err();
        assert!(matches!(err, AuthError::SecureStorageUnavailable(_)));

        // Access token and profile are gone despite the failure.
        assert!(token_store.get_tokens().await.unwrap().is_none());
        assert!(token_store.get_user().await.unwrap().is_none());
    }
}
