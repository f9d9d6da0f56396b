//! Token Store: credentials mirrored across the local store and the
//! http-only session cookie.
//!
//! Local writes happen synchronously. The cookie mirror is requested from the
//! bridge on a spawned task, so local state is never blocked on, or undone
//! by, a failed network call. If the cookie path is unavailable the client
//! still authenticates with the bearer header.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::models::{TokenPair, User};

use super::storage::LocalStore;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const USER_KEY: &str = "user";

/// Handle to a pending cookie set/clear request. Dropping it detaches the
/// request; awaiting [`CookieSync::wait`] blocks until it has finished.
#[derive(Debug)]
pub struct CookieSync(JoinHandle<()>);

impl CookieSync {
    pub async fn wait(self) {
        if let Err(e) = self.0.await {
            warn!(error = %e, "Cookie sync task failed");
        }
    }
}

#[derive(Clone)]
pub struct TokenStore {
    local: Arc<dyn LocalStore>,
    api: ApiClient,
}

impl TokenStore {
    pub fn new(local: Arc<dyn LocalStore>, api: ApiClient) -> Self {
        Self { local, api }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.local.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read local credential store");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.local.set(key, value) {
            warn!(key, error = %e, "Failed to write local credential store");
        }
    }

    fn delete(&self, key: &str) {
        if let Err(e) = self.local.remove(key) {
            warn!(key, error = %e, "Failed to remove from local credential store");
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Store both credentials locally, then mirror the access credential
    /// into the session cookie. Must be called inside a tokio runtime.
    pub fn set_tokens(&self, pair: &TokenPair) -> CookieSync {
        self.write(ACCESS_TOKEN_KEY, &pair.access_token);
        self.write(REFRESH_TOKEN_KEY, &pair.refresh_token);
        self.sync_cookie(&pair.access_token)
    }

    /// Ask the bridge to set the session cookie to `access_token`.
    pub fn sync_cookie(&self, access_token: &str) -> CookieSync {
        let api = self.api.clone();
        let token = access_token.to_string();
        CookieSync(tokio::spawn(async move {
            match api.set_cookie(&token).await {
                Ok(()) => debug!("Session cookie set"),
                Err(e) => warn!(error = %e, "Failed to set session cookie"),
            }
        }))
    }

    pub fn cached_user(&self) -> Option<User> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cached user record");
                None
            }
        }
    }

    pub fn set_cached_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.write(USER_KEY, &raw),
            Err(e) => warn!(error = %e, "Failed to encode user record"),
        }
    }

    /// Remove both credentials and the cached user, then ask the bridge to
    /// delete the session cookie. Safe to call with no session.
    pub fn clear_tokens(&self) -> CookieSync {
        self.delete(ACCESS_TOKEN_KEY);
        self.delete(REFRESH_TOKEN_KEY);
        self.delete(USER_KEY);

        let api = self.api.clone();
        CookieSync(tokio::spawn(async move {
            match api.clear_cookie().await {
                Ok(()) => debug!("Session cookie cleared"),
                Err(e) => warn!(error = %e, "Failed to clear session cookie"),
            }
        }))
    }
}
