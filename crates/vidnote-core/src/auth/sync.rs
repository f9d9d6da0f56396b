//! Session reconciliation between the session cookie and the local store.
//!
//! The cookie-backed session is verified by the bridge and always wins over
//! the local store. A valid local credential without a cookie is adopted and
//! the cookie is rebuilt from it.

use tokio::task::JoinHandle;

use crate::models::{AuthCheck, User};

use super::codec;

/// What the local store holds at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    pub access_token: Option<String>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The cookie session is valid; adopt its user as-is.
    AdoptCookieUser(User),
    /// The cookie credential has expired; refresh, or sign out on failure.
    RefreshRequired,
    /// No cookie, but the local credential is valid. Adopt it and re-set
    /// the cookie from `access_token`.
    AdoptLocal { user: User, access_token: String },
    /// Nothing recoverable; clear every store.
    SignOut,
}

pub fn reconcile(local: &LocalState, check: &AuthCheck) -> Resolution {
    reconcile_at(local, check, codec::now_secs())
}

pub fn reconcile_at(local: &LocalState, check: &AuthCheck, now_secs: f64) -> Resolution {
    if let Some(user) = check.authenticated_user() {
        return Resolution::AdoptCookieUser(user.clone());
    }
    if check.expired {
        return Resolution::RefreshRequired;
    }
    match (&local.access_token, &local.user) {
        (Some(token), Some(user)) if !codec::is_expired_at(token, now_secs) => {
            Resolution::AdoptLocal {
                user: user.clone(),
                access_token: token.clone(),
            }
        }
        _ => Resolution::SignOut,
    }
}

/// Background task that refreshes the credential on a fixed interval.
/// Aborted when dropped, so it cannot outlive the scope that owns it.
#[derive(Debug)]
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
