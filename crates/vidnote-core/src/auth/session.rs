use serde::{Deserialize, Serialize};

use crate::models::{User, UserProfile};

/// In-memory session state.
///
/// `user` is set only while the client holds a credential it believes to be
/// valid. `profile` is fetched separately and may lag behind `user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    pub user: Option<User>,
    pub profile: Option<UserProfile>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user asked to sign out
    UserRequested,
    /// A refresh attempt was rejected or failed on the network
    RefreshFailed,
    /// Start-up reconciliation found no recoverable session
    NoSession,
    /// The auth check could not be completed
    SyncFailed,
}

/// Published on session transitions so a UI can react, e.g. route home
/// after a background refresh signs the user out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(User),
    Refreshed,
    SignedOut(SignOutReason),
}
