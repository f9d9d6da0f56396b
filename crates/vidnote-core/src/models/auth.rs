//! Credential payloads exchanged with the backend and the cookie bridge.

use serde::{Deserialize, Deserializer, Serialize};

use super::User;

/// Access/refresh credential pair. Both halves are opaque to the client
/// except for the access credential's `exp` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
}

impl LoginResponse {
    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Body of `GET /api/auth/check` and `POST /api/auth/check`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthCheck {
    pub authenticated: bool,
    pub user: Option<User>,
    pub expired: bool,
    pub synced: bool,
}

impl AuthCheck {
    /// The verified user, if the bridge reported an authenticated session.
    pub fn authenticated_user(&self) -> Option<&User> {
        if self.authenticated {
            self.user.as_ref()
        } else {
            None
        }
    }
}

/// User ids arrive as strings from some endpoints and integers from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
