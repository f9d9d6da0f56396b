//! Account models.
//!
//! `UserProfile` is owned by the backend; the client only caches it.

use serde::{Deserialize, Serialize};

/// The signed-in identity held in session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Descriptive profile fields fetched from `GET /users/profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct UserProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub user_type: Option<String>,
    pub institution: Option<String>,
    pub field_of_study: Option<String>,
    pub subscription_tier: Option<String>,
    pub notes_count: Option<u64>,
    pub monthly_notes_used: Option<u64>,
    pub monthly_notes_limit: Option<u64>,
}

impl UserProfile {
    /// Name if set, otherwise email, otherwise a placeholder.
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Unnamed user")
            .to_string()
    }

    /// Subscription tier, defaulting to the free tier.
    pub fn tier(&self) -> &str {
        self.subscription_tier.as_deref().unwrap_or("free")
    }

    /// Monthly usage formatted for display, e.g. "3/10 notes this month".
    pub fn usage_summary(&self) -> Option<String> {
        match (self.monthly_notes_used, self.monthly_notes_limit) {
            (Some(used), Some(limit)) => Some(format!("{}/{} notes this month", used, limit)),
            (Some(used), None) => Some(format!("{} notes this month", used)),
            _ => None,
        }
    }
}

/// Partial profile sent with `PUT /users/profile`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.institution.is_none()
            && self.field_of_study.is_none()
            && self.user_type.is_none()
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub user_type: String,
}
