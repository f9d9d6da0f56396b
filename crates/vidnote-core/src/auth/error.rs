use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No usable credential and it could not be refreshed.
    #[error("Authentication required - please sign in again")]
    AuthenticationRequired,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Api(ApiError::Rejected(detail)) => detail.clone(),
            AuthError::Api(e) if e.is_network() => {
                "Could not reach the server - check your connection".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Api(ApiError::Serialization(err))
    }
}
