//! API client for the vidnote backend and the same-origin auth bridge.
//!
//! Backend endpoints (`/auth/*`, `/users/*`) live under `backend_url`.
//! The bridge endpoints (`/api/auth/*`) live under `app_url` and translate
//! between the locally stored credential and the http-only session cookie.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::models::{AuthCheck, LoginResponse, RegisterRequest, TokenPair};

use super::{ApiError, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Clone is cheap - the transport is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    backend_url: String,
    app_url: String,
}

impl ApiClient {
    /// Create a client using the reqwest transport and the configured URLs
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::with_transport(
            Arc::new(transport),
            &config.backend_url,
            &config.app_url,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        backend_url: &str,
        app_url: &str,
    ) -> Self {
        Self {
            transport,
            backend_url: backend_url.trim_end_matches('/').to_string(),
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for a backend path such as `/users/profile`
    pub fn backend_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.backend_url, path.trim_start_matches('/'))
    }

    fn app_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.app_url, path.trim_start_matches('/'))
    }

    /// Send a request as-is, without credential handling
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending request");
        self.transport.send(request).await
    }

    /// Send and require a 2xx, reporting failures with the backend's detail message
    async fn send_checked(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response.status, &response.body))
        }
    }

    // ===== Backend: account endpoints =====

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = HttpRequest::post(self.backend_endpoint("/auth/login"))
            .json(json!({ "email": email, "password": password }));
        self.send_checked(request).await?.json()
    }

    pub async fn register(&self, registration: &RegisterRequest) -> Result<serde_json::Value, ApiError> {
        let request = HttpRequest::post(self.backend_endpoint("/auth/register"))
            .json(serde_json::to_value(registration)?);
        self.send_checked(request).await?.json()
    }

    /// Exchange a refresh credential for a rotated pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let request = HttpRequest::post(self.backend_endpoint("/auth/refresh"))
            .json(json!({ "refresh_token": refresh_token }));
        self.send_checked(request).await?.json()
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), ApiError> {
        let request =
            HttpRequest::post(self.backend_endpoint("/auth/logout")).bearer(Some(access_token));
        self.send_checked(request).await?;
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<serde_json::Value, ApiError> {
        let request = HttpRequest::post(self.backend_endpoint("/auth/reset-password"))
            .json(json!({ "email": email }));
        let response = self.send_checked(request).await?;
        if response.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        response.json()
    }

    // ===== Same-origin bridge =====

    /// `GET /api/auth/check` with whatever session cookie the jar holds
    pub async fn check_auth(&self) -> Result<AuthCheck, ApiError> {
        let request = HttpRequest::get(self.app_endpoint("/api/auth/check"));
        Self::parse_check(self.send(request).await?)
    }

    /// `POST /api/auth/check` with an explicit access credential
    pub async fn check_auth_token(&self, access_token: &str) -> Result<AuthCheck, ApiError> {
        let request = HttpRequest::post(self.app_endpoint("/api/auth/check"))
            .json(json!({ "accessToken": access_token }));
        Self::parse_check(self.send(request).await?)
    }

    /// The bridge answers 401 with a check body for missing or expired
    /// cookies, so the body is parsed whatever the status.
    fn parse_check(response: HttpResponse) -> Result<AuthCheck, ApiError> {
        match response.json::<AuthCheck>() {
            Ok(check) => Ok(check),
            Err(e) if response.is_success() => Err(e),
            Err(_) => Err(ApiError::from_status(response.status, &response.body)),
        }
    }

    pub async fn set_cookie(&self, access_token: &str) -> Result<(), ApiError> {
        let request = HttpRequest::post(self.app_endpoint("/api/auth/set-cookie"))
            .json(json!({ "accessToken": access_token }));
        self.send_checked(request).await?;
        Ok(())
    }

    pub async fn clear_cookie(&self) -> Result<(), ApiError> {
        let request = HttpRequest::post(self.app_endpoint("/api/auth/clear-cookie"));
        self.send_checked(request).await?;
        Ok(())
    }
}
