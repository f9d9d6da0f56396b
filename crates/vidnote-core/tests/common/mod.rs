//! Shared test doubles: a scripted transport standing in for the backend
//! and the cookie bridge, plus credential builders.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{StatusCode, Url};
use vidnote_core::auth::{AuthManager, MemoryStore};
use vidnote_core::models::{TokenPair, User};
use vidnote_core::{ApiClient, ApiError, HttpRequest, HttpResponse, HttpTransport};

pub const BACKEND_URL: &str = "https://api.vidnote.test";
pub const APP_URL: &str = "https://app.vidnote.test";

#[derive(Clone)]
struct Scripted {
    result: Result<(StatusCode, String), String>,
    delay: Option<Duration>,
}

/// Responses are queued per path; the last queued response for a path is
/// repeated once the queue drains. Unscripted paths answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(scripted);
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.push(
            path,
            Scripted {
                result: Ok((StatusCode::from_u16(status).unwrap(), body.into())),
                delay: None,
            },
        );
    }

    pub fn respond_json(&self, path: &str, status: u16, body: serde_json::Value) {
        self.respond(path, status, body.to_string());
    }

    pub fn respond_after(&self, path: &str, delay: Duration, status: u16, body: impl Into<String>) {
        self.push(
            path,
            Scripted {
                result: Ok((StatusCode::from_u16(status).unwrap(), body.into())),
                delay: Some(delay),
            },
        );
    }

    pub fn fail(&self, path: &str) {
        self.push(
            path,
            Scripted {
                result: Err("connection refused".to_string()),
                delay: None,
            },
        );
    }

    /// Drop every scripted response for `path`.
    pub fn reset_route(&self, path: &str) {
        self.routes.lock().unwrap().remove(path);
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<HttpRequest> {
        self.calls()
            .into_iter()
            .filter(|req| path_of(&req.url) == path)
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls_to(path).len()
    }

    fn next(&self, path: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn path_of(url: &str) -> String {
    Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default()
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = path_of(&request.url);
        self.calls.lock().unwrap().push(request);

        let Some(scripted) = self.next(&path) else {
            return Ok(HttpResponse::new(StatusCode::NOT_FOUND, "not found"));
        };
        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }
        match scripted.result {
            Ok((status, body)) => Ok(HttpResponse::new(status, body)),
            Err(msg) => Err(ApiError::Network(msg)),
        }
    }
}

static NONCE: AtomicU64 = AtomicU64::new(0);

/// An unsigned credential for `sub` expiring `offset_secs` from now.
/// Every call yields a distinct token.
pub fn token_expiring_in(sub: &str, offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    let nonce = NONCE.fetch_add(1, Ordering::Relaxed);
    let claims = serde_json::json!({ "sub": sub, "exp": exp, "jti": nonce });
    format!(
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

pub fn fresh_token() -> String {
    token_expiring_in("u1", 3600)
}

pub fn expired_token() -> String {
    token_expiring_in("u1", -10)
}

pub fn pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

pub fn user(id: &str, email: &str) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
    }
}

pub fn bearer_of(request: &HttpRequest) -> Option<String> {
    request
        .header_value("authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub fn json_body(request: &HttpRequest) -> serde_json::Value {
    request.body.clone().unwrap_or(serde_json::Value::Null)
}

pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub local: Arc<MemoryStore>,
    pub manager: Arc<AuthManager>,
}

impl Harness {
    pub fn new() -> Self {
        let transport = FakeTransport::new();
        // Cookie bridge accepts writes unless a test scripts otherwise
        transport.respond("/api/auth/set-cookie", 200, r#"{"success":true}"#);
        transport.respond("/api/auth/clear-cookie", 200, r#"{"success":true}"#);

        let local = Arc::new(MemoryStore::default());
        let api = ApiClient::with_transport(transport.clone(), BACKEND_URL, APP_URL);
        let manager = Arc::new(AuthManager::new(api, local.clone()));
        Self {
            transport,
            local,
            manager,
        }
    }

    /// Seed the local store as if a previous sign-in had happened.
    pub async fn seed(&self, access: &str, refresh: &str, cached: Option<&User>) {
        self.manager
            .token_store()
            .set_tokens(&pair(access, refresh))
            .wait()
            .await;
        if let Some(user) = cached {
            self.manager.token_store().set_cached_user(user);
        }
        self.transport.reset_calls();
    }

    pub fn refresh_returns(&self, access: &str, refresh: &str) {
        self.transport.respond_json(
            "/auth/refresh",
            200,
            serde_json::json!({ "access_token": access, "refresh_token": refresh }),
        );
    }
}

/// Let detached cookie tasks run to completion.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
