//! Session lifecycle manager.
//!
//! `AuthManager` owns the in-memory session, the token store and the
//! refresh latch. It is the only place credentials change hands:
//!
//! - sign-in, sign-up and sign-out
//! - start-up synchronization against the cookie bridge
//! - single-flight refresh, proactive or on a rejected request
//! - authenticated requests with one refresh-and-retry on 401/403

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, HttpRequest, HttpResponse};
use crate::cache::CacheManager;
use crate::models::{ProfileUpdate, RegisterRequest, User, UserProfile};

use super::codec;
use super::storage::LocalStore;
use super::store::{CookieSync, TokenStore};
use super::sync::{reconcile, LocalState, RefreshTimer, Resolution};
use super::{AuthError, Session, SessionEvent, SignOutReason};

/// Header marking a request as the single retry after a refresh.
pub const RETRY_HEADER: &str = "x-auth-retry";

const EVENT_CHANNEL_CAPACITY: usize = 16;

const PROFILE_PATH: &str = "/users/profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Both credentials were rotated.
    Refreshed,
    /// Another refresh was already running; nothing was sent.
    InFlight,
    /// No refresh credential is stored; nothing was sent.
    NoRefreshToken,
    /// The refresh call failed and the session was signed out.
    Failed,
}

impl RefreshOutcome {
    pub fn is_success(self) -> bool {
        self == RefreshOutcome::Refreshed
    }
}

/// Releases the refresh latch on every exit path.
struct RefreshLatch<'a>(&'a AtomicBool);

impl Drop for RefreshLatch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct AuthManager {
    api: ApiClient,
    store: TokenStore,
    cache: Option<CacheManager>,
    session: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
    refreshing: AtomicBool,
}

impl AuthManager {
    pub fn new(api: ApiClient, local: Arc<dyn LocalStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: TokenStore::new(local, api.clone()),
            api,
            cache: None,
            session: watch::Sender::new(Session::default()),
            events,
            refreshing: AtomicBool::new(false),
        }
    }

    /// Cache fetched profiles on disk.
    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    pub fn cache(&self) -> Option<&CacheManager> {
        self.cache.as_ref()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn adopt_user(&self, user: User) {
        self.session.send_modify(|session| {
            if session.user.as_ref() != Some(&user) {
                session.profile = None;
            }
            session.user = Some(user);
        });
    }

    fn set_profile(&self, profile: &UserProfile) {
        self.session
            .send_modify(|session| session.profile = Some(profile.clone()));
        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.save_profile(profile) {
                warn!(error = %e, "Failed to cache profile");
            }
        }
    }

    /// Clear every store and the in-memory session.
    fn sign_out_local(&self, reason: SignOutReason) -> CookieSync {
        let had_user = self.session.borrow().user.is_some();
        let sync = self.store.clear_tokens();
        self.session.send_replace(Session::default());
        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.clear_profile() {
                debug!(error = %e, "Failed to clear cached profile");
            }
        }
        if had_user {
            info!(?reason, "Signed out");
            self.publish(SessionEvent::SignedOut(reason));
        }
        sync
    }

    // ===== Account operations =====

    /// Sign in and persist the issued credential pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let response = self.api.login(email, password).await?;
        let user = User {
            id: response.user_id.clone(),
            email: email.to_string(),
        };

        self.store.set_tokens(&response.token_pair());
        self.store.set_cached_user(&user);
        self.adopt_user(user.clone());

        info!(user_id = %user.id, "Signed in");
        self.publish(SessionEvent::SignedIn(user.clone()));
        Ok(user)
    }

    /// Create an account, then sign in with the same credentials.
    pub async fn register(&self, registration: &RegisterRequest) -> Result<User, AuthError> {
        self.api.register(registration).await?;
        info!("Account registered, signing in");
        self.login(&registration.email, &registration.password).await
    }

    /// Best-effort server logout followed by a full local sign-out.
    /// Calling this without a session does nothing beyond re-clearing.
    pub async fn logout(&self) {
        if let Some(token) = self.store.access_token() {
            if let Err(e) = self.api.logout(&token).await {
                debug!(error = %e, "Logout request failed, signing out locally");
            }
        }
        self.sign_out_local(SignOutReason::UserRequested).wait().await;
    }

    pub async fn reset_password(&self, email: &str) -> Result<serde_json::Value, AuthError> {
        Ok(self.api.reset_password(email).await?)
    }

    /// Fetch the profile and store it in the session and the cache.
    pub async fn load_profile(&self) -> Result<UserProfile, AuthError> {
        let profile: UserProfile = self
            .get_json(&self.api.backend_endpoint(PROFILE_PATH))
            .await?;
        self.set_profile(&profile);
        Ok(profile)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, AuthError> {
        let request = HttpRequest::put(self.api.backend_endpoint(PROFILE_PATH))
            .json(serde_json::to_value(update)?);
        let response = self.request(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(response.status, &response.body).into());
        }
        let profile: UserProfile = response.json()?;
        self.set_profile(&profile);
        info!("Profile updated");
        Ok(profile)
    }

    // ===== Refresh Coordinator =====

    /// Refresh the credential pair. Returns false when a refresh is already
    /// running, when there is nothing to refresh with, or on failure.
    pub async fn refresh(&self) -> bool {
        self.try_refresh().await.is_success()
    }

    pub async fn try_refresh(&self) -> RefreshOutcome {
        // Callers outside synchronization let the cookie write finish in
        // the background.
        self.refresh_tracked().await.0
    }

    /// Refresh and hand back the pending cookie write: the set-cookie on
    /// success, the clear-cookie after a failed refresh signed out.
    async fn refresh_tracked(&self) -> (RefreshOutcome, Option<CookieSync>) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already in flight, rejecting");
            return (RefreshOutcome::InFlight, None);
        }
        let _latch = RefreshLatch(&self.refreshing);

        let Some(refresh_token) = self.store.refresh_token() else {
            debug!("No refresh token stored");
            return (RefreshOutcome::NoRefreshToken, None);
        };

        match self.api.refresh(&refresh_token).await {
            Ok(pair) => {
                let sync = self.store.set_tokens(&pair);
                info!("Access token refreshed");
                self.publish(SessionEvent::Refreshed);
                (RefreshOutcome::Refreshed, Some(sync))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, signing out");
                let sync = self.sign_out_local(SignOutReason::RefreshFailed);
                (RefreshOutcome::Failed, Some(sync))
            }
        }
    }

    /// Refresh only while a live credential is held. Used by the timer.
    pub async fn refresh_if_active(&self) -> Option<RefreshOutcome> {
        let token = self.store.access_token()?;
        if codec::is_expired(&token) {
            return None;
        }
        Some(self.try_refresh().await)
    }

    /// Spawn the periodic proactive refresh. The timer holds only a weak
    /// reference, and stops when dropped or when the manager goes away.
    pub fn spawn_refresh_timer(self: &Arc<Self>, period: Duration) -> RefreshTimer {
        let manager = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if let Some(outcome) = manager.refresh_if_active().await {
                    debug!(?outcome, "Proactive refresh");
                }
            }
        });
        RefreshTimer::new(handle)
    }

    // ===== Session Synchronizer =====

    /// Reconcile the cookie session, the local store and the in-memory
    /// session. Runs once per application start.
    pub async fn synchronize(&self) -> Session {
        let check = match self.api.check_auth().await {
            Ok(check) => check,
            Err(e) => {
                warn!(error = %e, "Auth check failed, clearing session");
                self.sign_out_local(SignOutReason::SyncFailed).wait().await;
                return self.session();
            }
        };

        let local = LocalState {
            access_token: self.store.access_token(),
            user: self.store.cached_user(),
        };

        match reconcile(&local, &check) {
            Resolution::AdoptCookieUser(user) => {
                debug!(user_id = %user.id, "Cookie session is valid");
                self.adopt_user(user);
            }
            Resolution::RefreshRequired => {
                info!("Session cookie expired, refreshing");
                let (outcome, sync) = self.refresh_tracked().await;
                if let Some(sync) = sync {
                    sync.wait().await;
                }
                match outcome {
                    // Already signed out by the failed refresh
                    RefreshOutcome::Failed => {}
                    RefreshOutcome::Refreshed => match self.refreshed_user().await {
                        Some(user) => self.adopt_user(user),
                        None => self.sign_out_local(SignOutReason::SyncFailed).wait().await,
                    },
                    RefreshOutcome::InFlight | RefreshOutcome::NoRefreshToken => {
                        self.sign_out_local(SignOutReason::RefreshFailed).wait().await
                    }
                }
            }
            Resolution::AdoptLocal { user, access_token } => {
                info!(user_id = %user.id, "Restoring session from local store");
                self.adopt_user(user);
                self.store.sync_cookie(&access_token).wait().await;
            }
            Resolution::SignOut => {
                debug!("No recoverable session");
                self.sign_out_local(SignOutReason::NoSession).wait().await;
            }
        }

        self.session()
    }

    /// Identify the user behind a freshly refreshed credential: the cached
    /// record if there is one, otherwise whatever the bridge verifies.
    async fn refreshed_user(&self) -> Option<User> {
        if let Some(user) = self.store.cached_user() {
            return Some(user);
        }
        let token = self.store.access_token()?;
        match self.api.check_auth_token(&token).await {
            Ok(check) => {
                let user = check.authenticated_user().cloned()?;
                self.store.set_cached_user(&user);
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Could not verify refreshed credential");
                None
            }
        }
    }

    // ===== Authenticated Request Wrapper =====

    /// Send `request` with the current credential. An expired credential is
    /// refreshed first. A 401/403 triggers one refresh and one resend, and
    /// the resend's response is returned whatever its status.
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, AuthError> {
        let mut token = self.store.access_token();
        if token.as_deref().is_some_and(codec::is_expired) {
            debug!(url = %request.url, "Access token expired, refreshing before request");
            if !self.refresh().await {
                return Err(AuthError::AuthenticationRequired);
            }
            token = self.store.access_token();
        }

        let is_retry = request.header_value(RETRY_HEADER).is_some();
        let response = self
            .api
            .send(request.clone().bearer(token.as_deref()))
            .await?;

        if !response.is_auth_failure() || is_retry {
            return Ok(response);
        }

        info!(status = %response.status, url = %request.url, "Request rejected, refreshing and retrying once");
        if !self.refresh().await {
            return Ok(response);
        }

        let retry = request
            .bearer(self.store.access_token().as_deref())
            .header(RETRY_HEADER, "1");
        Ok(self.api.send(retry).await?)
    }

    /// Authenticated GET decoding a successful JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AuthError> {
        self.send_json(HttpRequest::get(url)).await
    }

    /// Authenticated request decoding a successful JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, AuthError> {
        Ok(self.request(request).await?.into_json()?)
    }
}
