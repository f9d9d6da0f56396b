//! Command handlers.
//!
//! `App` wires configuration, the local credential store, the profile cache
//! and the shared `AuthManager`, and implements one method per subcommand.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Method;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use vidnote_core::auth::{codec, open_local_store, SessionEvent, SignOutReason};
use vidnote_core::cache::CacheManager;
use vidnote_core::models::{ProfileUpdate, RegisterRequest, UserProfile};
use vidnote_core::{ApiClient, AuthError, AuthManager, Config, HttpRequest};

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 254;

pub struct App {
    config: Config,
    manager: Arc<AuthManager>,
}

/// Turn an auth failure into the message shown to the user
fn user_facing(err: AuthError) -> anyhow::Error {
    anyhow!(err.user_message())
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        let local = open_local_store(config.token_storage, &cache_dir);
        let api = ApiClient::new(&config).context("Failed to create HTTP client")?;
        let cache = CacheManager::new(cache_dir)?;
        let manager = Arc::new(AuthManager::new(api, local).with_cache(cache));
        Ok(Self { config, manager })
    }

    /// Restore the saved session, failing if there is none
    async fn require_session(&self) -> Result<()> {
        if !self.manager.synchronize().await.is_authenticated() {
            bail!("Not signed in. Run `vidnote login` first.");
        }
        Ok(())
    }

    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    async fn load_profile_quietly(&self) {
        if let Err(e) = self.manager.load_profile().await {
            debug!(error = %e, "Profile not loaded");
        }
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt_email()?,
        };
        let password = rpassword::prompt_password(format!("Password for {}: ", email))
            .context("Failed to read password")?;

        let user = self
            .manager
            .login(&email, &password)
            .await
            .map_err(user_facing)?;
        self.remember_email(&email);
        self.load_profile_quietly().await;

        eprintln!("Signed in as {} ({})", user.email, user.id);
        Ok(())
    }

    pub async fn register(&mut self, email: String, name: String, user_type: String) -> Result<()> {
        let password = rpassword::prompt_password("Choose a password: ")
            .context("Failed to read password")?;
        let confirm = rpassword::prompt_password("Confirm password: ")
            .context("Failed to read password")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let registration = RegisterRequest {
            email,
            password,
            name,
            user_type,
        };
        let user = self
            .manager
            .register(&registration)
            .await
            .map_err(user_facing)?;
        self.remember_email(&user.email);

        eprintln!("Account created. Signed in as {}", user.email);
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.manager.logout().await;
        eprintln!("Signed out");
        Ok(())
    }

    pub async fn whoami(&self) -> Result<()> {
        let session = self.manager.synchronize().await;
        let Some(user) = session.user else {
            println!("Not signed in");
            return Ok(());
        };

        println!("User:    {} ({})", user.email, user.id);
        if let Some(token) = self.manager.token_store().access_token() {
            match codec::decode_claims(&token) {
                Ok(claims) => println!("Expires: in {} minutes", claims.minutes_until_expiry()),
                Err(e) => println!("Expires: unknown ({})", e),
            }
        }
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        let response = self
            .manager
            .reset_password(email)
            .await
            .map_err(user_facing)?;
        match response.get("message").and_then(|m| m.as_str()) {
            Some(message) => eprintln!("{}", message),
            None => eprintln!("If an account exists for {}, a reset link is on its way", email),
        }
        Ok(())
    }

    pub async fn profile(&self, offline: bool) -> Result<()> {
        if offline {
            let cache = self
                .manager
                .cache()
                .ok_or_else(|| anyhow!("Profile cache unavailable"))?;
            match cache.load_profile()? {
                Some(cached) => {
                    print_profile(&cached.data);
                    let note = if cached.is_stale() { ", stale" } else { "" };
                    eprintln!("(cached {}{})", cached.age_display(), note);
                }
                None => eprintln!("No cached profile"),
            }
            return Ok(());
        }

        self.require_session().await?;
        let profile = self.manager.load_profile().await.map_err(user_facing)?;
        print_profile(&profile);
        Ok(())
    }

    pub async fn update_profile(
        &self,
        name: Option<String>,
        institution: Option<String>,
        field_of_study: Option<String>,
    ) -> Result<()> {
        let update = ProfileUpdate {
            name,
            institution,
            field_of_study,
            user_type: None,
        };
        if update.is_empty() {
            bail!("Nothing to update. Pass at least one of --name, --institution, --field-of-study");
        }

        self.require_session().await?;
        let profile = self
            .manager
            .update_profile(&update)
            .await
            .map_err(user_facing)?;
        print_profile(&profile);
        Ok(())
    }

    pub async fn request(&self, path: &str, method: &str, data: Option<&str>) -> Result<()> {
        let method: Method = method
            .to_ascii_uppercase()
            .parse()
            .with_context(|| format!("Invalid HTTP method: {}", method))?;

        self.require_session().await?;

        let url = self.manager.api().backend_endpoint(path);
        let mut request = HttpRequest::new(method, url);
        if let Some(data) = data {
            let body = serde_json::from_str(data).context("Request body is not valid JSON")?;
            request = request.json(body);
        }

        let response = self.manager.request(request).await.map_err(user_facing)?;
        eprintln!("{}", response.status);
        println!("{}", response.body);
        if !response.is_success() {
            bail!("Request failed with status {}", response.status);
        }
        Ok(())
    }

    pub async fn watch(&self) -> Result<()> {
        self.require_session().await?;

        let mut events = self.manager.events();
        let timer = self
            .manager
            .spawn_refresh_timer(self.config.refresh_interval());
        eprintln!(
            "Keeping session alive (refresh every {}s). Press Ctrl+C to stop.",
            self.config.refresh_interval_secs
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(SessionEvent::Refreshed) => eprintln!("Session refreshed"),
                    Ok(SessionEvent::SignedOut(SignOutReason::RefreshFailed)) => {
                        eprintln!("Session expired and could not be renewed. Run `vidnote login` to sign in again.");
                        break;
                    }
                    Ok(SessionEvent::SignedOut(_)) => break,
                    Ok(SessionEvent::SignedIn(_)) => {}
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Session events lagged"),
                    Err(RecvError::Closed) => break,
                },
            }
        }

        timer.cancel();
        Ok(())
    }
}

fn prompt_email() -> Result<String> {
    eprint!("Email: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read email")?;
    let email = line.trim().to_string();
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH || !email.contains('@') {
        bail!("Invalid email address");
    }
    Ok(email)
}

fn print_profile(profile: &UserProfile) {
    println!("Name:           {}", profile.display_name());
    if let Some(ref email) = profile.email {
        println!("Email:          {}", email);
    }
    if let Some(ref institution) = profile.institution {
        println!("Institution:    {}", institution);
    }
    if let Some(ref field) = profile.field_of_study {
        println!("Field of study: {}", field);
    }
    println!("Plan:           {}", profile.tier());
    if let Some(usage) = profile.usage_summary() {
        println!("Usage:          {}", usage);
    }
}
