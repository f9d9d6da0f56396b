//! Core library for vidnote.
//!
//! Provides the client-side session lifecycle for the vidnote backend:
//!
//! - `auth`: token storage, credential expiry decoding, session
//!   synchronization, single-flight refresh and the authenticated request
//!   wrapper, all coordinated by [`AuthManager`]
//! - `api`: typed client for the backend and the same-origin cookie bridge,
//!   built over an injectable [`HttpTransport`]
//! - `cache`: client-side profile cache
//! - `config`: persisted configuration with environment overrides
//! - `models`: user, profile and token types shared across the crate

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use auth::{AuthError, AuthManager, RefreshOutcome, Session, SessionEvent, SignOutReason};
pub use config::{Config, TokenStorage};
