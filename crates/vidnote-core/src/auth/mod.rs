//! Authentication and session lifecycle.
//!
//! This module provides:
//! - `TokenStore`: credentials mirrored across a local store and the
//!   http-only session cookie
//! - `codec`: fail-closed expiry check on the access credential
//! - `sync`: start-up reconciliation of cookie and local sessions
//! - `AuthManager`: sign-in/out, single-flight refresh, and the
//!   authenticated request wrapper
//!
//! Local stores are pluggable: in-memory, a JSON session file, or the OS
//! keychain.

pub mod codec;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod session;
pub mod storage;
pub mod store;
pub mod sync;

pub use credentials::KeyringStore;
pub use error::AuthError;
pub use manager::{AuthManager, RefreshOutcome, RETRY_HEADER};
pub use session::{Session, SessionEvent, SignOutReason};
pub use storage::{open_local_store, FileStore, LocalStore, MemoryStore};
pub use store::{CookieSync, TokenStore};
pub use sync::{reconcile, LocalState, RefreshTimer, Resolution};
