//! HTTP access to the vidnote backend and the same-origin cookie bridge.
//!
//! `ApiClient` wraps an [`HttpTransport`] so every network call can be
//! replaced in tests. The production transport is [`ReqwestTransport`],
//! which keeps a cookie jar so the http-only session cookie set by the
//! bridge is sent back on later calls.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
