//! Data models for vidnote accounts and sessions.
//!
//! - `User`, `UserProfile`, `ProfileUpdate`, `RegisterRequest`: account data
//! - `TokenPair`, `LoginResponse`, `AuthCheck`: credential and bridge payloads

pub mod auth;
pub mod user;

pub use auth::{AuthCheck, LoginResponse, TokenPair};
pub use user::{ProfileUpdate, RegisterRequest, User, UserProfile};
