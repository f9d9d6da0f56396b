//! Local cache for backend-owned account data.
//!
//! The profile is cached as JSON so the last known values can be shown
//! without a network round trip. The cache is never authoritative; it is
//! overwritten by every successful fetch and removed on sign-out.

pub mod manager;

pub use manager::{CacheManager, CachedData};
