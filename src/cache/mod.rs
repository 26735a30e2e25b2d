//! Cache Module
//!
//! Provides a namespaced in-memory cache with per-key TTL expiration.
//! Expiry is driven by an active timer per key rather than checked on read.

mod manager;
mod namespace;
mod timer;


// Re-export public types
pub use manager::CacheManager;
pub use namespace::Namespace;
pub use timer::ArmedTimer;
