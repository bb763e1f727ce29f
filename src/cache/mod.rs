//! Response cache for same-origin static assets.
//!
//! This module provides:
//! - A named cache-store abstraction with a SQLite backend
//! - The eligibility check deciding which requests may be cached
//! - A cache-first read-through layer with an offline error page
//! - Bulk fills (independent pre-warming and all-or-nothing `add_all`)

mod interceptor;
mod layer;
mod storage;
mod traits;

pub use interceptor::CacheScope;
pub use layer::CacheLayer;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::{CacheKey, CacheResult, CacheSource, CachedResponse};
