//! TTL 기반 시세 캐시.

mod file;
mod key;
mod memory;
mod provider;
mod store;

pub use file::FileCacheStore;
pub use key::cache_key;
pub use memory::MemoryCacheStore;
pub use provider::{CachedBarProvider, LatestPrice};
pub use store::{CacheEntry, CacheRequest, CacheStats, CacheStore};
