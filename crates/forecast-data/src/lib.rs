//! # Forecast Data
//!
//! 시세 데이터 수집 계층입니다.
//!
//! ```text
//! get_bars(ticker, start, end)
//!         │
//!         ▼
//! ┌────────────────────┐  hit (TTL 이내)
//! │ CacheStore::get    │ ────────────────▶ payload 그대로 반환
//! └─────────┬──────────┘
//!           │ miss
//!           ▼
//! ┌────────────────────┐
//! │ BarSource::fetch   │ ← Yahoo Finance 등 외부 소스
//! └─────────┬──────────┘
//!           ▼
//! ┌────────────────────┐  실패
//! │ validate_bars      │ ────────────────▶ 에러 (캐시하지 않음)
//! └─────────┬──────────┘
//!           ▼
//!   CacheStore::put + CSV 스냅샷 → 반환
//! ```

pub mod cache;
pub mod error;
pub mod snapshot;
pub mod source;
pub mod validation;
pub mod yahoo;

pub use cache::{
    cache_key, CacheEntry, CacheRequest, CacheStats, CacheStore, CachedBarProvider,
    FileCacheStore, LatestPrice, MemoryCacheStore,
};
pub use error::{DataError, Result};
pub use snapshot::SnapshotStore;
pub use source::{BarSource, StaticBarSource};
pub use validation::validate_bars;
pub use yahoo::YahooBarSource;
