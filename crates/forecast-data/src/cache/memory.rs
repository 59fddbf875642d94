use super::store::{CacheEntry, CacheStats, CacheStore};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Duration;
use forecast_core::{Clock, Ticker};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 프로세스 메모리 캐시.
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| e.is_fresh(now)).cloned()
    }

    async fn put(&self, key: &str, mut entry: CacheEntry, ttl: Duration) -> Result<()> {
        entry.expires_at = self.clock.now() + ttl;
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn clear(&self, ticker: Option<&Ticker>) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        match ticker {
            Some(t) => entries.retain(|_, e| &e.request.ticker != t),
            None => entries.clear(),
        }
        Ok(before - entries.len())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(CacheStats {
            entries: entries.len(),
            fresh_entries: entries.values().filter(|e| e.is_fresh(now)).count(),
            total_bytes: 0,
        })
    }
}
