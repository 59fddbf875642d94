//! 캐시 우선 시세 제공자.

use super::key::cache_key;
use super::store::{CacheEntry, CacheRequest, CacheStats, CacheStore};
use crate::error::{DataError, Result};
use crate::snapshot::SnapshotStore;
use crate::source::BarSource;
use crate::validation::validate_bars;
use chrono::{Duration, NaiveDate};
use forecast_core::{Clock, RawBar, Ticker};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 최신 가격 조회 시 거슬러 올라가는 일수 (주말/휴장일 포함).
const LATEST_PRICE_LOOKBACK_DAYS: i64 = 7;

/// 최신 가격.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestPrice {
    pub ticker: Ticker,
    pub date: NaiveDate,
    pub price: f64,
    pub volume: Option<f64>,
    /// 직전 거래일 대비 변동
    pub change: Option<f64>,
}

/// 캐시 기반 일봉 제공자.
///
/// 유효한 캐시가 있으면 외부 소스를 호출하지 않습니다. 검증에 실패한 페이로드는
/// 캐시와 스냅샷 어디에도 기록되지 않습니다.
pub struct CachedBarProvider {
    source: Arc<dyn BarSource>,
    store: Arc<dyn CacheStore>,
    snapshots: Option<SnapshotStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CachedBarProvider {
    /// 새 제공자를 생성합니다. 기본 TTL은 1시간입니다.
    pub fn new(
        source: Arc<dyn BarSource>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            snapshots: None,
            ttl: Duration::hours(1),
            clock,
        }
    }

    /// 캐시 유효 기간 설정.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// CSV 스냅샷 저장소 설정.
    pub fn with_snapshots(mut self, snapshots: SnapshotStore) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// `start..=end` 구간 일봉 조회 (캐시 우선).
    ///
    /// `use_cache`가 false면 캐시를 읽지도 쓰지도 않고 외부 소스를 호출합니다.
    /// 스냅샷은 검증을 통과하면 항상 갱신됩니다.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn get_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
        use_cache: bool,
    ) -> Result<Vec<RawBar>> {
        let key = cache_key(ticker, start, end);

        if use_cache {
            if let Some(entry) = self.store.get(&key).await {
                debug!(rows = entry.payload.len(), "캐시 적중");
                return Ok(entry.payload);
            }
        }

        let bars = self.source.fetch(ticker, start, end).await;
        if bars.is_empty() {
            warn!("외부 소스 응답 없음");
            return Err(DataError::NoData(format!(
                "{} ({} ~ {})",
                ticker, start, end
            )));
        }

        validate_bars(ticker, &bars)?;

        let fetched_at = self.clock.now();
        if use_cache {
            let entry = CacheEntry::new(
                key.clone(),
                CacheRequest {
                    ticker: ticker.clone(),
                    start,
                    end,
                },
                bars.clone(),
                fetched_at,
            );
            if let Err(e) = self.store.put(&key, entry, self.ttl).await {
                warn!(error = %e, "캐시 기록 실패");
            }
        }

        if let Some(snapshots) = &self.snapshots {
            if let Err(e) = snapshots.write(ticker, &bars, fetched_at, start, end).await {
                warn!(error = %e, "CSV 스냅샷 기록 실패");
            }
        }

        info!(rows = bars.len(), "외부 소스에서 일봉 수집");
        Ok(bars)
    }

    /// 최신 종가 조회. 캐시를 사용하지 않습니다.
    #[instrument(skip(self))]
    pub async fn latest_price(&self, ticker: &Ticker) -> Result<LatestPrice> {
        let end = self.clock.today();
        let start = end - Duration::days(LATEST_PRICE_LOOKBACK_DAYS);
        let bars = self.get_bars(ticker, start, end, false).await?;

        let mut priced: Vec<&RawBar> = bars.iter().filter(|b| b.close.is_some()).collect();
        priced.sort_by_key(|b| b.date);

        let (last, prev) = match priced.as_slice() {
            [.., prev, last] => (*last, Some(*prev)),
            [last] => (*last, None),
            [] => return Err(DataError::NoData(format!("{}: 종가 없음", ticker))),
        };
        let price = last.close.unwrap_or_default();

        Ok(LatestPrice {
            ticker: ticker.clone(),
            date: last.date,
            price,
            volume: last.volume,
            change: prev.and_then(|p| p.close).map(|c| price - c),
        })
    }

    /// 캐시 삭제.
    pub async fn clear_cache(&self, ticker: Option<&Ticker>) -> Result<usize> {
        let removed = self.store.clear(ticker).await?;
        info!(removed, ticker = ?ticker.map(|t| t.as_str()), "캐시 삭제");
        Ok(removed)
    }

    /// 캐시 통계.
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::source::StaticBarSource;
    use chrono::{TimeZone, Utc};
    use forecast_core::ManualClock;

    fn bars(n: u32) -> Vec<RawBar> {
        (1..=n)
            .map(|d| {
                let close = 100.0 + d as f64;
                RawBar::new(
                    NaiveDate::from_ymd_opt(2024, 6, d).unwrap(),
                    close,
                    close + 1.0,
                    close - 1.0,
                    close,
                    1_000.0,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_latest_price_uses_last_two_bars() {
        let ticker = Ticker::new("LP").unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap(),
        ));
        let source = Arc::new(StaticBarSource::new().with_bars(ticker.clone(), bars(10)));
        let provider = CachedBarProvider::new(
            source,
            Arc::new(MemoryCacheStore::new(clock.clone())),
            clock,
        );

        let latest = provider.latest_price(&ticker).await.unwrap();
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(latest.price, 110.0);
        assert_eq!(latest.change, Some(1.0));
    }
}
