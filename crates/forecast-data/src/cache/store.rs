use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use forecast_core::{RawBar, Ticker};
use serde::{Deserialize, Serialize};

/// 캐시 엔트리를 만든 요청 파라미터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRequest {
    pub ticker: Ticker,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// 캐시 엔트리.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 캐시 키
    pub key: String,
    /// 요청 파라미터
    pub request: CacheRequest,
    /// 수집한 일봉
    pub payload: Vec<RawBar>,
    /// 수집 시각
    pub fetched_at: DateTime<Utc>,
    /// 만료 시각. `put`이 기록 시점 + TTL로 설정합니다.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// 아직 만료 시각이 정해지지 않은 엔트리를 생성합니다.
    pub fn new(
        key: impl Into<String>,
        request: CacheRequest,
        payload: Vec<RawBar>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            request,
            payload,
            fetched_at,
            expires_at: fetched_at,
        }
    }

    /// `now` 기준으로 유효한지 확인합니다.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// 캐시 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// 전체 엔트리 수
    pub entries: usize,
    /// 유효한 엔트리 수
    pub fresh_entries: usize,
    /// 저장 크기 (바이트)
    pub total_bytes: u64,
}

/// 캐시 저장소.
///
/// 유효성은 저장소가 가진 시계로 판단합니다. 만료된 엔트리는 `get`에서 보이지 않습니다.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 유효한 엔트리를 조회합니다.
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// 엔트리를 기록합니다. 만료 시각은 기록 시점 + `ttl`입니다.
    async fn put(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<()>;

    /// 엔트리를 삭제합니다. `ticker`가 주어지면 해당 티커의 엔트리만 삭제합니다.
    async fn clear(&self, ticker: Option<&Ticker>) -> Result<usize>;

    /// 저장소 통계.
    async fn stats(&self) -> Result<CacheStats>;
}
