//! 데이터 캐시 관리 명령.

use super::context::AppContext;
use anyhow::{Context, Result};
use forecast_core::Ticker;
use forecast_data::CacheStats;
use serde::Serialize;

/// `cache-clear` 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheClearReport {
    pub ticker: Option<Ticker>,
    pub removed_entries: usize,
}

pub async fn stats(ctx: &AppContext) -> Result<CacheStats> {
    ctx.service
        .provider()
        .cache_stats()
        .await
        .context("캐시 통계 조회 실패")
}

/// 캐시를 비웁니다. 티커가 없으면 전체 캐시가 대상입니다.
pub async fn clear(ctx: &AppContext, ticker: Option<&str>) -> Result<CacheClearReport> {
    let ticker = ticker.map(Ticker::new).transpose()?;
    let removed_entries = ctx
        .service
        .provider()
        .clear_cache(ticker.as_ref())
        .await
        .context("캐시 삭제 실패")?;

    Ok(CacheClearReport {
        ticker,
        removed_entries,
    })
}
