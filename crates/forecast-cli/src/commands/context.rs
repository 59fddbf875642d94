//! 설정으로부터 서비스 구성.

use anyhow::{Context, Result};
use forecast_core::{AppConfig, Clock, SystemClock};
use forecast_data::{BarSource, CachedBarProvider, FileCacheStore, SnapshotStore, YahooBarSource};
use forecast_ml::{ForecastService, ModelStore};
use std::sync::Arc;
use tracing::info;

/// `chrono::Duration::seconds`가 허용하는 최대값.
const MAX_TTL_SECS: i64 = i64::MAX / 1_000;

/// 명령 실행에 필요한 설정과 서비스 묶음.
pub struct AppContext {
    pub config: AppConfig,
    pub service: Arc<ForecastService>,
}

impl AppContext {
    /// Yahoo Finance 소스와 시스템 시계로 컨텍스트를 만듭니다.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let source = YahooBarSource::new().context("Yahoo Finance 클라이언트 생성 실패")?;
        Self::build(config, Arc::new(source), Arc::new(SystemClock)).await
    }

    /// 주어진 데이터 소스와 시계로 컨텍스트를 만들고 저장된 모델을 불러옵니다.
    pub async fn build(
        config: AppConfig,
        source: Arc<dyn BarSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let cache = FileCacheStore::new(config.storage.cache_dir(), clock.clone());
        let ttl_secs = i64::try_from(config.cache.ttl_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_TTL_SECS);
        let ttl = chrono::Duration::seconds(ttl_secs);
        let provider = CachedBarProvider::new(source, Arc::new(cache), clock.clone())
            .with_ttl(ttl)
            .with_snapshots(SnapshotStore::new(config.storage.snapshot_dir()));

        let store = Arc::new(ModelStore::new(config.storage.model_dir.clone(), clock.clone()));
        let service = ForecastService::new(Arc::new(provider), store, clock)
            .with_training_config(config.training.clone())
            .with_forecast_config(config.forecast.clone());

        let loaded = service.initialize().await.context("저장된 모델 로드 실패")?;
        info!(
            models = loaded,
            model_dir = %config.storage.model_dir.display(),
            "서비스 준비 완료"
        );

        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }
}
