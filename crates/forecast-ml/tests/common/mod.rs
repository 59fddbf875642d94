//! 통합 테스트 공용 fixture.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use forecast_core::{ManualClock, RawBar, Ticker, TrainingConfig};
use forecast_data::{CachedBarProvider, MemoryCacheStore, StaticBarSource};
use forecast_ml::{ForecastService, ModelStore};
use std::sync::Arc;

/// 테스트 기준 시각: 2024-06-30 12:00 UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

/// `end`로 끝나는 연속된 `n`일치 상승 일봉.
pub fn ascending_bars(n: usize, end: NaiveDate) -> Vec<RawBar> {
    (0..n)
        .map(|i| {
            let date = end - Duration::days((n - 1 - i) as i64);
            let close = 100.0 + i as f64 * 0.5;
            RawBar::new(
                date,
                close - 0.3,
                close + 1.0,
                close - 1.0,
                close,
                1_000_000.0 + (i % 5) as f64 * 10_000.0,
            )
        })
        .collect()
}

/// 짧고 결정적인 학습 설정.
pub fn quick_training() -> TrainingConfig {
    TrainingConfig::default()
        .with_max_epochs(2)
        .with_seed(7)
}

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub clock: Arc<ManualClock>,
    pub source: Arc<StaticBarSource>,
    pub store: Arc<ModelStore>,
    pub service: Arc<ForecastService>,
}

pub fn fixture_with(bars: Vec<(Ticker, Vec<RawBar>)>, training: TrainingConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(now()));

    let mut source = StaticBarSource::new();
    for (ticker, rows) in bars {
        source = source.with_bars(ticker, rows);
    }
    let source = Arc::new(source);

    let provider = Arc::new(CachedBarProvider::new(
        source.clone(),
        Arc::new(MemoryCacheStore::new(clock.clone())),
        clock.clone(),
    ));
    let store = Arc::new(ModelStore::new(dir.path().join("models"), clock.clone()));
    let service = Arc::new(
        ForecastService::new(provider, store.clone(), clock.clone())
            .with_training_config(training),
    );

    Fixture {
        dir,
        clock,
        source,
        store,
        service,
    }
}

pub fn fixture(ticker: &Ticker, bars: Vec<RawBar>) -> Fixture {
    fixture_with(vec![(ticker.clone(), bars)], quick_training())
}
