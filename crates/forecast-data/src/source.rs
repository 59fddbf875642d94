//! 시세 데이터 소스 추상화.

use async_trait::async_trait;
use chrono::NaiveDate;
use forecast_core::{RawBar, Ticker};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// 일봉 데이터 제공자.
///
/// 실패와 빈 응답은 모두 빈 벡터로 보고합니다. 원인은 구현체가 로그로 남깁니다.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// 소스 이름 (로그용).
    fn name(&self) -> &str;

    /// `start..=end` 구간의 일봉을 가져옵니다.
    async fn fetch(&self, ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> Vec<RawBar>;
}

/// 메모리에 고정된 일봉을 돌려주는 소스.
///
/// 테스트와 오프라인 실행에 사용합니다. 호출 횟수를 기록합니다.
#[derive(Debug, Default)]
pub struct StaticBarSource {
    bars: RwLock<HashMap<Ticker, Vec<RawBar>>>,
    calls: AtomicUsize,
}

impl StaticBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 티커의 일봉을 등록한 소스를 반환합니다.
    pub fn with_bars(self, ticker: Ticker, bars: Vec<RawBar>) -> Self {
        self.set_bars(ticker, bars);
        self
    }

    /// 티커의 일봉을 교체합니다.
    pub fn set_bars(&self, ticker: Ticker, bars: Vec<RawBar>) {
        let mut guard = self.bars.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(ticker, bars);
    }

    /// 지금까지의 fetch 호출 횟수.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BarSource for StaticBarSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.bars.read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_filters_range() {
        let ticker = Ticker::new("ABC").unwrap();
        let bars: Vec<RawBar> = (1..=10)
            .map(|d| {
                RawBar::new(
                    NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                    1.0,
                    1.0,
                    1.0,
                    1.0,
                    1.0,
                )
            })
            .collect();
        let source = StaticBarSource::new().with_bars(ticker.clone(), bars);

        let got = source
            .fetch(
                &ticker,
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            )
            .await;
        assert_eq!(got.len(), 3);
        assert_eq!(source.fetch_count(), 1);

        let other = Ticker::new("XYZ").unwrap();
        assert!(source
            .fetch(
                &other,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
            )
            .await
            .is_empty());
    }
}
