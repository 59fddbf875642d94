//! 일봉 데이터 구조체.
//!
//! - [`RawBar`]: 외부 소스에서 받은 그대로의 행. 모든 수치 필드가 비어 있을 수 있습니다.
//! - [`Bar`]: 정제가 끝난 행. 모든 필드가 채워져 있습니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 모델 입력 feature 개수 (Open, High, Low, Close, Volume).
pub const FEATURE_COUNT: usize = 5;

/// 모델 입력 feature 이름 (순서 고정).
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["Open", "High", "Low", "Close", "Volume"];

/// feature 벡터에서 종가 위치.
pub const CLOSE_INDEX: usize = 3;

/// 단일 feature 벡터.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// 외부 소스에서 받은 원시 일봉.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Option<f64>,
    /// 고가
    pub high: Option<f64>,
    /// 저가
    pub low: Option<f64>,
    /// 종가
    pub close: Option<f64>,
    /// 거래량
    pub volume: Option<f64>,
    /// 수정 종가
    #[serde(default)]
    pub adj_close: Option<f64>,
}

impl RawBar {
    /// 모든 필드가 채워진 원시 일봉을 생성합니다. 수정 종가는 종가와 같습니다.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
            adj_close: Some(close),
        }
    }

    /// 값이 하나도 없는 행.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            adj_close: None,
        }
    }

    /// 필수 필드(OHLCV) 중 비어 있는 것이 있는지 확인합니다.
    pub fn has_missing_required(&self) -> bool {
        self.open.is_none()
            || self.high.is_none()
            || self.low.is_none()
            || self.close.is_none()
            || self.volume.is_none()
    }

    /// 모든 필수 필드가 채워져 있으면 [`Bar`]로 변환합니다.
    ///
    /// 수정 종가가 없으면 종가로 대체합니다.
    pub fn to_bar(&self) -> Option<Bar> {
        let close = self.close?;
        Some(Bar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close,
            volume: self.volume?,
            adj_close: self.adj_close.unwrap_or(close),
        })
    }
}

/// 정제된 일봉.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: f64,
    /// 수정 종가
    pub adj_close: f64,
}

impl Bar {
    /// 새 일봉을 생성합니다. 수정 종가는 종가와 같습니다.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            adj_close: close,
        }
    }

    /// 모델 입력 feature 벡터 (Open, High, Low, Close, Volume).
    pub fn features(&self) -> FeatureRow {
        [self.open, self.high, self.low, self.close, self.volume]
    }

    /// 고가 ≥ 저가 이고 모든 가격이 양수인지 확인합니다.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.low
            && [self.open, self.high, self.low, self.close]
                .iter()
                .all(|p| *p > 0.0)
    }
}

impl From<&Bar> for RawBar {
    fn from(bar: &Bar) -> Self {
        Self {
            date: bar.date,
            open: Some(bar.open),
            high: Some(bar.high),
            low: Some(bar.low),
            close: Some(bar.close),
            volume: Some(bar.volume),
            adj_close: Some(bar.adj_close),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_raw_to_bar_requires_ohlcv() {
        let raw = RawBar::new(day(2), 10.0, 11.0, 9.0, 10.5, 1000.0);
        let bar = raw.to_bar().unwrap();
        assert_eq!(bar.features(), [10.0, 11.0, 9.0, 10.5, 1000.0]);

        let mut missing = raw.clone();
        missing.volume = None;
        assert!(missing.has_missing_required());
        assert!(missing.to_bar().is_none());
    }

    #[test]
    fn test_adj_close_falls_back_to_close() {
        let mut raw = RawBar::new(day(3), 10.0, 11.0, 9.0, 10.5, 1000.0);
        raw.adj_close = None;
        assert_eq!(raw.to_bar().unwrap().adj_close, 10.5);
    }

    #[test]
    fn test_bar_consistency() {
        assert!(Bar::new(day(4), 10.0, 11.0, 9.0, 10.0, 1.0).is_consistent());
        assert!(!Bar::new(day(4), 10.0, 10.0, 20.0, 10.0, 1.0).is_consistent());
        assert!(!Bar::new(day(4), 0.0, 11.0, 9.0, 10.0, 1.0).is_consistent());
    }
}
