//! 예측 결과 구조체.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 하루치 예측 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 예측 대상 날짜
    pub date: NaiveDate,
    /// 예측 종가
    pub predicted_price: f64,
    /// 신뢰 구간 상단
    pub confidence_upper: f64,
    /// 신뢰 구간 하단 (0 이상)
    pub confidence_lower: f64,
    /// 신뢰도 점수 (0.5 ~ 1.0)
    pub confidence_score: f64,
}

impl ForecastPoint {
    /// 신뢰 구간 폭.
    pub fn band_width(&self) -> f64 {
        self.confidence_upper - self.confidence_lower
    }
}
