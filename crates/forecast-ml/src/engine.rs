//! 다중 일자 재귀 예측.
//!
//! 매 단계 모델이 다음 스케일된 종가를 내면, 윈도우 마지막 행의
//! Open/High/Low/Volume을 그대로 두고 Close만 바꾼 행을 만들어 윈도우에 붙입니다.
//! 예측 구간 전체에서 O/H/L/V는 마지막 관측값으로 고정됩니다.

use crate::error::{MlError, MlResult};
use crate::model::SequenceRegressor;
use crate::sequence::{seed_window, MinMaxScaler, WINDOW_SIZE};
use chrono::Duration;
use forecast_core::{Clock, FeatureRow, ForecastPoint, CLOSE_INDEX};
use ndarray::{concatenate, s, Array1, Axis};
use std::sync::Arc;
use tracing::debug;

/// 일자별 신뢰도 감소폭.
const CONFIDENCE_DECAY_PER_DAY: f64 = 0.02;
/// 신뢰도 하한.
const MIN_CONFIDENCE: f64 = 0.5;
/// 기본 밴드 비율.
const BASE_BAND_RATIO: f64 = 0.05;
/// 일자별 밴드 확장 비율.
const BAND_GROWTH_PER_DAY: f64 = 0.1;

/// `day`(1부터) 번째 예측의 신뢰도.
pub fn confidence_score(day: usize) -> f64 {
    (1.0 - day as f64 * CONFIDENCE_DECAY_PER_DAY).max(MIN_CONFIDENCE)
}

/// `day`(1부터) 번째 예측의 밴드 반폭.
pub fn band_half_width(predicted_price: f64, day: usize) -> f64 {
    predicted_price.abs() * BASE_BAND_RATIO * (1.0 + day as f64 * BAND_GROWTH_PER_DAY)
}

/// 재귀 예측 엔진.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    window: usize,
    clock: Arc<dyn Clock>,
}

impl ForecastEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            window: WINDOW_SIZE,
            clock,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// `rows`(실제 값, 날짜 오름차순)의 최근 윈도우로 `horizon`일을 예측합니다.
    pub fn forecast(
        &self,
        regressor: &dyn SequenceRegressor,
        scaler: &MinMaxScaler,
        rows: &[FeatureRow],
        horizon: usize,
    ) -> MlResult<Vec<ForecastPoint>> {
        if horizon == 0 {
            return Err(MlError::InvalidInput(
                "예측 일수는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.window == 0 {
            return Err(MlError::InvalidInput(
                "윈도우 크기는 1 이상이어야 합니다".to_string(),
            ));
        }

        let mut window = seed_window(scaler, rows, self.window)?;
        let today = self.clock.today();
        let mut points = Vec::with_capacity(horizon);

        for day in 1..=horizon {
            let scaled_close = regressor.predict_next(window.view())?;
            if !scaled_close.is_finite() {
                return Err(MlError::Inference(format!(
                    "{}일차 예측값이 유한하지 않습니다: {}",
                    day, scaled_close
                )));
            }

            let mut next_row: Array1<f64> = window.row(self.window - 1).to_owned();
            next_row[CLOSE_INDEX] = scaled_close;
            let predicted_price = scaler.inverse_close(scaled_close);

            let band = band_half_width(predicted_price, day);
            points.push(ForecastPoint {
                date: today + Duration::days(day as i64),
                predicted_price,
                confidence_upper: predicted_price + band,
                confidence_lower: (predicted_price - band).max(0.0),
                confidence_score: confidence_score(day),
            });

            window = concatenate(
                Axis(0),
                &[window.slice(s![1.., ..]), next_row.view().insert_axis(Axis(0))],
            )
            .map_err(|e| MlError::Inference(format!("윈도우 갱신 실패: {}", e)))?;
        }

        debug!(
            horizon,
            model = regressor.model_name(),
            first = points.first().map(|p| p.predicted_price),
            last = points.last().map(|p| p.predicted_price),
            "예측 생성"
        );
        Ok(points)
    }
}

/// 예측 구간 평균 신뢰도.
pub fn mean_confidence(points: &[ForecastPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.confidence_score).sum::<f64>() / points.len() as f64
}
