//! 재귀 예측 엔진 테스트 (MockRegressor 사용).

mod common;

use chrono::Duration;
use forecast_core::{FeatureRow, ManualClock, CLOSE_INDEX};
use forecast_ml::{
    ForecastEngine, MinMaxScaler, MlError, MlResult, MockRegressor, SequenceRegressor, WINDOW_SIZE,
};
use ndarray::ArrayView2;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

fn rows(n: usize) -> Vec<FeatureRow> {
    (0..n)
        .map(|i| {
            let close = 40.0 + i as f64 * 0.25;
            [close - 0.1, close + 0.5, close - 0.5, close, 5_000.0 + i as f64]
        })
        .collect()
}

fn engine() -> ForecastEngine {
    ForecastEngine::new(Arc::new(ManualClock::new(common::now())))
}

proptest! {
    /// 정확히 horizon개의 점이 내일부터 하루씩 증가하는 날짜로 나옵니다.
    /// 신뢰도는 감소(≥0.5)하고 밴드 폭은 넓어집니다.
    #[test]
    fn test_forecast_shape_and_monotonicity(horizon in 1usize..=90, drift in 0.0f64..0.05) {
        let data = rows(80);
        let scaler = MinMaxScaler::fit(&data).unwrap();
        let mock = MockRegressor::new(drift);

        let points = engine().forecast(&mock, &scaler, &data, horizon).unwrap();
        prop_assert_eq!(points.len(), horizon);
        prop_assert_eq!(mock.calls(), horizon);
        prop_assert_eq!(points[0].date, common::today() + Duration::days(1));

        for pair in points.windows(2) {
            prop_assert_eq!(pair[1].date, pair[0].date + Duration::days(1));
            prop_assert!(pair[1].confidence_score <= pair[0].confidence_score);
            prop_assert!(pair[1].band_width() >= pair[0].band_width() - 1e-9);
        }
        for p in &points {
            prop_assert!(p.confidence_score >= 0.5);
            prop_assert!(p.confidence_lower >= 0.0);
            prop_assert!(p.confidence_lower <= p.predicted_price);
            prop_assert!(p.confidence_upper >= p.predicted_price);
        }
    }
}

#[test]
fn test_zero_drift_holds_last_close() {
    let data = rows(70);
    let scaler = MinMaxScaler::fit(&data).unwrap();
    let points = engine()
        .forecast(&MockRegressor::new(0.0), &scaler, &data, 5)
        .unwrap();

    let last_close = data[69][CLOSE_INDEX];
    for p in &points {
        assert!((p.predicted_price - last_close).abs() < 1e-9);
    }
    assert!((points[0].confidence_score - 0.98).abs() < 1e-12);
    assert!((points[0].confidence_upper - last_close * 1.055).abs() < 1e-9);
}

#[test]
fn test_drift_compounds_through_window() {
    let data = rows(70);
    let scaler = MinMaxScaler::fit(&data).unwrap();
    let points = engine()
        .forecast(&MockRegressor::new(0.1), &scaler, &data, 3)
        .unwrap();

    // 각 단계가 직전 예측을 윈도우 끝으로 사용하는지 확인
    let range = scaler.data_max()[CLOSE_INDEX] - scaler.data_min()[CLOSE_INDEX];
    for pair in points.windows(2) {
        let step = pair[1].predicted_price - pair[0].predicted_price;
        assert!((step - 0.1 * range).abs() < 1e-9);
    }
}

#[test]
fn test_zero_horizon_rejected() {
    let data = rows(70);
    let scaler = MinMaxScaler::fit(&data).unwrap();
    let result = engine().forecast(&MockRegressor::new(0.0), &scaler, &data, 0);
    assert!(matches!(result, Err(MlError::InvalidInput(_))));
}

#[test]
fn test_short_history_is_insufficient() {
    let data = rows(WINDOW_SIZE - 1);
    let scaler = MinMaxScaler::fit(&data).unwrap();
    let result = engine().forecast(&MockRegressor::new(0.0), &scaler, &data, 3);
    assert!(matches!(
        result,
        Err(MlError::InsufficientHistory { required: 60, actual: 59 })
    ));
}

#[test]
fn test_lower_bound_clamped_at_zero() {
    let data = rows(70);
    let scaler = MinMaxScaler::fit(&data).unwrap();
    // 스케일 공간에서 크게 떨어뜨려 음수 가격 유도
    let points = engine()
        .forecast(&MockRegressor::new(-5.0), &scaler, &data, 2)
        .unwrap();
    assert!(points[1].predicted_price < 0.0);
    assert_eq!(points[1].confidence_lower, 0.0);
}

/// 매 단계 윈도우의 마지막 행을 기록하고, 스케일된 종가에 고정 폭을 더해 반환합니다.
struct RecordingRegressor {
    step: f64,
    last_rows: Mutex<Vec<Vec<f64>>>,
}

impl RecordingRegressor {
    fn new(step: f64) -> Self {
        Self {
            step,
            last_rows: Mutex::new(Vec::new()),
        }
    }

    fn rows(&self) -> Vec<Vec<f64>> {
        self.last_rows.lock().unwrap().clone()
    }
}

impl SequenceRegressor for RecordingRegressor {
    fn predict_next(&self, window: ArrayView2<f64>) -> MlResult<f64> {
        let last = window.row(window.nrows() - 1).to_vec();
        let next = last[CLOSE_INDEX] + self.step;
        self.last_rows.lock().unwrap().push(last);
        Ok(next)
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

#[test]
fn test_only_close_evolves_across_horizon() {
    let data = rows(70);
    let scaler = MinMaxScaler::fit(&data).unwrap();
    let observed = scaler.transform_row(&data[69]);
    let recorder = RecordingRegressor::new(0.01);

    engine().forecast(&recorder, &scaler, &data, 6).unwrap();

    let seen = recorder.rows();
    assert_eq!(seen.len(), 6);
    for (step, row) in seen.iter().enumerate() {
        // Open/High/Low/Volume는 마지막 관측값 그대로
        for col in [0, 1, 2, 4] {
            assert!(
                (row[col] - observed[col]).abs() < 1e-12,
                "{}단계 {}열 변경됨: {} != {}",
                step,
                col,
                row[col],
                observed[col]
            );
        }
        let expected_close = observed[CLOSE_INDEX] + 0.01 * step as f64;
        assert!((row[CLOSE_INDEX] - expected_close).abs() < 1e-12);
    }
}

#[test]
fn test_zero_window_rejected() {
    let data = rows(70);
    let scaler = MinMaxScaler::fit(&data).unwrap();
    let result = engine()
        .with_window(0)
        .forecast(&MockRegressor::new(0.0), &scaler, &data, 3);
    assert!(matches!(result, Err(MlError::InvalidInput(_))));
}
