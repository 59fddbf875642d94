//! 다음 종가 회귀 trait과 구현체.

use super::LstmNetwork;
use crate::error::{MlError, MlResult};
use forecast_core::CLOSE_INDEX;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 스케일된 윈도우 (steps, features)에서 다음 스케일된 종가를 예측합니다.
pub trait SequenceRegressor: Send + Sync {
    fn predict_next(&self, window: ArrayView2<f64>) -> MlResult<f64>;

    /// 모델 이름 반환.
    fn model_name(&self) -> &str;
}

/// 학습된 LSTM 네트워크.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LstmRegressor {
    network: LstmNetwork,
}

impl LstmRegressor {
    pub fn new(network: LstmNetwork) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &LstmNetwork {
        &self.network
    }

    /// bincode 직렬화.
    pub fn to_bytes(&self) -> MlResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> MlResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl SequenceRegressor for LstmRegressor {
    fn predict_next(&self, window: ArrayView2<f64>) -> MlResult<f64> {
        self.network.predict_window(window)
    }

    fn model_name(&self) -> &str {
        "lstm_regressor"
    }
}

/// 테스트용 결정적 회귀기.
///
/// 윈도우 마지막 행의 종가에 고정 drift를 더한 값을 반환합니다.
#[derive(Debug, Default)]
pub struct MockRegressor {
    drift: f64,
    calls: AtomicUsize,
}

impl MockRegressor {
    pub fn new(drift: f64) -> Self {
        Self {
            drift,
            calls: AtomicUsize::new(0),
        }
    }

    /// predict_next 호출 횟수.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SequenceRegressor for MockRegressor {
    fn predict_next(&self, window: ArrayView2<f64>) -> MlResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (steps, features) = window.dim();
        if steps == 0 || features <= CLOSE_INDEX {
            return Err(MlError::Inference(format!(
                "윈도우 형태가 잘못되었습니다: {:?}",
                window.shape()
            )));
        }
        Ok(window[[steps - 1, CLOSE_INDEX]] + self.drift)
    }

    fn model_name(&self) -> &str {
        "mock_regressor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkConfig;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mock_regressor_adds_drift() {
        let mock = MockRegressor::new(0.01);
        let mut window = Array2::zeros((3, 5));
        window[[2, CLOSE_INDEX]] = 0.5;
        let next = mock.predict_next(window.view()).unwrap();
        assert!((next - 0.51).abs() < 1e-12);
        assert_eq!(mock.calls(), 1);

        let empty = Array2::<f64>::zeros((0, 5));
        assert!(mock.predict_next(empty.view()).is_err());
    }

    #[test]
    fn test_lstm_bytes_round_trip_preserves_predictions() {
        let mut rng = StdRng::seed_from_u64(21);
        let network = LstmNetwork::new(NetworkConfig::default(), &mut rng).unwrap();
        let regressor = LstmRegressor::new(network);

        let window = Array2::from_shape_fn((60, 5), |(t, f)| (t as f64 * 0.01 + f as f64 * 0.1).fract());
        let before = regressor.predict_next(window.view()).unwrap();

        let restored = LstmRegressor::from_bytes(&regressor.to_bytes().unwrap()).unwrap();
        let after = restored.predict_next(window.view()).unwrap();
        assert_eq!(before, after);
    }
}
