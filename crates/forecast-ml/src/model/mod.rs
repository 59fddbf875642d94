//! LSTM 시퀀스 회귀 모델.
//!
//! - [`lstm`]: 배치 순전파 + BPTT 역전파를 지원하는 LSTM 레이어
//! - [`dense`]: 완전연결 레이어 (ReLU / Linear)
//! - [`network`]: 3×LSTM(50) → Dense(25, ReLU) → Dense(1) 고정 구조
//! - [`optimizer`]: Adam
//! - [`trainer`]: 조기 종료와 학습률 감소를 포함한 학습 루프
//! - [`regressor`]: 예측 엔진이 사용하는 `SequenceRegressor` trait

pub mod dense;
pub mod lstm;
pub mod network;
pub mod optimizer;
pub mod regressor;
pub mod trainer;

pub use dense::{Activation, DenseLayer};
pub use lstm::LstmLayer;
pub use network::{LstmNetwork, NetworkConfig};
pub use optimizer::Adam;
pub use regressor::{LstmRegressor, MockRegressor, SequenceRegressor};
pub use trainer::{EpochMetrics, Trainer, TrainingReport};

use ndarray::{Array, Array2, Dimension, ShapeBuilder};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 학습 가능한 파라미터와 누적 기울기.
///
/// 기울기는 직렬화하지 않습니다. 로드 후에는 [`Param::zero_grad`]로 다시 만듭니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Array2<f64>,
    #[serde(skip)]
    pub grad: Array2<f64>,
}

impl Param {
    pub fn new(value: Array2<f64>) -> Self {
        let grad = Array2::zeros(value.raw_dim());
        Self { value, grad }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(Array2::zeros((rows, cols)))
    }

    /// Glorot uniform: U(-limit, limit), limit = sqrt(6 / (fan_in + fan_out)).
    pub fn glorot(rows: usize, cols: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (rows + cols) as f64).sqrt();
        Self::new(Array2::random_using(
            (rows, cols),
            Uniform::new(-limit, limit),
            rng,
        ))
    }

    pub fn zero_grad(&mut self) {
        if self.grad.raw_dim() == self.value.raw_dim() {
            self.grad.fill(0.0);
        } else {
            self.grad = Array2::zeros(self.value.raw_dim());
        }
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// inverted dropout 마스크. 유지된 원소는 1/(1-rate)로 스케일됩니다.
pub(crate) fn dropout_mask<Sh, D>(shape: Sh, rate: f64, rng: &mut StdRng) -> Array<f64, D>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
{
    if rate <= 0.0 {
        return Array::ones(shape);
    }
    let keep = 1.0 - rate;
    Array::random_using(shape, Uniform::new(0.0, 1.0), rng)
        .mapv(|u: f64| if u < keep { 1.0 / keep } else { 0.0 })
}
