//! 고정 구조 LSTM 회귀 네트워크.
//!
//! ```text
//! (batch, 60, 5)
//!   → LSTM(50, 전체 시퀀스) → Dropout(0.2)
//!   → LSTM(50, 전체 시퀀스) → Dropout(0.2)
//!   → LSTM(50, 마지막 상태) → Dropout(0.2)
//!   → Dense(25, ReLU)       → Dropout(0.1)
//!   → Dense(1, Linear)
//! ```

use super::dense::DenseCache;
use super::lstm::LstmCache;
use super::{dropout_mask, Activation, DenseLayer, LstmLayer, Param};
use crate::error::{MlError, MlResult};
use forecast_core::FEATURE_COUNT;
use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 네트워크 구조.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub lstm_units: Vec<usize>,
    pub lstm_dropout: f64,
    pub dense_units: usize,
    pub dense_dropout: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_size: FEATURE_COUNT,
            lstm_units: vec![50, 50, 50],
            lstm_dropout: 0.2,
            dense_units: 25,
            dense_dropout: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmNetwork {
    config: NetworkConfig,
    lstm: Vec<LstmLayer>,
    hidden: DenseLayer,
    output: DenseLayer,
}

/// 학습 모드 순전파 기록.
#[derive(Debug)]
pub struct NetworkCache {
    lstm: Vec<(LstmCache, Array3<f64>)>,
    hidden: DenseCache,
    hidden_mask: Array2<f64>,
    output: DenseCache,
    steps: usize,
}

impl LstmNetwork {
    pub fn new(config: NetworkConfig, rng: &mut StdRng) -> MlResult<Self> {
        if config.lstm_units.is_empty() || config.input_size == 0 || config.dense_units == 0 {
            return Err(MlError::InvalidInput(format!(
                "유효하지 않은 네트워크 구조: {:?}",
                config
            )));
        }

        let mut lstm = Vec::with_capacity(config.lstm_units.len());
        let mut input_size = config.input_size;
        for &units in &config.lstm_units {
            lstm.push(LstmLayer::new(input_size, units, rng));
            input_size = units;
        }
        let hidden = DenseLayer::new(input_size, config.dense_units, Activation::Relu, rng);
        let output = DenseLayer::new(config.dense_units, 1, Activation::Linear, rng);

        Ok(Self {
            config,
            lstm,
            hidden,
            output,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// 출력 유닛의 bias (학습 시작 시 타깃 평균으로 설정).
    pub fn set_output_bias(&mut self, value: f64) {
        self.output.set_bias(value);
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = Vec::new();
        for layer in &mut self.lstm {
            params.extend(layer.params_mut());
        }
        params.extend(self.hidden.params_mut());
        params.extend(self.output.params_mut());
        params
    }

    pub fn zero_grad(&mut self) {
        for p in self.params_mut() {
            p.zero_grad();
        }
    }

    fn check_input(&self, x: &Array3<f64>) -> MlResult<()> {
        let (batch, steps, features) = x.dim();
        if batch == 0 || steps == 0 || features != self.config.input_size {
            return Err(MlError::Inference(format!(
                "입력 형태 불일치: {:?}, 기대 feature 수 {}",
                x.shape(),
                self.config.input_size
            )));
        }
        Ok(())
    }

    /// 추론 모드 (dropout 없음).
    pub fn predict(&self, x: &Array3<f64>) -> MlResult<Array1<f64>> {
        self.check_input(x)?;
        let steps = x.dim().1;

        let mut seq = x.clone();
        for layer in &self.lstm {
            seq = layer.infer(&seq);
        }
        let last = seq.index_axis(Axis(1), steps - 1).to_owned();
        let hidden = self.hidden.infer(&last);
        let out = self.output.infer(&hidden);
        Ok(out.column(0).to_owned())
    }

    /// 단일 윈도우 (steps, features) 예측.
    pub fn predict_window(&self, window: ArrayView2<f64>) -> MlResult<f64> {
        let x = window.to_owned().insert_axis(Axis(0));
        let out = self.predict(&x)?;
        out.get(0)
            .copied()
            .ok_or_else(|| MlError::Inference("빈 예측 결과".to_string()))
    }

    /// 학습 모드 순전파 (dropout 적용).
    pub fn forward_train(
        &self,
        x: &Array3<f64>,
        rng: &mut StdRng,
    ) -> MlResult<(Array1<f64>, NetworkCache)> {
        self.check_input(x)?;
        let steps = x.dim().1;

        let mut seq = x.clone();
        let mut lstm_caches = Vec::with_capacity(self.lstm.len());
        for layer in &self.lstm {
            let (out, cache) = layer.forward(&seq);
            let mask = dropout_mask(out.raw_dim(), self.config.lstm_dropout, rng);
            seq = out * &mask;
            lstm_caches.push((cache, mask));
        }

        let last = seq.index_axis(Axis(1), steps - 1).to_owned();
        let (hidden, hidden_cache) = self.hidden.forward(&last);
        let hidden_mask = dropout_mask(hidden.raw_dim(), self.config.dense_dropout, rng);
        let hidden = hidden * &hidden_mask;
        let (out, output_cache) = self.output.forward(&hidden);

        Ok((
            out.column(0).to_owned(),
            NetworkCache {
                lstm: lstm_caches,
                hidden: hidden_cache,
                hidden_mask,
                output: output_cache,
                steps,
            },
        ))
    }

    /// 예측값에 대한 기울기 (batch)로부터 모든 파라미터 기울기를 누적합니다.
    pub fn backward(&mut self, cache: &NetworkCache, d_pred: &Array1<f64>) {
        let d_out = d_pred.clone().insert_axis(Axis(1));
        let d_hidden = self.output.backward(&cache.output, &d_out) * &cache.hidden_mask;
        let d_last = self.hidden.backward(&cache.hidden, &d_hidden);

        let (batch, units) = d_last.dim();
        let mut d_seq = Array3::<f64>::zeros((batch, cache.steps, units));
        d_seq.slice_mut(s![.., cache.steps - 1, ..]).assign(&d_last);

        for (layer, (lstm_cache, mask)) in self.lstm.iter_mut().zip(&cache.lstm).rev() {
            let masked = d_seq * mask;
            d_seq = layer.backward(lstm_cache, &masked);
        }
    }
}
