//! 완전연결 레이어.

use super::Param;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 활성화 함수.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Linear => z.clone(),
        }
    }

    fn derivative(self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(z.raw_dim()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    activation: Activation,
    kernel: Param,
    bias: Param,
}

#[derive(Debug)]
pub struct DenseCache {
    input: Array2<f64>,
    pre_activation: Array2<f64>,
}

impl DenseLayer {
    pub fn new(input_size: usize, units: usize, activation: Activation, rng: &mut StdRng) -> Self {
        Self {
            activation,
            kernel: Param::glorot(input_size, units, rng),
            bias: Param::zeros(1, units),
        }
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn params_mut(&mut self) -> [&mut Param; 2] {
        [&mut self.kernel, &mut self.bias]
    }

    /// 모든 출력 유닛의 bias를 설정합니다.
    pub fn set_bias(&mut self, value: f64) {
        self.bias.value.fill(value);
    }

    pub fn bias(&self) -> &Array2<f64> {
        &self.bias.value
    }

    pub fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, DenseCache) {
        let z = x.dot(&self.kernel.value) + &self.bias.value;
        let a = self.activation.apply(&z);
        (
            a,
            DenseCache {
                input: x.clone(),
                pre_activation: z,
            },
        )
    }

    pub fn infer(&self, x: &Array2<f64>) -> Array2<f64> {
        let z = x.dot(&self.kernel.value) + &self.bias.value;
        self.activation.apply(&z)
    }

    pub fn backward(&mut self, cache: &DenseCache, d_out: &Array2<f64>) -> Array2<f64> {
        let dz = d_out * &self.activation.derivative(&cache.pre_activation);
        self.kernel.grad += &cache.input.t().dot(&dz);
        self.bias.grad += &dz.sum_axis(Axis(0)).insert_axis(Axis(0));
        dz.dot(&self.kernel.value.t())
    }
}
