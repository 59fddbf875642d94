//! Adam 옵티마이저.

use super::Param;
use ndarray::{Array2, Zip};

/// Adam (Keras 기본값: β1 0.9, β2 0.999, ε 1e-7).
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    first_moment: Vec<Array2<f64>>,
    second_moment: Vec<Array2<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// 누적된 기울기로 파라미터를 한 번 갱신합니다.
    ///
    /// 파라미터 순서는 호출마다 같아야 합니다.
    pub fn step(&mut self, params: &mut [&mut Param]) {
        if self.first_moment.len() != params.len() {
            self.first_moment = params
                .iter()
                .map(|p| Array2::zeros(p.value.raw_dim()))
                .collect();
            self.second_moment = self.first_moment.clone();
            self.step = 0;
        }

        self.step += 1;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let lr_t = self.learning_rate * (1.0 - beta2.powi(self.step)).sqrt()
            / (1.0 - beta1.powi(self.step));

        for ((param, m), v) in params
            .iter_mut()
            .zip(&mut self.first_moment)
            .zip(&mut self.second_moment)
        {
            let param: &mut Param = param;
            Zip::from(&mut param.value)
                .and(m)
                .and(v)
                .and(&param.grad)
                .for_each(|w, m, v, &g| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    *w -= lr_t * *m / (v.sqrt() + epsilon);
                });
        }
    }
}
