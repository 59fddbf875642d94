//! LSTM 레이어.
//!
//! 가중치 배치는 Keras와 같습니다: kernel (input, 4H), recurrent (H, 4H),
//! bias (1, 4H). 게이트 순서는 input, forget, cell, output 입니다.

use super::{sigmoid, Param};
use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    input_size: usize,
    units: usize,
    kernel: Param,
    recurrent: Param,
    bias: Param,
}

/// 한 시점의 순전파 중간값.
#[derive(Debug)]
struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    tanh_c: Array2<f64>,
}

/// 역전파용 순전파 기록.
#[derive(Debug)]
pub struct LstmCache {
    steps: Vec<StepCache>,
}

impl LstmLayer {
    pub fn new(input_size: usize, units: usize, rng: &mut StdRng) -> Self {
        let kernel = Param::glorot(input_size, 4 * units, rng);
        let recurrent = Param::glorot(units, 4 * units, rng);
        let mut bias = Param::zeros(1, 4 * units);
        // forget gate bias = 1
        bias.value.slice_mut(s![.., units..2 * units]).fill(1.0);

        Self {
            input_size,
            units,
            kernel,
            recurrent,
            bias,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn params_mut(&mut self) -> [&mut Param; 3] {
        [&mut self.kernel, &mut self.recurrent, &mut self.bias]
    }

    pub fn params(&self) -> [&Param; 3] {
        [&self.kernel, &self.recurrent, &self.bias]
    }

    /// 배치 순전파. 입력 (batch, steps, input) → 모든 시점의 은닉 상태 (batch, steps, units).
    pub fn forward(&self, x: &Array3<f64>) -> (Array3<f64>, LstmCache) {
        let (batch, steps, _) = x.dim();
        let h_units = self.units;

        let mut h = Array2::<f64>::zeros((batch, h_units));
        let mut c = Array2::<f64>::zeros((batch, h_units));
        let mut outputs = Array3::<f64>::zeros((batch, steps, h_units));
        let mut cache = Vec::with_capacity(steps);

        for t in 0..steps {
            let x_t = x.index_axis(Axis(1), t).to_owned();
            let z = x_t.dot(&self.kernel.value) + h.dot(&self.recurrent.value) + &self.bias.value;

            let i = z.slice(s![.., 0..h_units]).mapv(sigmoid);
            let f = z.slice(s![.., h_units..2 * h_units]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * h_units..3 * h_units]).mapv(f64::tanh);
            let o = z.slice(s![.., 3 * h_units..]).mapv(sigmoid);

            let c_new = &f * &c + &i * &g;
            let tanh_c = c_new.mapv(f64::tanh);
            let h_new = &o * &tanh_c;

            outputs.index_axis_mut(Axis(1), t).assign(&h_new);
            cache.push(StepCache {
                x: x_t,
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
            });

            h = h_new;
            c = c_new;
        }

        (outputs, LstmCache { steps: cache })
    }

    /// 추론 전용 순전파.
    pub fn infer(&self, x: &Array3<f64>) -> Array3<f64> {
        self.forward(x).0
    }

    /// BPTT 역전파.
    ///
    /// `d_out`은 각 시점 출력에 대한 기울기 (batch, steps, units).
    /// 파라미터 기울기를 누적하고 입력에 대한 기울기를 반환합니다.
    pub fn backward(&mut self, cache: &LstmCache, d_out: &Array3<f64>) -> Array3<f64> {
        let (batch, steps, _) = d_out.dim();
        let h_units = self.units;

        let mut dx = Array3::<f64>::zeros((batch, steps, self.input_size));
        let mut dh_next = Array2::<f64>::zeros((batch, h_units));
        let mut dc_next = Array2::<f64>::zeros((batch, h_units));
        let kernel_t: ArrayView2<f64> = self.kernel.value.t();
        let recurrent_t: ArrayView2<f64> = self.recurrent.value.t();
        let mut dz = Array2::<f64>::zeros((batch, 4 * h_units));

        let mut d_kernel = Array2::<f64>::zeros(self.kernel.value.raw_dim());
        let mut d_recurrent = Array2::<f64>::zeros(self.recurrent.value.raw_dim());
        let mut d_bias = Array2::<f64>::zeros(self.bias.value.raw_dim());

        for t in (0..steps).rev() {
            let step = &cache.steps[t];
            let dh = &d_out.index_axis(Axis(1), t) + &dh_next;

            let d_o = &dh * &step.tanh_c;
            let dc = &dh * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;
            let d_f = &dc * &step.c_prev;
            dc_next = &dc * &step.f;

            dz.slice_mut(s![.., 0..h_units])
                .assign(&(&d_i * &step.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., h_units..2 * h_units])
                .assign(&(&d_f * &step.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., 2 * h_units..3 * h_units])
                .assign(&(&d_g * &step.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![.., 3 * h_units..])
                .assign(&(&d_o * &step.o.mapv(|v| v * (1.0 - v))));

            d_kernel += &step.x.t().dot(&dz);
            d_recurrent += &step.h_prev.t().dot(&dz);
            d_bias += &dz.sum_axis(Axis(0)).insert_axis(Axis(0));

            dx.index_axis_mut(Axis(1), t).assign(&dz.dot(&kernel_t));
            dh_next = dz.dot(&recurrent_t);
        }

        self.kernel.grad += &d_kernel;
        self.recurrent.grad += &d_recurrent;
        self.bias.grad += &d_bias;

        dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;

    fn loss(layer: &LstmLayer, x: &Array3<f64>) -> f64 {
        layer.infer(x).iter().map(|v| v * v).sum::<f64>() * 0.5
    }

    #[test]
    fn test_forward_shape_and_forget_bias() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = LstmLayer::new(5, 4, &mut rng);
        let bias = &layer.params()[2].value;
        assert_eq!(bias.shape(), &[1, 16]);
        assert_eq!(bias[[0, 4]], 1.0);
        assert_eq!(bias[[0, 0]], 0.0);

        let x = Array3::zeros((2, 7, 5));
        let (out, _) = layer.forward(&x);
        assert_eq!(out.shape(), &[2, 7, 4]);
    }

    #[test]
    fn test_backward_matches_numeric_gradient() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut layer = LstmLayer::new(3, 2, &mut rng);
        let x = Array3::random_using((2, 4, 3), Uniform::new(-1.0, 1.0), &mut rng);

        for p in layer.params_mut() {
            p.zero_grad();
        }
        let (out, cache) = layer.forward(&x);
        // L = 0.5 * sum(h^2) → dL/dh = h
        let dx = layer.backward(&cache, &out);

        let eps = 1e-6;
        for (k, (r, c)) in [(0usize, (0usize, 1usize)), (1, (1, 5)), (2, (0, 3))] {
            let analytic = layer.params()[k].grad[[r, c]];
            let mut plus = layer.clone();
            plus.params_mut()[k].value[[r, c]] += eps;
            let mut minus = layer.clone();
            minus.params_mut()[k].value[[r, c]] -= eps;
            let numeric = (loss(&plus, &x) - loss(&minus, &x)) / (2.0 * eps);
            assert!(
                (analytic - numeric).abs() < 1e-5,
                "param {} [{},{}]: {} vs {}",
                k,
                r,
                c,
                analytic,
                numeric
            );
        }

        let mut x_plus = x.clone();
        x_plus[[1, 2, 0]] += eps;
        let mut x_minus = x.clone();
        x_minus[[1, 2, 0]] -= eps;
        let numeric = (loss(&layer, &x_plus) - loss(&layer, &x_minus)) / (2.0 * eps);
        assert!((dx[[1, 2, 0]] - numeric).abs() < 1e-5);
    }
}
