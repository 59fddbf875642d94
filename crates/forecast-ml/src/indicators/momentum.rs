//! 모멘텀 지표 (Momentum Indicators).
//!
//! - RSI (Relative Strength Index, 단순 이동평균 방식)
//! - 가격 변화량 / 변화율

use serde::{Deserialize, Serialize};

use super::{check_period, mean, rolling, IndicatorResult};

/// RSI 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RsiParams {
    /// RSI 기간 (기본: 14).
    pub period: usize,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// 모멘텀 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct MomentumIndicators;

impl MomentumIndicators {
    pub fn new() -> Self {
        Self
    }

    /// 직전 대비 변화량. 첫 시점은 None.
    pub fn price_change(&self, values: &[f64]) -> Vec<Option<f64>> {
        (0..values.len())
            .map(|i| (i > 0).then(|| values[i] - values[i - 1]))
            .collect()
    }

    /// 직전 대비 변화율. 첫 시점과 직전 값이 0인 시점은 None.
    pub fn price_change_pct(&self, values: &[f64]) -> Vec<Option<f64>> {
        (0..values.len())
            .map(|i| {
                if i == 0 || values[i - 1] == 0.0 {
                    None
                } else {
                    Some((values[i] - values[i - 1]) / values[i - 1])
                }
            })
            .collect()
    }

    /// RSI.
    ///
    /// 상승분/하락분의 단순 이동평균으로 계산합니다.
    /// 하락분 평균이 0이면 100, 상승/하락 모두 0이면 None.
    pub fn rsi(&self, values: &[f64], params: RsiParams) -> IndicatorResult<Vec<Option<f64>>> {
        check_period(params.period)?;

        let deltas = self.price_change(values);
        let gains: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| d.max(0.0))).collect();
        let losses: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

        let avg_gain = rolling(&gains, params.period, mean);
        let avg_loss = rolling(&losses, params.period, mean);

        Ok(avg_gain
            .into_iter()
            .zip(avg_loss)
            .map(|pair| match pair {
                (Some(g), Some(l)) if l == 0.0 => (g > 0.0).then_some(100.0),
                (Some(g), Some(l)) => Some(100.0 - 100.0 / (1.0 + g / l)),
                _ => None,
            })
            .collect())
    }
}
