//! 변동성 지표 (Volatility Indicators).

use serde::{Deserialize, Serialize};

use super::{check_period, mean, rolling, sample_std, IndicatorResult};

/// 볼린저 밴드 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BollingerParams {
    /// 이동평균 기간 (기본: 20).
    pub period: usize,
    /// 표준편차 배수 (기본: 2.0).
    pub std_dev: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
        }
    }
}

/// 볼린저 밴드 값.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// 변동성 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolatilityIndicators;

impl VolatilityIndicators {
    pub fn new() -> Self {
        Self
    }

    /// 이동 표본 표준편차.
    pub fn rolling_std(
        &self,
        values: &[Option<f64>],
        period: usize,
    ) -> IndicatorResult<Vec<Option<f64>>> {
        check_period(period)?;
        Ok(rolling(values, period, sample_std))
    }

    /// 볼린저 밴드: 중심선 ± std_dev × 표본 표준편차.
    pub fn bollinger(
        &self,
        values: &[f64],
        params: BollingerParams,
    ) -> IndicatorResult<Vec<Option<BollingerBands>>> {
        check_period(params.period)?;
        let values: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let middle = rolling(&values, params.period, mean);
        let std = rolling(&values, params.period, sample_std);

        Ok(middle
            .into_iter()
            .zip(std)
            .map(|(m, s)| {
                let (m, s) = (m?, s?);
                Some(BollingerBands {
                    middle: m,
                    upper: m + params.std_dev * s,
                    lower: m - params.std_dev * s,
                })
            })
            .collect())
    }
}
