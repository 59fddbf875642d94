//! 추세 지표 (Trend Indicators).
//!
//! 이동평균 기반의 추세 지표들을 제공합니다.
//! - SMA (Simple Moving Average)
//! - EMA (Exponential Moving Average, 조정 가중 평균)
//! - MACD (Moving Average Convergence Divergence)

use serde::{Deserialize, Serialize};

use super::{check_period, mean, rolling, IndicatorError, IndicatorResult};

/// SMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmaParams {
    /// 이동평균 기간.
    pub period: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

/// EMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmaParams {
    /// span. α = 2 / (span + 1).
    pub span: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self { span: 12 }
    }
}

/// MACD 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdParams {
    /// 단기 EMA span (기본: 12).
    pub fast_span: usize,
    /// 장기 EMA span (기본: 26).
    pub slow_span: usize,
    /// 시그널 라인 span (기본: 9).
    pub signal_span: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_span: 12,
            slow_span: 26,
            signal_span: 9,
        }
    }
}

/// MACD 결과 (시점별).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdResult {
    /// MACD 라인 (단기 EMA - 장기 EMA).
    pub macd: f64,
    /// 시그널 라인 (MACD의 EMA).
    pub signal: f64,
}

/// 추세 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrendIndicators;

impl TrendIndicators {
    pub fn new() -> Self {
        Self
    }

    /// 단순 이동평균 (SMA). 처음 period-1개는 None.
    pub fn sma(&self, values: &[f64], params: SmaParams) -> IndicatorResult<Vec<Option<f64>>> {
        check_period(params.period)?;
        let values: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        Ok(rolling(&values, params.period, mean))
    }

    /// 지수 이동평균 (EMA).
    ///
    /// 조정 가중 평균: EMA_t = Σ (1-α)^i x_{t-i} / Σ (1-α)^i.
    /// 첫 시점부터 값이 존재합니다.
    pub fn ema(&self, values: &[f64], params: EmaParams) -> IndicatorResult<Vec<f64>> {
        check_period(params.span)?;
        let alpha = 2.0 / (params.span as f64 + 1.0);
        let decay = 1.0 - alpha;

        let mut num = 0.0;
        let mut den = 0.0;
        let result: Vec<f64> = values
            .iter()
            .map(|x| {
                num = x + decay * num;
                den = 1.0 + decay * den;
                num / den
            })
            .collect();

        if result.iter().any(|v| !v.is_finite()) {
            return Err(IndicatorError::CalculationError(
                "EMA에 유한하지 않은 값".to_string(),
            ));
        }
        Ok(result)
    }

    /// MACD와 시그널 라인.
    pub fn macd(&self, values: &[f64], params: MacdParams) -> IndicatorResult<Vec<MacdResult>> {
        if params.fast_span >= params.slow_span {
            return Err(IndicatorError::InvalidParameter(
                "단기 span은 장기 span보다 작아야 합니다".to_string(),
            ));
        }
        let fast = self.ema(values, EmaParams { span: params.fast_span })?;
        let slow = self.ema(values, EmaParams { span: params.slow_span })?;
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = self.ema(&macd, EmaParams { span: params.signal_span })?;

        Ok(macd
            .into_iter()
            .zip(signal)
            .map(|(macd, signal)| MacdResult { macd, signal })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let trend = TrendIndicators::new();
        let sma = trend
            .sma(&[1.0, 2.0, 3.0, 4.0, 5.0], SmaParams { period: 3 })
            .unwrap();
        assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_sma_short_series_is_all_none() {
        let trend = TrendIndicators::new();
        let sma = trend.sma(&[1.0, 2.0], SmaParams { period: 5 }).unwrap();
        assert_eq!(sma, vec![None, None]);
    }

    #[test]
    fn test_ema_adjusted_weights() {
        let trend = TrendIndicators::new();
        // span=3 → α=0.5. 두 번째 값: (2 + 0.5*1) / (1 + 0.5) = 1.6667
        let ema = trend.ema(&[1.0, 2.0, 3.0], EmaParams { span: 3 }).unwrap();
        assert!((ema[0] - 1.0).abs() < 1e-12);
        assert!((ema[1] - 5.0 / 3.0).abs() < 1e-12);
        // (3 + 0.5*2 + 0.25*1) / (1 + 0.5 + 0.25) = 4.25 / 1.75
        assert!((ema[2] - 4.25 / 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_macd_constant_series_is_zero() {
        let trend = TrendIndicators::new();
        let macd = trend.macd(&[10.0; 40], MacdParams::default()).unwrap();
        assert_eq!(macd.len(), 40);
        assert!(macd.iter().all(|m| m.macd.abs() < 1e-12 && m.signal.abs() < 1e-12));
    }

    #[test]
    fn test_invalid_params() {
        let trend = TrendIndicators::new();
        assert!(trend.sma(&[1.0], SmaParams { period: 0 }).is_err());
        assert!(trend
            .macd(
                &[1.0],
                MacdParams {
                    fast_span: 26,
                    slow_span: 12,
                    signal_span: 9
                }
            )
            .is_err());
    }
}
