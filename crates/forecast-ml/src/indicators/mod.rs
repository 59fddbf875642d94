//! 기술적 지표 (Technical Indicators).
//!
//! 모든 지표는 시간순으로 정렬된 시계열을 받아 같은 길이의 `Vec<Option<f64>>`를
//! 반환합니다. 워밍업 구간과 계산할 수 없는 지점은 `None`입니다.
//! 각 시점의 값은 그 시점까지의 데이터로만 계산됩니다.
//!
//! - [`trend`]: SMA, EMA, MACD
//! - [`momentum`]: RSI, 가격 변화량/변화율
//! - [`volatility`]: 이동 표준편차, 볼린저 밴드

pub mod momentum;
pub mod trend;
pub mod volatility;

pub use momentum::{MomentumIndicators, RsiParams};
pub use trend::{EmaParams, MacdParams, MacdResult, SmaParams, TrendIndicators};
pub use volatility::{BollingerBands, BollingerParams, VolatilityIndicators};

use thiserror::Error;

/// 지표 계산 오류.
#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),

    /// 계산 오류
    #[error("계산 오류: {0}")]
    CalculationError(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

pub(crate) fn check_period(period: usize) -> IndicatorResult<()> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter(
            "기간은 0보다 커야 합니다".to_string(),
        ));
    }
    Ok(())
}

/// 고정 길이 이동 윈도우 계산.
///
/// 윈도우 안에 `None`이 하나라도 있으면 결과도 `None`입니다.
pub(crate) fn rolling<F>(values: &[Option<f64>], period: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut buf = Vec::with_capacity(period);
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            buf.clear();
            for v in &values[i + 1 - period..=i] {
                buf.push((*v)?);
            }
            f(&buf)
        })
        .collect()
}

/// 산술 평균.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// 표본 표준편차 (n-1).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// 선형 보간 분위수. `q`는 0.0 ~ 1.0.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// 중앙값.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_warmup_and_gaps() {
        let values = [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)];
        let sums = rolling(&values, 2, |w| Some(w.iter().sum()));
        assert_eq!(sums, vec![None, Some(3.0), None, None, Some(9.0), Some(11.0)]);
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert!((quantile(&values, 0.99).unwrap() - 3.97).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_sample_std() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - 2.138089935299395).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(check_period(0).is_err());
        assert!(check_period(1).is_ok());
    }
}
