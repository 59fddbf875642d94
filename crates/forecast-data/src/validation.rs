//! 수집 데이터 검증.
//!
//! 캐시에 쓰기 전에 호출됩니다. 실패한 페이로드는 절대 캐시되지 않습니다.

use crate::error::{DataError, Result};
use forecast_core::{RawBar, Ticker};
use tracing::warn;

/// 수집한 일봉 테이블을 검증합니다.
///
/// - 비어 있으면 `NoData`
/// - OHLCV 중 값이 하나도 없는 열이 있으면 `InvalidData`
/// - 음수 가격이 있으면 `InvalidData`
/// - 필수 열의 빈 값은 허용하되 경고를 남깁니다
pub fn validate_bars(ticker: &Ticker, bars: &[RawBar]) -> Result<()> {
    if bars.is_empty() {
        return Err(DataError::NoData(format!("{}: 빈 데이터", ticker)));
    }

    let columns: [(&str, fn(&RawBar) -> Option<f64>); 5] = [
        ("open", |b| b.open),
        ("high", |b| b.high),
        ("low", |b| b.low),
        ("close", |b| b.close),
        ("volume", |b| b.volume),
    ];

    for (name, get) in columns {
        let nulls = bars.iter().filter(|b| get(b).is_none()).count();
        if nulls == bars.len() {
            return Err(DataError::InvalidData(format!(
                "{}: 필수 열 '{}' 없음",
                ticker, name
            )));
        }
        if nulls > 0 {
            warn!(ticker = %ticker, column = name, nulls, "필수 열에 빈 값 존재");
        }
    }

    let negative = bars
        .iter()
        .filter(|b| {
            [b.open, b.high, b.low, b.close]
                .iter()
                .flatten()
                .any(|p| *p < 0.0)
        })
        .count();
    if negative > 0 {
        return Err(DataError::InvalidData(format!(
            "{}: 음수 가격 {}건",
            ticker, negative
        )));
    }

    Ok(())
}
