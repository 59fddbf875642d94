//! 티커 심볼 정의.
//!
//! 모든 레지스트리/캐시/파일 키는 대문자로 정규화된 티커를 사용합니다.

use crate::error::{ForecastError, ForecastResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 최대 티커 길이.
const MAX_TICKER_LEN: usize = 16;

/// 대문자로 정규화된 종목 티커.
///
/// 파일 이름의 일부로 쓰이므로 영문자, 숫자와 `.`, `-`, `^`, `=` 만 허용합니다
/// (예: `AAPL`, `BRK-B`, `005930.KS`, `^GSPC`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// 문자열을 정규화하고 검증하여 티커를 생성합니다.
    pub fn new(raw: impl AsRef<str>) -> ForecastResult<Self> {
        let normalized = raw.as_ref().trim().to_uppercase();

        if normalized.is_empty() {
            return Err(ForecastError::InvalidTicker("빈 티커".to_string()));
        }
        if normalized.len() > MAX_TICKER_LEN {
            return Err(ForecastError::InvalidTicker(format!(
                "티커가 너무 깁니다: {}",
                normalized
            )));
        }
        if let Some(c) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
        {
            return Err(ForecastError::InvalidTicker(format!(
                "허용되지 않는 문자 '{}': {}",
                c, normalized
            )));
        }

        Ok(Self(normalized))
    }

    /// 정규화된 문자열 반환.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ticker {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ticker {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// 정규화된 티커를 다시 정규화해도 같고, 경로 구분자는 절대 포함되지 않습니다.
        #[test]
        fn test_ticker_normalization_is_stable(raw in "\\PC{0,20}") {
            if let Ok(ticker) = Ticker::new(&raw) {
                prop_assert_eq!(Ticker::new(ticker.as_str()).unwrap(), ticker.clone());
                prop_assert!(!ticker.as_str().contains('/'));
                prop_assert!(!ticker.as_str().contains('\\'));
                prop_assert!(ticker.as_str().len() <= MAX_TICKER_LEN);
            }
        }
    }

    #[test]
    fn test_ticker_uppercases_and_trims() {
        let ticker = Ticker::new("  aapl ").unwrap();
        assert_eq!(ticker.as_str(), "AAPL");
        assert_eq!(ticker.to_string(), "AAPL");
    }

    #[test]
    fn test_ticker_accepts_exchange_suffix() {
        assert_eq!(Ticker::new("005930.ks").unwrap().as_str(), "005930.KS");
        assert_eq!(Ticker::new("brk-b").unwrap().as_str(), "BRK-B");
        assert_eq!(Ticker::new("^gspc").unwrap().as_str(), "^GSPC");
    }

    #[test]
    fn test_ticker_rejects_path_like_input() {
        assert!(Ticker::new("").is_err());
        assert!(Ticker::new("../etc").is_err());
        assert!(Ticker::new("A B").is_err());
        assert!(Ticker::new("ABCDEFGHIJKLMNOPQ").is_err());
    }

    #[test]
    fn test_ticker_serde_normalizes() {
        let ticker: Ticker = serde_json::from_str("\"msft\"").unwrap();
        assert_eq!(ticker.as_str(), "MSFT");
        assert!(serde_json::from_str::<Ticker>("\"a/b\"").is_err());
    }
}
