use chrono::NaiveDate;
use forecast_core::Ticker;
use sha2::{Digest, Sha256};

/// `"{TICKER}_{start}_{end}"`의 SHA-256 16진 문자열.
pub fn cache_key(ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> String {
    let raw = format!(
        "{}_{}_{}",
        ticker,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_and_normalized() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let a = cache_key(&Ticker::new("aapl").unwrap(), start, end);
        let b = cache_key(&Ticker::new("AAPL").unwrap(), start, end);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let c = cache_key(&Ticker::new("AAPL").unwrap(), start, end.pred_opt().unwrap());
        assert_ne!(a, c);
    }
}
