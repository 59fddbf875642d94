//! CLI 명령어 구현 모듈.

pub mod cache;
pub mod cleanup;
pub mod context;
pub mod history;
pub mod predict;
pub mod retrain;
pub mod status;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// 날짜 문자열(YYYY-MM-DD)을 파싱합니다.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {}. Use YYYY-MM-DD", s))
}

/// 선택적 날짜 인자를 파싱합니다.
pub fn parse_optional_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(parse_date).transpose()
}

/// 결과를 들여쓴 JSON 문자열로 만듭니다.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON 직렬화 실패")
}

/// 결과를 JSON으로 표준 출력에 씁니다.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            parse_date(" 2024-12-31 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
        assert!(parse_date("2024/03/05").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn test_parse_optional_date() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert!(parse_optional_date(Some("2024-01-01")).unwrap().is_some());
        assert!(parse_optional_date(Some("yesterday")).is_err());
    }

    #[test]
    fn test_to_json_is_pretty() {
        let json = to_json(&serde_json::json!({"ticker": "AAPL"})).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("\"ticker\": \"AAPL\""));
    }
}
