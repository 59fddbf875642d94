//! Yahoo Finance 일봉 소스.

use crate::error::{DataError, Result};
use crate::source::BarSource;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate};
use forecast_core::{RawBar, Ticker};
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Yahoo Finance 일봉 소스.
pub struct YahooBarSource {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooBarSource {
    pub fn new() -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::FetchError(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self { connector })
    }

    async fn fetch_range(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>> {
        // Yahoo의 종료 시각은 배타적이므로 하루를 더합니다.
        let start_ts = naive_date_to_offset_datetime(start)?;
        let end_ts = naive_date_to_offset_datetime(end + Duration::days(1))?;

        debug!(ticker = %ticker, start = %start, end = %end, "Yahoo Finance 날짜 범위 호출");

        let response = self
            .connector
            .get_quote_history_interval(ticker.as_str(), start_ts, end_ts, "1d")
            .await
            .map_err(|e| DataError::FetchError(format!("Yahoo Finance API 오류 ({}): {}", ticker, e)))?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::FetchError(format!("Quote 파싱 오류: {}", e)))?;

        let mut bars: Vec<RawBar> = quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some(RawBar {
                    date,
                    open: finite(q.open),
                    high: finite(q.high),
                    low: finite(q.low),
                    close: finite(q.close),
                    volume: finite(q.volume as f64),
                    adj_close: finite(q.adjclose),
                })
            })
            .collect();
        bars.sort_by_key(|b| b.date);

        Ok(bars)
    }
}

#[async_trait]
impl BarSource for YahooBarSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(&self, ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
        match self.fetch_range(ticker, start, end).await {
            Ok(bars) => bars,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Yahoo Finance 조회 실패");
                Vec::new()
            }
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// NaiveDate를 OffsetDateTime(자정, UTC)으로 변환.
fn naive_date_to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let month = time::Month::try_from(date.month() as u8)
        .map_err(|e| DataError::InvalidData(format!("잘못된 월: {}", e)))?;
    let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(|e| DataError::InvalidData(format!("잘못된 날짜 {}: {}", date, e)))?;
    Ok(day.midnight().assume_utc())
}
