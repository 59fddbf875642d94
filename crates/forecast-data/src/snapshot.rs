//! 티커별 CSV 스냅샷.
//!
//! 검증을 통과한 마지막 수집 결과를 `{dir}/{TICKER}_data.csv`에 덮어씁니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use forecast_core::{RawBar, Ticker};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    adj_close: Option<f64>,
    ticker: String,
    fetched_at: String,
    date_range: String,
}

impl From<SnapshotRow> for RawBar {
    fn from(row: SnapshotRow) -> Self {
        RawBar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            adj_close: row.adj_close,
        }
    }
}

/// CSV 스냅샷 디렉토리.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 티커의 스냅샷 경로.
    pub fn path_for(&self, ticker: &Ticker) -> PathBuf {
        self.dir.join(format!("{}_data.csv", ticker))
    }

    /// 스냅샷을 덮어씁니다.
    pub async fn write(
        &self,
        ticker: &Ticker,
        bars: &[RawBar],
        fetched_at: DateTime<Utc>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PathBuf> {
        let dir = self.dir.clone();
        let path = self.path_for(ticker);
        let ticker = ticker.to_string();
        let bars = bars.to_vec();

        let written = tokio::task::spawn_blocking(move || {
            write_snapshot(&dir, &path, &ticker, &bars, fetched_at, start, end).map(|_| path)
        })
        .await
        .map_err(|e| DataError::CacheError(format!("스냅샷 작업 실패: {}", e)))??;

        debug!(path = %written.display(), "CSV 스냅샷 기록");
        Ok(written)
    }

    /// 스냅샷을 읽습니다.
    pub async fn read(&self, ticker: &Ticker) -> Result<Vec<RawBar>> {
        let path = self.path_for(ticker);
        tokio::task::spawn_blocking(move || read_snapshot(&path))
            .await
            .map_err(|e| DataError::CacheError(format!("스냅샷 작업 실패: {}", e)))?
    }
}

fn write_snapshot(
    dir: &Path,
    path: &Path,
    ticker: &str,
    bars: &[RawBar],
    fetched_at: DateTime<Utc>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| DataError::io(dir, e))?;

    let tmp = path.with_extension("csv.tmp");
    let fetched_at = fetched_at.to_rfc3339();
    let date_range = format!("{} to {}", start, end);

    let mut writer = csv::Writer::from_path(&tmp)?;
    for bar in bars {
        writer.serialize(SnapshotRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            adj_close: bar.adj_close,
            ticker: ticker.to_string(),
            fetched_at: fetched_at.clone(),
            date_range: date_range.clone(),
        })?;
    }
    writer.flush().map_err(|e| DataError::io(&tmp, e))?;
    drop(writer);

    std::fs::rename(&tmp, path).map_err(|e| DataError::io(path, e))
}

fn read_snapshot(path: &Path) -> Result<Vec<RawBar>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<SnapshotRow>()
        .map(|row| Ok(RawBar::from(row?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let ticker = Ticker::new("snap").unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();

        let mut first = vec![RawBar::new(d1, 1.0, 2.0, 0.5, 1.5, 10.0)];
        first[0].volume = None;
        let path = store.write(&ticker, &first, Utc::now(), d1, d1).await.unwrap();
        assert!(path.ends_with("SNAP_data.csv"));

        let back = store.read(&ticker).await.unwrap();
        assert_eq!(back, first);

        let second = vec![
            RawBar::new(d1, 1.0, 2.0, 0.5, 1.5, 10.0),
            RawBar::new(d2, 1.5, 2.5, 1.0, 2.0, 12.0),
        ];
        store.write(&ticker, &second, Utc::now(), d1, d2).await.unwrap();
        assert_eq!(store.read(&ticker).await.unwrap(), second);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().next().unwrap().contains("date_range"));
        assert!(text.contains("2024-04-01 to 2024-04-02"));
    }
}
