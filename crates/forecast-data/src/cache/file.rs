use super::store::{CacheEntry, CacheStats, CacheStore};
use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::Duration;
use forecast_core::{Clock, Ticker};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

const FILE_PREFIX: &str = "cache_";
const FILE_SUFFIX: &str = ".json";

/// 디렉토리에 엔트리당 JSON 파일 하나를 쓰는 캐시.
///
/// 파일 이름은 `cache_{key}.json`이며 temp 파일 + rename으로 교체됩니다.
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}{}", FILE_PREFIX, key, FILE_SUFFIX))
    }

    async fn read_entry(path: &Path) -> Result<CacheEntry> {
        let bytes = fs::read(path).await.map_err(|e| DataError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 캐시 디렉토리의 엔트리 파일 목록.
    async fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DataError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| DataError::io(&self.dir, e))?
        {
            let name = item.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                files.push(item.path());
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        let entry = match Self::read_entry(&path).await {
            Ok(entry) => entry,
            Err(DataError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "캐시 파일 읽기 실패, miss로 처리");
                return None;
            }
        };

        if entry.is_fresh(self.clock.now()) {
            Some(entry)
        } else {
            debug!(key, expires_at = %entry.expires_at, "캐시 만료");
            None
        }
    }

    async fn put(&self, key: &str, mut entry: CacheEntry, ttl: Duration) -> Result<()> {
        entry.expires_at = self.clock.now() + ttl;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DataError::io(&self.dir, e))?;

        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(&entry)?;
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| DataError::io(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| DataError::io(&path, e))?;

        debug!(key, ticker = %entry.request.ticker, rows = entry.payload.len(), "캐시 기록");
        Ok(())
    }

    async fn clear(&self, ticker: Option<&Ticker>) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files().await? {
            if let Some(ticker) = ticker {
                match Self::read_entry(&path).await {
                    Ok(entry) if &entry.request.ticker == ticker => {}
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "손상된 캐시 파일 건너뜀");
                        continue;
                    }
                }
            }
            fs::remove_file(&path)
                .await
                .map_err(|e| DataError::io(&path, e))?;
            removed += 1;
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let now = self.clock.now();
        let mut stats = CacheStats::default();
        for path in self.entry_files().await? {
            stats.entries += 1;
            if let Ok(meta) = fs::metadata(&path).await {
                stats.total_bytes += meta.len();
            }
            if matches!(Self::read_entry(&path).await, Ok(entry) if entry.is_fresh(now)) {
                stats.fresh_entries += 1;
            }
        }
        Ok(stats)
    }
}
