//! 티커별 모델 저장소.
//!
//! 티커마다 세 개의 아티팩트를 모델 디렉토리에 둡니다:
//!
//! | 파일 | 내용 |
//! |------|------|
//! | `{TICKER}_model.bin` | LSTM 가중치 (bincode) |
//! | `{TICKER}_scaler.json` | min-max 스케일러 상태 |
//! | `{TICKER}_info.json` | 학습 메타데이터 |
//!
//! 메모리 레지스트리는 `Arc<RegistryEntry>` 단위로 교체되므로 읽는 쪽은
//! 항상 이전 세트 전체 또는 새 세트 전체를 봅니다.

use crate::error::{MlError, MlResult};
use crate::model::{LstmRegressor, TrainingReport};
use crate::sequence::{MinMaxScaler, WINDOW_SIZE};
use crate::types::{ModelStatus, TrainingState};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use forecast_core::{Clock, Ticker, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};

const MODEL_SUFFIX: &str = "_model.bin";
const SCALER_SUFFIX: &str = "_scaler.json";
const INFO_SUFFIX: &str = "_info.json";

/// 티커별 쓰기 Lock 맵.
type TickerLockMap = Arc<RwLock<HashMap<Ticker, Arc<Mutex<()>>>>>;

/// 학습 메타데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// 학습 완료 시각 (RFC 3339)
    pub trained_at: String,
    pub train_loss: f64,
    pub val_loss: f64,
    pub train_samples: usize,
    pub val_samples: usize,
    pub epochs_trained: usize,
    /// 학습에 사용한 정제 일봉 수
    pub data_points_used: usize,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    /// 함께 저장된 모델/스케일러 파일의 SHA-256. 저장 시 채워집니다.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactDigests>,
}

/// 한 세트로 저장된 아티팩트의 지문.
///
/// 메타데이터 파일은 마지막에 교체되므로, 지문이 맞지 않으면 세트 교체가
/// 중간에 끊긴 것입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigests {
    pub model_sha256: String,
    pub scaler_sha256: String,
}

impl ArtifactDigests {
    fn of(model: &[u8], scaler: &[u8]) -> Self {
        Self {
            model_sha256: sha256_hex(model),
            scaler_sha256: sha256_hex(scaler),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn default_window_size() -> usize {
    WINDOW_SIZE
}

fn default_features() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

impl ModelMetadata {
    pub fn from_report(
        report: &TrainingReport,
        data_points_used: usize,
        trained_at: DateTime<Utc>,
    ) -> Self {
        Self {
            trained_at: trained_at.to_rfc3339(),
            train_loss: report.train_loss,
            val_loss: report.val_loss,
            train_samples: report.train_samples,
            val_samples: report.val_samples,
            epochs_trained: report.epochs_trained,
            data_points_used,
            window_size: WINDOW_SIZE,
            features: default_features(),
            artifacts: None,
        }
    }

    /// 학습 시각 파싱. 시간대가 없는 ISO 형식은 UTC로 간주합니다.
    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(at) = DateTime::parse_from_rfc3339(&self.trained_at) {
            return Some(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.trained_at, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// 레지스트리 항목: 모델, 스케일러, 메타데이터 세트.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub model: LstmRegressor,
    pub scaler: MinMaxScaler,
    /// 메타데이터 파일이 없거나 손상되면 None
    pub metadata: Option<ModelMetadata>,
}

/// 오래된 모델 정리 결과.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub removed: Vec<Ticker>,
    /// 학습 시각을 알 수 없어 남겨둔 티커
    pub skipped: Vec<Ticker>,
    /// 파일 삭제에 실패해 남아 있는 티커
    #[serde(default)]
    pub failed: Vec<Ticker>,
    pub remaining: usize,
}

/// 모델 저장소.
pub struct ModelStore {
    dir: PathBuf,
    entries: RwLock<HashMap<Ticker, Arc<RegistryEntry>>>,
    locks: TickerLockMap,
    clock: Arc<dyn Clock>,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            entries: RwLock::new(HashMap::new()),
            locks: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact_path(&self, ticker: &Ticker, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", ticker, suffix))
    }

    /// 티커 쓰기 Lock 획득 또는 생성.
    async fn get_or_create_lock(&self, ticker: &Ticker) -> Arc<Mutex<()>> {
        let locks = self.locks.read().await;
        if let Some(lock) = locks.get(ticker) {
            return lock.clone();
        }
        drop(locks);

        let mut locks = self.locks.write().await;
        locks
            .entry(ticker.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 티커 단위 쓰기 구간을 엽니다. {학습, 저장}과 정리는 이 Lock 안에서 실행됩니다.
    pub async fn lock_ticker(&self, ticker: &Ticker) -> OwnedMutexGuard<()> {
        self.get_or_create_lock(ticker).await.lock_owned().await
    }

    pub async fn get(&self, ticker: &Ticker) -> Option<Arc<RegistryEntry>> {
        self.entries.read().await.get(ticker).cloned()
    }

    pub async fn contains(&self, ticker: &Ticker) -> bool {
        self.entries.read().await.contains_key(ticker)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn tickers(&self) -> Vec<Ticker> {
        let mut tickers: Vec<Ticker> = self.entries.read().await.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    /// 모델 디렉토리의 모든 세트를 불러옵니다.
    ///
    /// 티커 하나의 실패는 경고만 남기고 건너뜁니다. 불러온 개수를 반환합니다.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn load_all(&self) -> MlResult<usize> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MlError::Persistence(format!("{}: {}", self.dir.display(), e)))?;

        let mut dir = fs::read_dir(&self.dir)
            .await
            .map_err(|e| MlError::Persistence(format!("{}: {}", self.dir.display(), e)))?;

        let mut loaded = 0;
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| MlError::Persistence(format!("{}: {}", self.dir.display(), e)))?
        {
            let name = item.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(MODEL_SUFFIX) else {
                continue;
            };

            let ticker = match Ticker::new(stem) {
                Ok(ticker) => ticker,
                Err(e) => {
                    warn!(file = %name, error = %e, "티커를 알 수 없는 모델 파일 무시");
                    continue;
                }
            };

            match self.read_entry(&ticker).await {
                Ok(entry) => {
                    let has_metadata = entry.metadata.is_some();
                    self.entries
                        .write()
                        .await
                        .insert(ticker.clone(), Arc::new(entry));
                    loaded += 1;
                    debug!(ticker = %ticker, has_metadata, "모델 로드");
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "모델 로드 실패, 건너뜀");
                }
            }
        }

        info!(loaded, "저장된 모델 로드 완료");
        Ok(loaded)
    }

    async fn read_entry(&self, ticker: &Ticker) -> MlResult<RegistryEntry> {
        let model_path = self.artifact_path(ticker, MODEL_SUFFIX);
        let model_bytes = read_file(&model_path).await?;
        let model = LstmRegressor::from_bytes(&model_bytes)?;

        let scaler_path = self.artifact_path(ticker, SCALER_SUFFIX);
        let scaler_bytes = read_file(&scaler_path).await?;
        let scaler: MinMaxScaler = serde_json::from_slice(&scaler_bytes)?;

        let info_path = self.artifact_path(ticker, INFO_SUFFIX);
        let metadata = match fs::read(&info_path).await {
            Ok(bytes) => match serde_json::from_slice::<ModelMetadata>(&bytes) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "메타데이터 손상, 없이 로드");
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "메타데이터 읽기 실패, 없이 로드");
                None
            }
        };

        if let Some(expected) = metadata.as_ref().and_then(|m| m.artifacts.as_ref()) {
            if *expected != ArtifactDigests::of(&model_bytes, &scaler_bytes) {
                return Err(MlError::Persistence(format!(
                    "{}: 모델/스케일러가 메타데이터와 다른 세트입니다",
                    ticker
                )));
            }
        }

        Ok(RegistryEntry {
            model,
            scaler,
            metadata,
        })
    }

    /// 세 아티팩트를 기록한 뒤 메모리 항목을 교체합니다.
    ///
    /// 세 파일을 모두 temp 파일로 쓴 다음 모델, 스케일러, 메타데이터 순서로
    /// rename합니다. 메타데이터에는 두 파일의 지문이 들어가므로, 중간에 끊긴
    /// 세트는 다음 [`load_all`](Self::load_all)에서 거부됩니다.
    ///
    /// 호출자는 [`lock_ticker`](Self::lock_ticker)로 얻은 guard를 쥐고 있어야 합니다.
    #[instrument(skip(self, entry))]
    pub async fn save(
        &self,
        ticker: &Ticker,
        mut entry: RegistryEntry,
    ) -> MlResult<Arc<RegistryEntry>> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MlError::Persistence(format!("{}: {}", self.dir.display(), e)))?;

        let model_bytes = entry.model.to_bytes()?;
        let scaler_bytes = serde_json::to_vec_pretty(&entry.scaler)?;
        if let Some(metadata) = entry.metadata.as_mut() {
            metadata.artifacts = Some(ArtifactDigests::of(&model_bytes, &scaler_bytes));
        }

        let mut staged = vec![
            (self.artifact_path(ticker, MODEL_SUFFIX), model_bytes),
            (self.artifact_path(ticker, SCALER_SUFFIX), scaler_bytes),
        ];
        if let Some(metadata) = &entry.metadata {
            staged.push((
                self.artifact_path(ticker, INFO_SUFFIX),
                serde_json::to_vec_pretty(metadata)?,
            ));
        }

        let mut renames = Vec::with_capacity(staged.len());
        for (path, bytes) in &staged {
            let tmp = tmp_path(path);
            if let Err(e) = fs::write(&tmp, bytes).await {
                for (written, _) in &renames {
                    let _ = fs::remove_file(written).await;
                }
                return Err(MlError::Persistence(format!("{}: {}", tmp.display(), e)));
            }
            renames.push((tmp, path.clone()));
        }
        for (tmp, path) in &renames {
            fs::rename(tmp, path)
                .await
                .map_err(|e| MlError::Persistence(format!("{}: {}", path.display(), e)))?;
        }
        if entry.metadata.is_none() {
            // 이전 세트의 메타데이터가 남아 있으면 새 세트와 맞지 않음
            let info = self.artifact_path(ticker, INFO_SUFFIX);
            match fs::remove_file(&info).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(MlError::Persistence(format!("{}: {}", info.display(), e))),
            }
        }

        let entry = Arc::new(entry);
        self.entries
            .write()
            .await
            .insert(ticker.clone(), entry.clone());
        info!("모델 저장 완료");
        Ok(entry)
    }

    /// 디스크와 메모리에서 티커의 모델을 제거합니다. 호출자가 티커 Lock을 쥐고 있어야 합니다.
    ///
    /// 파일 삭제에 실패하면 메모리 항목은 남겨 둡니다.
    pub async fn remove(&self, ticker: &Ticker) -> MlResult<bool> {
        for suffix in [INFO_SUFFIX, SCALER_SUFFIX, MODEL_SUFFIX] {
            let path = self.artifact_path(ticker, suffix);
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(MlError::Persistence(format!("{}: {}", path.display(), e)));
                }
            }
        }
        Ok(self.entries.write().await.remove(ticker).is_some())
    }

    /// `max_age_days`보다 오래 전에 학습된 모델을 제거합니다.
    ///
    /// 학습 시각을 알 수 없는 항목은 남겨두고 경고합니다. 한 티커의 삭제 실패는
    /// `failed`에 기록하고 나머지 정리를 계속합니다. 기준 시각을 표현할 수 없을
    /// 만큼 큰 `max_age_days`는 아무것도 오래되지 않은 것으로 봅니다.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, max_age_days: i64) -> MlResult<CleanupReport> {
        let cutoff = Duration::try_days(max_age_days)
            .and_then(|age| self.clock.now().checked_sub_signed(age));
        let snapshot: Vec<(Ticker, Arc<RegistryEntry>)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(t, e)| (t.clone(), e.clone()))
            .collect();

        let mut report = CleanupReport::default();
        for (ticker, entry) in snapshot {
            let trained_at = entry.metadata.as_ref().and_then(ModelMetadata::trained_at);
            let Some(trained_at) = trained_at else {
                warn!(
                    ticker = %ticker,
                    raw = entry.metadata.as_ref().map(|m| m.trained_at.as_str()),
                    "학습 시각을 알 수 없어 정리 대상에서 제외"
                );
                report.skipped.push(ticker);
                continue;
            };
            let Some(cutoff) = cutoff else {
                continue;
            };
            if trained_at >= cutoff {
                continue;
            }

            let _guard = self.lock_ticker(&ticker).await;
            // Lock 대기 중 재학습되었을 수 있음
            let still_stale = self
                .get(&ticker)
                .await
                .and_then(|e| e.metadata.as_ref().and_then(ModelMetadata::trained_at))
                .is_some_and(|at| at < cutoff);
            if !still_stale {
                continue;
            }

            match self.remove(&ticker).await {
                Ok(_) => {
                    info!(ticker = %ticker, trained_at = %trained_at, "오래된 모델 제거");
                    report.removed.push(ticker);
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "오래된 모델 삭제 실패");
                    report.failed.push(ticker);
                }
            }
        }

        report.removed.sort();
        report.skipped.sort();
        report.failed.sort();
        report.remaining = self.len().await;
        info!(removed = report.removed.len(), remaining = report.remaining, "모델 정리 완료");
        Ok(report)
    }

    /// 티커별 저장 상태. 학습 상태는 `Idle`로 채워집니다.
    pub async fn status(&self) -> BTreeMap<String, ModelStatus> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(ticker, entry)| {
                let meta = entry.metadata.as_ref();
                (
                    ticker.to_string(),
                    ModelStatus {
                        model_loaded: true,
                        scaler_loaded: true,
                        trained_at: meta.map(|m| m.trained_at.clone()),
                        train_loss: meta.map(|m| m.train_loss),
                        val_loss: meta.map(|m| m.val_loss),
                        train_samples: meta.map(|m| m.train_samples),
                        val_samples: meta.map(|m| m.val_samples),
                        epochs_trained: meta.map(|m| m.epochs_trained),
                        training: TrainingState::Idle,
                    },
                )
            })
            .collect()
    }
}

async fn read_file(path: &Path) -> MlResult<Vec<u8>> {
    fs::read(path)
        .await
        .map_err(|e| MlError::Persistence(format!("{}: {}", path.display(), e)))
}

/// 같은 디렉토리의 `{name}.tmp` 경로.
fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
