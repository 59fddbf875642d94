//! 설정 관리.
//!
//! 기본값 → (선택) TOML 파일 → `FORECAST__` 접두사 환경 변수 순서로 병합합니다.
//! 예: `FORECAST__CACHE__TTL_SECS=600`, `FORECAST__TRAINING__MAX_EPOCHS=20`.
//! 저장 경로는 `MODEL_STORAGE_PATH`, `DATA_STORAGE_PATH`로도 지정할 수 있습니다.

use crate::error::ForecastResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 저장소 경로 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 데이터 캐시 설정
    #[serde(default)]
    pub cache: CacheConfig,
    /// 모델 학습 설정
    #[serde(default)]
    pub training: TrainingConfig,
    /// 예측 설정
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 저장소 경로 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// 모델 아티팩트 디렉토리
    pub model_dir: PathBuf,
    /// 데이터(캐시, CSV 스냅샷) 디렉토리
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    /// 캐시 엔트리 디렉토리.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// 티커별 CSV 스냅샷 디렉토리.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("csv")
    }
}

/// 데이터 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// 캐시 유효 기간 (초)
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// 모델 학습 하이퍼파라미터.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrainingConfig {
    /// 최대 epoch 수
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    /// 미니배치 크기
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Adam 초기 학습률
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// 조기 종료 인내 epoch 수
    #[serde(default = "default_early_stopping_patience")]
    pub early_stopping_patience: usize,
    /// 학습률 감소 인내 epoch 수
    #[serde(default = "default_lr_patience")]
    pub lr_patience: usize,
    /// 학습률 감소 배수
    #[serde(default = "default_lr_factor")]
    pub lr_factor: f64,
    /// 학습률 하한
    #[serde(default = "default_min_learning_rate")]
    pub min_learning_rate: f64,
    /// 학습률 감소 판단용 최소 개선폭
    #[serde(default = "default_lr_min_delta")]
    pub lr_min_delta: f64,
    /// 학습 구간 비율 (나머지는 검증)
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
    /// 난수 시드 (없으면 엔트로피 사용)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_epochs() -> usize {
    100
}
fn default_batch_size() -> usize {
    32
}
fn default_learning_rate() -> f64 {
    1e-3
}
fn default_early_stopping_patience() -> usize {
    10
}
fn default_lr_patience() -> usize {
    5
}
fn default_lr_factor() -> f64 {
    0.2
}
fn default_min_learning_rate() -> f64 {
    1e-4
}
fn default_lr_min_delta() -> f64 {
    1e-4
}
fn default_train_fraction() -> f64 {
    0.8
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_epochs: default_max_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            early_stopping_patience: default_early_stopping_patience(),
            lr_patience: default_lr_patience(),
            lr_factor: default_lr_factor(),
            min_learning_rate: default_min_learning_rate(),
            lr_min_delta: default_lr_min_delta(),
            train_fraction: default_train_fraction(),
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// 최대 epoch 수를 설정합니다.
    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    /// 난수 시드를 설정합니다.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 미니배치 크기를 설정합니다.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// 예측 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastConfig {
    /// 기본 예측 일수
    #[serde(default = "default_horizon")]
    pub default_horizon_days: usize,
    /// 최대 예측 일수
    #[serde(default = "default_max_horizon")]
    pub max_horizon_days: usize,
    /// 조회/학습에 사용하는 과거 일수
    #[serde(default = "default_history_days")]
    pub history_days: i64,
    /// 이 일수보다 오래된 모델은 정리 대상
    #[serde(default = "default_model_max_age")]
    pub model_max_age_days: i64,
}

fn default_horizon() -> usize {
    30
}
fn default_max_horizon() -> usize {
    90
}
fn default_history_days() -> i64 {
    365
}
fn default_model_max_age() -> i64 {
    30
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_horizon_days: default_horizon(),
            max_horizon_days: default_max_horizon(),
            history_days: default_history_days(),
            model_max_age_days: default_model_max_age(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 기본값, 설정 파일(선택), 환경 변수를 병합하여 설정을 로드합니다.
    pub fn load(path: Option<&Path>) -> ForecastResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("storage.model_dir", "models")?
            .set_default("storage.data_dir", "data")?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("FORECAST")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.apply_storage_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `MODEL_STORAGE_PATH`, `DATA_STORAGE_PATH` 값으로 저장 경로를 덮어씁니다.
    pub fn apply_storage_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("MODEL_STORAGE_PATH").filter(|s| !s.is_empty()) {
            self.storage.model_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DATA_STORAGE_PATH").filter(|s| !s.is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.training.max_epochs, 100);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.forecast.default_horizon_days, 30);
        assert_eq!(config.forecast.max_horizon_days, 90);
        assert_eq!(config.storage.cache_dir(), PathBuf::from("data/cache"));
        assert_eq!(config.storage.snapshot_dir(), PathBuf::from("data/csv"));
    }

    #[test]
    fn test_load_from_file_keeps_section_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[storage]\nmodel_dir = \"/tmp/m\"\ndata_dir = \"/tmp/d\"\n\n[training]\nmax_epochs = 7\nseed = 11\n"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.storage.model_dir, PathBuf::from("/tmp/m"));
        assert_eq!(config.training.max_epochs, 7);
        assert_eq!(config.training.seed, Some(11));
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.cache.ttl_secs, 3600);
    }

    #[test]
    fn test_storage_overrides() {
        let mut config = AppConfig::default();
        config.apply_storage_overrides(|key| match key {
            "MODEL_STORAGE_PATH" => Some("/srv/models".to_string()),
            "DATA_STORAGE_PATH" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.storage.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_training_builder() {
        let config = TrainingConfig::default()
            .with_max_epochs(3)
            .with_seed(7)
            .with_batch_size(16);
        assert_eq!(config.max_epochs, 3);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.early_stopping_patience, 10);
    }
}
