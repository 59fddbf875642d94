//! 서비스 응답 타입.

use crate::features::DataSummary;
use chrono::{DateTime, NaiveDate, Utc};
use forecast_core::{Bar, ForecastPoint, Ticker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 예측에 사용된 모델의 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// 레지스트리에 있던 모델
    Existing,
    /// 이번 요청에서 학습한 모델
    TrainedNow,
}

/// 예측 응답에 포함되는 모델 정보.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastModelInfo {
    pub model_type: String,
    /// 예측에 사용한 정제 일봉 수
    pub training_data_points: usize,
    pub features_used: Vec<String>,
    pub prediction_horizon: usize,
    /// 마지막 학습 시각 (메타데이터가 없으면 None)
    pub last_trained: Option<String>,
    pub source: ModelSource,
}

/// 예측 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub ticker: Ticker,
    pub predictions: Vec<ForecastPoint>,
    pub model_info: ForecastModelInfo,
    /// 전체 구간 confidence_score 평균
    pub confidence_score: f64,
    pub generated_at: DateTime<Utc>,
}

/// 티커별 학습 상태.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrainingState {
    Idle,
    Queued,
    Training,
    Ready,
    Failed { reason: String },
}

impl TrainingState {
    /// 더 이상 진행되지 않는 상태인지.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrainingState::Idle | TrainingState::Ready | TrainingState::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub ticker: Ticker,
    #[serde(flatten)]
    pub state: TrainingState,
    pub updated_at: DateTime<Utc>,
}

/// 재학습 요청 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainAck {
    pub ticker: Ticker,
    pub status: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

/// 모델 하나의 상태.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub trained_at: Option<String>,
    pub train_loss: Option<f64>,
    pub val_loss: Option<f64>,
    pub train_samples: Option<usize>,
    pub val_samples: Option<usize>,
    pub epochs_trained: Option<usize>,
    pub training: TrainingState,
}

/// 전체 모델 상태.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsStatusReport {
    pub models: BTreeMap<String, ModelStatus>,
    pub total_models: usize,
    pub timestamp: DateTime<Utc>,
}

/// 과거 일봉 조회 결과.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub ticker: Ticker,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub history: Vec<Bar>,
    pub summary: Option<DataSummary>,
    pub source: String,
    pub last_updated: DateTime<Utc>,
}
