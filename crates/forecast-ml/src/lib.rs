//! # Forecast ML
//!
//! 일봉 정제, LSTM 학습, 재귀 예측, 모델 저장소를 제공합니다.
//!
//! # 아키텍처
//!
//! ```text
//! CachedBarProvider (forecast-data)
//!        │ RawBar[]
//!        ▼
//! ┌──────────────────┐
//! │ FeaturePipeline  │ ← 정렬/중복 제거/보간/지표/무결성 복구
//! └────────┬─────────┘
//!          │ CleanedSeries
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ MinMaxScaler +   │────▶│ Trainer          │ ← 3×LSTM(50) + Dense
//! │ SequenceDataset  │     │ (Adam, 조기 종료) │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │ (모델, 스케일러, 메타데이터)
//!                                   ▼
//!                          ┌──────────────────┐
//!                          │ ModelStore       │ ← 티커별 Lock, Arc 교체
//!                          └────────┬─────────┘
//!                                   ▼
//!                          ┌──────────────────┐
//!                          │ ForecastEngine   │ ← 재귀 다중 일자 예측
//!                          └────────┬─────────┘
//!                                   ▼
//!                            ForecastService
//! ```
//!
//! # 예제
//!
//! ```ignore
//! use forecast_ml::ForecastService;
//!
//! let service = Arc::new(ForecastService::new(provider, store, clock));
//! service.initialize().await?;
//!
//! let report = service.predict(&Ticker::new("AAPL")?, 30).await?;
//! for point in &report.predictions {
//!     println!("{}: {:.2}", point.date, point.predicted_price);
//! }
//! ```

pub mod engine;
pub mod error;
pub mod features;
pub mod indicators;
pub mod model;
pub mod sequence;
pub mod service;
pub mod store;
pub mod types;

// 자주 사용되는 타입 재내보내기
pub use engine::{confidence_score, mean_confidence, ForecastEngine};
pub use error::{MlError, MlResult};
pub use features::{CleanedBar, CleanedSeries, DataSummary, FeatureConfig, FeaturePipeline};
pub use model::{LstmRegressor, MockRegressor, SequenceRegressor, Trainer, TrainingReport};
pub use sequence::{MinMaxScaler, SequenceDataset, MIN_TRAINING_BARS, WINDOW_SIZE};
pub use service::{fit_regressor, ForecastService, MODEL_TYPE};
pub use store::{ArtifactDigests, CleanupReport, ModelMetadata, ModelStore, RegistryEntry};
pub use types::{
    ForecastModelInfo, ForecastReport, HistoryReport, ModelSource, ModelStatus,
    ModelsStatusReport, RetrainAck, TrainingState, TrainingStatus,
};
