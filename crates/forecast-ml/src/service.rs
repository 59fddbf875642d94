//! 예측 서비스 파사드.
//!
//! 데이터 조회, 정제, 지연 학습, 예측, 재학습 작업, 모델 정리를 하나로 묶습니다.
//! 학습과 예측 계산은 `spawn_blocking`으로 blocking 풀에서 실행합니다.

use crate::engine::{mean_confidence, ForecastEngine};
use crate::error::{MlError, MlResult};
use crate::features::{CleanedSeries, FeaturePipeline};
use crate::model::{LstmRegressor, Trainer, TrainingReport};
use crate::sequence::{MinMaxScaler, SequenceDataset, MIN_TRAINING_BARS, WINDOW_SIZE};
use crate::store::{CleanupReport, ModelMetadata, ModelStore, RegistryEntry};
use crate::types::{
    ForecastModelInfo, ForecastReport, HistoryReport, ModelSource, ModelStatus,
    ModelsStatusReport, RetrainAck, TrainingState, TrainingStatus,
};
use chrono::{Duration, NaiveDate};
use forecast_core::{
    Clock, FeatureRow, ForecastConfig, Ticker, TrainingConfig, FEATURE_NAMES,
};
use forecast_data::{CachedBarProvider, LatestPrice};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn, Instrument};

/// 모델 종류 표기.
pub const MODEL_TYPE: &str = "RNN-LSTM";

/// 시계열 하나로 스케일러를 fit하고 LSTM을 처음부터 학습합니다 (blocking).
pub fn fit_regressor(
    rows: &[FeatureRow],
    config: &TrainingConfig,
) -> MlResult<(LstmRegressor, MinMaxScaler, TrainingReport)> {
    if rows.len() < MIN_TRAINING_BARS {
        return Err(MlError::InsufficientHistory {
            required: MIN_TRAINING_BARS,
            actual: rows.len(),
        });
    }

    let scaler = MinMaxScaler::fit(rows)?;
    let dataset = SequenceDataset::build(&scaler.transform(rows), WINDOW_SIZE)?;
    let (train, validation) = dataset.split(config.train_fraction);
    let (network, report) = Trainer::new(config.clone()).fit(&train, &validation)?;
    Ok((LstmRegressor::new(network), scaler, report))
}

/// 예측 서비스.
pub struct ForecastService {
    provider: Arc<CachedBarProvider>,
    pipeline: FeaturePipeline,
    store: Arc<ModelStore>,
    engine: ForecastEngine,
    training: TrainingConfig,
    config: ForecastConfig,
    clock: Arc<dyn Clock>,
    states: RwLock<HashMap<Ticker, TrainingStatus>>,
}

impl ForecastService {
    pub fn new(
        provider: Arc<CachedBarProvider>,
        store: Arc<ModelStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            pipeline: FeaturePipeline::default(),
            store,
            engine: ForecastEngine::new(clock.clone()),
            training: TrainingConfig::default(),
            config: ForecastConfig::default(),
            clock,
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_training_config(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_forecast_config(mut self, config: ForecastConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_pipeline(mut self, pipeline: FeaturePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<CachedBarProvider> {
        &self.provider
    }

    pub fn forecast_config(&self) -> &ForecastConfig {
        &self.config
    }

    /// 저장된 모델을 불러옵니다.
    pub async fn initialize(&self) -> MlResult<usize> {
        self.store.load_all().await
    }

    async fn set_state(&self, ticker: &Ticker, state: TrainingState) {
        let status = TrainingStatus {
            ticker: ticker.clone(),
            state,
            updated_at: self.clock.now(),
        };
        self.states.write().await.insert(ticker.clone(), status);
    }

    /// 과거 일봉 조회 (기본: 최근 365일 ~ 오늘).
    #[instrument(skip(self))]
    pub async fn get_history(
        &self,
        ticker: &Ticker,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> MlResult<HistoryReport> {
        let today = self.clock.today();
        let to = to.unwrap_or(today);
        let from = from.unwrap_or(today - Duration::days(self.config.history_days));

        if from >= to {
            return Err(MlError::InvalidInput(
                "Start date must be before end date".to_string(),
            ));
        }
        if to > today {
            return Err(MlError::InvalidInput(
                "End date cannot be in the future".to_string(),
            ));
        }

        let raw = self.provider.get_bars(ticker, from, to, true).await?;
        let series = self.pipeline.process(raw);
        if series.is_empty() {
            return Err(MlError::NoData(format!("{}: 정제 후 남은 일봉 없음", ticker)));
        }

        info!(rows = series.len(), "과거 일봉 조회 완료");
        Ok(HistoryReport {
            ticker: ticker.clone(),
            from,
            to,
            summary: series.summary(),
            history: series.bars().cloned().collect(),
            source: "Yahoo Finance".to_string(),
            last_updated: self.clock.now(),
        })
    }

    /// 모델을 처음부터 학습하고 저장합니다. 티커 Lock 안에서 실행됩니다.
    #[instrument(skip(self, series), fields(rows = series.len()))]
    pub async fn train(
        &self,
        ticker: &Ticker,
        series: &CleanedSeries,
    ) -> MlResult<Arc<RegistryEntry>> {
        let _guard = self.store.lock_ticker(ticker).await;
        self.train_locked(ticker, series).await
    }

    async fn train_locked(
        &self,
        ticker: &Ticker,
        series: &CleanedSeries,
    ) -> MlResult<Arc<RegistryEntry>> {
        let result = self.fit_and_save(ticker, series).await;
        match &result {
            Ok(_) => self.set_state(ticker, TrainingState::Ready).await,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "학습 실패");
                self.set_state(
                    ticker,
                    TrainingState::Failed {
                        reason: e.to_string(),
                    },
                )
                .await;
            }
        }
        result
    }

    async fn fit_and_save(
        &self,
        ticker: &Ticker,
        series: &CleanedSeries,
    ) -> MlResult<Arc<RegistryEntry>> {
        if series.len() < MIN_TRAINING_BARS {
            return Err(MlError::InsufficientHistory {
                required: MIN_TRAINING_BARS,
                actual: series.len(),
            });
        }

        self.set_state(ticker, TrainingState::Training).await;
        info!(ticker = %ticker, rows = series.len(), "모델 학습 시작");

        let rows = series.feature_rows();
        let config = self.training.clone();
        let data_points = rows.len();
        let (model, scaler, report) =
            tokio::task::spawn_blocking(move || fit_regressor(&rows, &config))
                .await
                .map_err(|e| MlError::Training(format!("학습 작업 실패: {}", e)))??;

        let metadata = ModelMetadata::from_report(&report, data_points, self.clock.now());
        self.store
            .save(
                ticker,
                RegistryEntry {
                    model,
                    scaler,
                    metadata: Some(metadata),
                },
            )
            .await
    }

    /// 레지스트리에 모델이 없으면 학습합니다.
    ///
    /// 동시 요청은 티커 Lock을 얻은 뒤 다시 확인하므로 한 번만 학습합니다.
    /// 학습 실패는 `ModelUnavailable`로 반환됩니다.
    pub async fn ensure_trained(
        &self,
        ticker: &Ticker,
        series: &CleanedSeries,
    ) -> MlResult<(Arc<RegistryEntry>, ModelSource)> {
        if let Some(entry) = self.store.get(ticker).await {
            return Ok((entry, ModelSource::Existing));
        }

        let _guard = self.store.lock_ticker(ticker).await;
        if let Some(entry) = self.store.get(ticker).await {
            return Ok((entry, ModelSource::Existing));
        }

        info!(ticker = %ticker, "모델 없음, 지연 학습 실행");
        self.train_locked(ticker, series)
            .await
            .map(|entry| (entry, ModelSource::TrainedNow))
            .map_err(|e| MlError::ModelUnavailable(format!("{}: {}", ticker, e)))
    }

    fn check_horizon(&self, horizon: usize) -> MlResult<()> {
        if horizon == 0 || horizon > self.config.max_horizon_days {
            return Err(MlError::InvalidInput(format!(
                "예측 일수는 1 ~ {} 사이여야 합니다: {}",
                self.config.max_horizon_days, horizon
            )));
        }
        Ok(())
    }

    /// 정제된 시계열로 예측합니다.
    #[instrument(skip(self, series), fields(rows = series.len()))]
    pub async fn predict_with_series(
        &self,
        ticker: &Ticker,
        series: &CleanedSeries,
        horizon: usize,
    ) -> MlResult<ForecastReport> {
        self.check_horizon(horizon)?;
        let (entry, source) = self.ensure_trained(ticker, series).await?;

        let rows = series.feature_rows();
        let engine = self.engine.clone();
        let model_entry = entry.clone();
        let predictions = tokio::task::spawn_blocking(move || {
            engine.forecast(&model_entry.model, &model_entry.scaler, &rows, horizon)
        })
        .await
        .map_err(|e| MlError::Inference(format!("예측 작업 실패: {}", e)))??;

        let confidence_score = mean_confidence(&predictions);
        info!(
            ticker = %ticker,
            horizon,
            source = ?source,
            confidence_score,
            "예측 완료"
        );

        Ok(ForecastReport {
            ticker: ticker.clone(),
            model_info: ForecastModelInfo {
                model_type: MODEL_TYPE.to_string(),
                training_data_points: series.len(),
                features_used: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                prediction_horizon: horizon,
                last_trained: entry.metadata.as_ref().map(|m| m.trained_at.clone()),
                source,
            },
            predictions,
            confidence_score,
            generated_at: self.clock.now(),
        })
    }

    /// 최근 이력을 조회해 예측합니다.
    #[instrument(skip(self))]
    pub async fn predict(&self, ticker: &Ticker, horizon: usize) -> MlResult<ForecastReport> {
        self.check_horizon(horizon)?;

        let end = self.clock.today();
        let start = end - Duration::days(self.config.history_days);
        let raw = self.provider.get_bars(ticker, start, end, true).await?;
        if raw.len() < WINDOW_SIZE {
            return Err(MlError::InsufficientHistory {
                required: WINDOW_SIZE,
                actual: raw.len(),
            });
        }

        let series = self.pipeline.prepare_for_model(raw)?;
        self.predict_with_series(ticker, &series, horizon).await
    }

    /// 캐시를 거치지 않고 최신 이력으로 즉시 재학습합니다.
    #[instrument(skip(self))]
    pub async fn retrain_now(&self, ticker: &Ticker) -> MlResult<Arc<RegistryEntry>> {
        let _guard = self.store.lock_ticker(ticker).await;

        let end = self.clock.today();
        let start = end - Duration::days(self.config.history_days);
        let prepared = match self.provider.get_bars(ticker, start, end, false).await {
            Ok(raw) => self.pipeline.prepare_for_model(raw),
            Err(e) => Err(e.into()),
        };

        match prepared {
            Ok(series) => self.train_locked(ticker, &series).await,
            Err(e) => {
                self.set_state(
                    ticker,
                    TrainingState::Failed {
                        reason: e.to_string(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    /// 백그라운드 재학습을 등록하고 바로 반환합니다.
    ///
    /// 진행 상황은 [`training_status`](Self::training_status)로 확인합니다.
    pub async fn retrain(self: &Arc<Self>, ticker: Ticker) -> RetrainAck {
        self.set_state(&ticker, TrainingState::Queued).await;

        let service = Arc::clone(self);
        let task_ticker = ticker.clone();
        let span = forecast_core::ticker_span!("retrain_task", task_ticker);
        tokio::spawn(
            async move {
                match service.retrain_now(&task_ticker).await {
                    Ok(_) => info!("재학습 완료"),
                    Err(e) => error!(error = %e, "재학습 실패"),
                }
            }
            .instrument(span),
        );

        info!(ticker = %ticker, "재학습 등록");
        RetrainAck {
            message: format!("Model retraining initiated for {}", ticker),
            ticker,
            status: "queued".to_string(),
            submitted_at: self.clock.now(),
        }
    }

    /// 티커의 학습 상태. 기록이 없으면 `Idle`.
    pub async fn training_status(&self, ticker: &Ticker) -> TrainingStatus {
        match self.states.read().await.get(ticker) {
            Some(status) => status.clone(),
            None => TrainingStatus {
                ticker: ticker.clone(),
                state: TrainingState::Idle,
                updated_at: self.clock.now(),
            },
        }
    }

    /// 전체 모델 상태. 모델이 없더라도 학습 상태가 있는 티커는 포함합니다.
    pub async fn models_status(&self) -> ModelsStatusReport {
        let mut models = self.store.status().await;
        for (ticker, status) in self.states.read().await.iter() {
            models
                .entry(ticker.to_string())
                .and_modify(|m| m.training = status.state.clone())
                .or_insert_with(|| ModelStatus {
                    model_loaded: false,
                    scaler_loaded: false,
                    trained_at: None,
                    train_loss: None,
                    val_loss: None,
                    train_samples: None,
                    val_samples: None,
                    epochs_trained: None,
                    training: status.state.clone(),
                });
        }

        ModelsStatusReport {
            total_models: models.values().filter(|m| m.model_loaded).count(),
            models,
            timestamp: self.clock.now(),
        }
    }

    /// 오래된 모델 정리. `max_age_days`가 없으면 설정값을 사용합니다.
    pub async fn cleanup(&self, max_age_days: Option<i64>) -> MlResult<CleanupReport> {
        let days = max_age_days.unwrap_or(self.config.model_max_age_days);
        if days < 0 {
            return Err(MlError::InvalidInput(format!(
                "정리 기준 일수는 0 이상이어야 합니다: {}",
                days
            )));
        }
        let report = self.store.cleanup(days).await?;

        let mut states = self.states.write().await;
        for ticker in &report.removed {
            states.remove(ticker);
        }
        Ok(report)
    }

    /// 최신 가격 (캐시 미사용).
    pub async fn latest_price(&self, ticker: &Ticker) -> MlResult<LatestPrice> {
        Ok(self.provider.latest_price(ticker).await?)
    }
}
