//! 학습 루프.
//!
//! MSE 손실 + Adam, epoch마다 학습 구간 내부에서만 미니배치 순서를 섞습니다.
//! 검증 손실 기준 조기 종료(최고 가중치 복원)와 plateau 학습률 감소를 적용합니다.

use super::{Adam, LstmNetwork, NetworkConfig};
use crate::error::{MlError, MlResult};
use crate::sequence::SequenceDataset;
use forecast_core::TrainingConfig;
use ndarray::{s, Array1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 평가 시 한 번에 처리할 샘플 수.
const EVAL_CHUNK: usize = 256;

/// epoch별 지표.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub learning_rate: f64,
}

/// 학습 결과 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// 최고 가중치 기준 학습 구간 MSE (추론 모드)
    pub train_loss: f64,
    /// 최고 가중치 기준 검증 구간 MSE (추론 모드)
    pub val_loss: f64,
    pub train_samples: usize,
    pub val_samples: usize,
    /// 실제 수행한 epoch 수
    pub epochs_trained: usize,
    /// 검증 손실이 가장 낮았던 epoch (1부터)
    pub best_epoch: usize,
    pub final_learning_rate: f64,
    pub history: Vec<EpochMetrics>,
}

/// 데이터셋 전체에 대한 추론 모드 MSE.
pub fn evaluate(network: &LstmNetwork, dataset: &SequenceDataset) -> MlResult<f64> {
    if dataset.is_empty() {
        return Err(MlError::Training("빈 데이터셋은 평가할 수 없습니다".to_string()));
    }

    let n = dataset.len();
    let mut total = 0.0;
    let mut start = 0;
    while start < n {
        let end = (start + EVAL_CHUNK).min(n);
        let x = dataset.inputs.slice(s![start..end, .., ..]).to_owned();
        let y = dataset.targets.slice(s![start..end]);
        let pred = network.predict(&x)?;
        total += (&pred - &y).mapv(|d| d * d).sum();
        start = end;
    }
    Ok(total / n as f64)
}

/// LSTM 학습기.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// 새 네트워크를 처음부터 학습합니다.
    ///
    /// 검증 구간이 비어 있으면 학습 손실로 조기 종료를 판단합니다.
    pub fn fit(
        &self,
        train: &SequenceDataset,
        validation: &SequenceDataset,
    ) -> MlResult<(LstmNetwork, TrainingReport)> {
        let cfg = &self.config;
        if train.is_empty() {
            return Err(MlError::Training("학습 샘플이 없습니다".to_string()));
        }
        if cfg.batch_size == 0 || cfg.max_epochs == 0 {
            return Err(MlError::InvalidInput(format!(
                "batch_size와 max_epochs는 0보다 커야 합니다 (batch_size={}, max_epochs={})",
                cfg.batch_size, cfg.max_epochs
            )));
        }

        let mut rng = self.rng();
        let mut network = LstmNetwork::new(NetworkConfig::default(), &mut rng)?;
        let target_mean = train.targets.mean().unwrap_or(0.0);
        network.set_output_bias(target_mean);

        let mut optimizer = Adam::new(cfg.learning_rate);
        let mut indices: Vec<usize> = (0..train.len()).collect();

        let mut best_loss = f64::INFINITY;
        let mut best_network = network.clone();
        let mut best_epoch = 0;
        let mut stop_wait = 0;

        let mut plateau_best = f64::INFINITY;
        let mut plateau_wait = 0;

        let mut history = Vec::new();

        for epoch in 1..=cfg.max_epochs {
            indices.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            for chunk in indices.chunks(cfg.batch_size) {
                let (x, y) = train.batch(chunk);
                network.zero_grad();
                let (pred, cache) = network.forward_train(&x, &mut rng)?;
                let diff: Array1<f64> = &pred - &y;
                let n = chunk.len() as f64;
                loss_sum += diff.mapv(|d| d * d).sum();

                let d_pred = diff.mapv(|d| 2.0 * d / n);
                network.backward(&cache, &d_pred);
                optimizer.step(&mut network.params_mut());
            }
            let train_loss = loss_sum / train.len() as f64;

            let monitored = if validation.is_empty() {
                train_loss
            } else {
                evaluate(&network, validation)?
            };

            if !train_loss.is_finite() || !monitored.is_finite() {
                return Err(MlError::Training(format!(
                    "epoch {}에서 손실이 발산했습니다 (train={}, val={})",
                    epoch, train_loss, monitored
                )));
            }

            history.push(EpochMetrics {
                epoch,
                train_loss,
                val_loss: monitored,
                learning_rate: optimizer.learning_rate(),
            });
            debug!(
                epoch,
                train_loss,
                val_loss = monitored,
                learning_rate = optimizer.learning_rate(),
                "epoch 완료"
            );

            if monitored < best_loss {
                best_loss = monitored;
                best_network = network.clone();
                best_epoch = epoch;
                stop_wait = 0;
            } else {
                stop_wait += 1;
            }

            if monitored < plateau_best - cfg.lr_min_delta {
                plateau_best = monitored;
                plateau_wait = 0;
            } else {
                plateau_wait += 1;
                if plateau_wait >= cfg.lr_patience {
                    let current = optimizer.learning_rate();
                    if current > cfg.min_learning_rate {
                        let reduced = (current * cfg.lr_factor).max(cfg.min_learning_rate);
                        optimizer.set_learning_rate(reduced);
                        info!(epoch, from = current, to = reduced, "학습률 감소");
                    }
                    plateau_wait = 0;
                }
            }

            if stop_wait >= cfg.early_stopping_patience {
                info!(epoch, best_epoch, "조기 종료");
                break;
            }
        }

        let epochs_trained = history.len();
        let train_loss = evaluate(&best_network, train)?;
        let val_loss = if validation.is_empty() {
            train_loss
        } else {
            evaluate(&best_network, validation)?
        };

        info!(
            epochs_trained,
            best_epoch,
            train_loss,
            val_loss,
            train_samples = train.len(),
            val_samples = validation.len(),
            "학습 완료"
        );

        Ok((
            best_network,
            TrainingReport {
                train_loss,
                val_loss,
                train_samples: train.len(),
                val_samples: validation.len(),
                epochs_trained,
                best_epoch,
                final_learning_rate: optimizer.learning_rate(),
                history,
            },
        ))
    }
}
