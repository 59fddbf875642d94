//! 모델 재학습 명령.
//!
//! 재학습은 서비스의 백그라운드 작업으로 등록되고, 이 명령은 학습 상태를
//! 주기적으로 조회하면서 완료(`Ready`) 또는 실패(`Failed`)까지 기다립니다.

use super::context::AppContext;
use anyhow::{bail, Result};
use forecast_core::Ticker;
use forecast_ml::{RetrainAck, TrainingState, TrainingStatus};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// 상태 조회 간격.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 재학습 결과.
#[derive(Debug, Clone, Serialize)]
pub struct RetrainOutcome {
    pub ack: RetrainAck,
    /// 대기하지 않았으면 `None`
    pub status: Option<TrainingStatus>,
}

/// 재학습을 등록하고, `wait`이면 끝날 때까지 기다립니다.
pub async fn run(
    ctx: &AppContext,
    ticker: &str,
    wait: bool,
    timeout: Duration,
    show_progress: bool,
) -> Result<RetrainOutcome> {
    let ticker = Ticker::new(ticker)?;
    let ack = ctx.service.retrain(ticker.clone()).await;
    info!(ticker = %ticker, "재학습 요청 전송");

    if !wait {
        return Ok(RetrainOutcome { ack, status: None });
    }

    let status = wait_for_completion(ctx, &ticker, timeout, show_progress).await?;
    if let TrainingState::Failed { reason } = &status.state {
        warn!(ticker = %ticker, reason = %reason, "재학습 실패");
    }
    Ok(RetrainOutcome {
        ack,
        status: Some(status),
    })
}

async fn wait_for_completion(
    ctx: &AppContext,
    ticker: &Ticker,
    timeout: Duration,
    show_progress: bool,
) -> Result<TrainingStatus> {
    let pb = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    } else {
        ProgressBar::hidden()
    };

    let started = tokio::time::Instant::now();
    loop {
        let status = ctx.service.training_status(ticker).await;
        pb.set_message(format!("{} 학습 상태: {}", ticker, state_label(&status.state)));

        if status.state.is_terminal() {
            pb.finish_with_message(format!("{} {}", ticker, state_label(&status.state)));
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            pb.abandon_with_message(format!("{} 대기 시간 초과", ticker));
            bail!(
                "Retraining {} did not finish within {}s",
                ticker,
                timeout.as_secs()
            );
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn state_label(state: &TrainingState) -> &'static str {
    match state {
        TrainingState::Idle => "idle",
        TrainingState::Queued => "queued",
        TrainingState::Training => "training",
        TrainingState::Ready => "ready",
        TrainingState::Failed { .. } => "failed",
    }
}
