//! 모델 상태 명령.

use super::context::AppContext;
use anyhow::Result;
use forecast_core::Ticker;
use forecast_ml::{ModelsStatusReport, TrainingStatus};

/// 전체 모델 상태를 조회합니다.
pub async fn run(ctx: &AppContext) -> Result<ModelsStatusReport> {
    Ok(ctx.service.models_status().await)
}

/// 한 티커의 학습 상태를 조회합니다.
pub async fn training(ctx: &AppContext, ticker: &str) -> Result<TrainingStatus> {
    let ticker = Ticker::new(ticker)?;
    Ok(ctx.service.training_status(&ticker).await)
}
