//! 오래된 모델 정리 명령.

use super::context::AppContext;
use anyhow::{Context, Result};
use forecast_ml::CleanupReport;
use tracing::info;

pub async fn run(ctx: &AppContext, max_age_days: Option<i64>) -> Result<CleanupReport> {
    let report = ctx
        .service
        .cleanup(max_age_days)
        .await
        .context("모델 정리 실패")?;

    info!(
        removed = report.removed.len(),
        remaining = report.remaining,
        "모델 정리 완료"
    );
    Ok(report)
}
