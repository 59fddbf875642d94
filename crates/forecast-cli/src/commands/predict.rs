//! 가격 예측 명령.

use super::context::AppContext;
use anyhow::{Context, Result};
use forecast_core::Ticker;
use forecast_ml::ForecastReport;
use tracing::Instrument;

/// 예측을 실행합니다. `days`가 없으면 설정의 기본 기간을 사용합니다.
pub async fn run(ctx: &AppContext, ticker: &str, days: Option<usize>) -> Result<ForecastReport> {
    let ticker = Ticker::new(ticker)?;
    let horizon = days.unwrap_or(ctx.config.forecast.default_horizon_days);

    let span = forecast_core::ticker_span!("predict", ticker, horizon);
    ctx.service
        .predict(&ticker, horizon)
        .instrument(span)
        .await
        .with_context(|| format!("{} 예측 실패", ticker))
}
