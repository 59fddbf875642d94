//! 과거 일봉 조회 명령.

use super::context::AppContext;
use super::parse_optional_date;
use anyhow::{Context, Result};
use forecast_core::Ticker;
use forecast_ml::HistoryReport;

/// `history` 명령 인자.
#[derive(Debug, Clone)]
pub struct HistoryArgs {
    pub ticker: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// 이력을 조회합니다. 날짜가 없으면 최근 1년입니다.
pub async fn run(ctx: &AppContext, args: &HistoryArgs) -> Result<HistoryReport> {
    let ticker = Ticker::new(&args.ticker)?;
    let from = parse_optional_date(args.from.as_deref())?;
    let to = parse_optional_date(args.to.as_deref())?;

    ctx.service
        .get_history(&ticker, from, to)
        .await
        .with_context(|| format!("{} 이력 조회 실패", ticker))
}
