//! 주가 예측 CLI.
//!
//! # 사용법
//!
//! ```bash
//! # 최근 1년 일봉 조회
//! forecast history AAPL
//!
//! # 기간 지정 조회
//! forecast history AAPL --from 2024-01-01 --to 2024-06-30
//!
//! # 30일 예측 (모델이 없으면 먼저 학습)
//! forecast predict AAPL --days 30
//!
//! # 재학습 후 완료까지 대기
//! forecast retrain AAPL
//!
//! # 모델 상태 / 오래된 모델 정리
//! forecast status
//! forecast cleanup --max-age-days 30
//!
//! # 데이터 캐시 관리
//! forecast cache-stats
//! forecast cache-clear --ticker AAPL
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecast_cli::commands::{
    cache, cleanup, context::AppContext, history, predict, print_json, retrain, status,
};
use forecast_core::{init_logging, AppConfig, LogConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "forecast")]
#[command(about = "LSTM 기반 주가 예측 도구", version)]
struct Cli {
    /// 설정 파일 (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 과거 일봉 조회
    History {
        /// 종목 심볼 (예: AAPL)
        ticker: String,

        /// 시작 날짜 (YYYY-MM-DD, 기본: 1년 전)
        #[arg(short, long)]
        from: Option<String>,

        /// 종료 날짜 (YYYY-MM-DD, 기본: 오늘)
        #[arg(short, long)]
        to: Option<String>,
    },

    /// 향후 가격 예측
    Predict {
        /// 종목 심볼
        ticker: String,

        /// 예측 기간 (일, 기본: 설정값)
        #[arg(short, long)]
        days: Option<usize>,
    },

    /// 모델 재학습
    Retrain {
        /// 종목 심볼
        ticker: String,

        /// 등록만 하고 완료를 기다리지 않음
        #[arg(long)]
        no_wait: bool,

        /// 최대 대기 시간 (초)
        #[arg(long, default_value = "1800")]
        timeout_secs: u64,
    },

    /// 모델 상태 조회
    Status {
        /// 특정 종목의 학습 상태만 조회
        #[arg(short, long)]
        ticker: Option<String>,
    },

    /// 오래된 모델 정리
    Cleanup {
        /// 최대 보존 기간 (일, 기본: 설정값)
        #[arg(short, long)]
        max_age_days: Option<i64>,
    },

    /// 데이터 캐시 통계
    CacheStats,

    /// 데이터 캐시 삭제
    CacheClear {
        /// 특정 종목만 삭제 (기본: 전체)
        #[arg(short, long)]
        ticker: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("설정 로드 실패")?;
    if let Err(e) = init_logging(LogConfig::from(&config.logging)) {
        eprintln!("로깅 초기화 실패: {}", e);
    }
    debug!(path = ?cli.config, "설정 로드 완료");

    let ctx = AppContext::from_config(config).await?;

    if let Err(e) = run(&ctx, cli.command).await {
        error!(error = %e, "명령 실패");
        return Err(e);
    }
    Ok(())
}

async fn run(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::History { ticker, from, to } => {
            let args = history::HistoryArgs { ticker, from, to };
            print_json(&history::run(ctx, &args).await?)
        }

        Commands::Predict { ticker, days } => print_json(&predict::run(ctx, &ticker, days).await?),

        Commands::Retrain {
            ticker,
            no_wait,
            timeout_secs,
        } => {
            let outcome = retrain::run(
                ctx,
                &ticker,
                !no_wait,
                Duration::from_secs(timeout_secs),
                true,
            )
            .await?;
            print_json(&outcome)
        }

        Commands::Status { ticker } => match ticker {
            Some(ticker) => print_json(&status::training(ctx, &ticker).await?),
            None => print_json(&status::run(ctx).await?),
        },

        Commands::Cleanup { max_age_days } => print_json(&cleanup::run(ctx, max_age_days).await?),

        Commands::CacheStats => print_json(&cache::stats(ctx).await?),

        Commands::CacheClear { ticker } => {
            print_json(&cache::clear(ctx, ticker.as_deref()).await?)
        }
    }
}
