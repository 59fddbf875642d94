//! 일봉 정제 및 feature 생성 파이프라인.
//!
//! ```text
//! RawBar[] ─▶ 정렬 ─▶ 중복 제거(마지막 유지) ─▶ 가격 forward-fill
//!         ─▶ 거래량 보간(5일 이동 중앙값 → 전체 중앙값) ─▶ 불완전 행 제거
//!         ─▶ 기술 지표 ─▶ 무결성 복구 ─▶ CleanedSeries
//! ```
//!
//! 정제 단계는 에러를 반환하지 않습니다. 지표 계산이 실패하면 경고를 남기고
//! 지표 없이 나머지 단계를 진행합니다.

use crate::error::{MlError, MlResult};
use crate::indicators::{
    mean, median, quantile, rolling, sample_std, BollingerParams, EmaParams, IndicatorResult,
    MacdParams, MomentumIndicators, RsiParams, SmaParams, TrendIndicators, VolatilityIndicators,
};
use chrono::NaiveDate;
use forecast_core::{Bar, FeatureRow, RawBar};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 파이프라인 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// SMA 기간 (단기, 중기, 장기)
    pub sma_periods: [usize; 3],
    /// MACD 파라미터 (EMA 12/26 포함)
    pub macd: MacdParams,
    /// RSI 기간
    pub rsi_period: usize,
    /// 볼린저 밴드
    pub bollinger: BollingerParams,
    /// 거래량 SMA 기간
    pub volume_sma_period: usize,
    /// 변동성(변화율 표준편차) 기간
    pub volatility_period: usize,
    /// 거래량 결측 보간 윈도우
    pub volume_fill_window: usize,
    /// 거래량 이상치 기준 분위수
    pub volume_outlier_quantile: f64,
    /// 거래량 이상치 배수
    pub volume_outlier_multiplier: f64,
    /// 거래량 z-score 윈도우
    pub volume_zscore_window: usize,
    /// 변화율 IQR 상한/하한 배수
    pub iqr_multiplier: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sma_periods: [5, 10, 20],
            macd: MacdParams::default(),
            rsi_period: 14,
            bollinger: BollingerParams::default(),
            volume_sma_period: 10,
            volatility_period: 20,
            volume_fill_window: 5,
            volume_outlier_quantile: 0.99,
            volume_outlier_multiplier: 10.0,
            volume_zscore_window: 30,
            iqr_multiplier: 1.5,
        }
    }
}

/// 행 단위 기술 지표. 워밍업 구간은 `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub sma_5: Option<f64>,
    pub sma_10: Option<f64>,
    pub sma_20: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub price_change: Option<f64>,
    pub price_change_pct: Option<f64>,
    pub volume_sma: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub volatility: Option<f64>,
    /// ln(1 + volume). 모델 준비 단계에서만 채워집니다.
    pub volume_log: Option<f64>,
    /// 30일 이동 z-score. 모델 준비 단계에서만 채워집니다.
    pub volume_normalized: Option<f64>,
}

/// 정제된 일봉 + 지표.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedBar {
    #[serde(flatten)]
    pub bar: Bar,
    pub indicators: Indicators,
}

/// 날짜 오름차순, 중복 없음, 빈 필드 없음이 보장되는 시계열.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanedSeries {
    rows: Vec<CleanedBar>,
}

impl CleanedSeries {
    /// 이미 정제된 일봉으로 시계열을 만듭니다 (지표 없음).
    ///
    /// 호출자가 날짜 오름차순/중복 없음을 보장해야 합니다.
    pub fn from_bars(bars: Vec<Bar>) -> Self {
        Self {
            rows: bars
                .into_iter()
                .map(|bar| CleanedBar {
                    bar,
                    indicators: Indicators::default(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[CleanedBar] {
        &self.rows
    }

    pub fn bars(&self) -> impl Iterator<Item = &Bar> + '_ {
        self.rows.iter().map(|r| &r.bar)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars().map(|b| b.close).collect()
    }

    /// 모델 입력 feature 행 (Open, High, Low, Close, Volume).
    pub fn feature_rows(&self) -> Vec<FeatureRow> {
        self.bars().map(Bar::features).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.bar.date)
    }

    /// 요약 통계. 빈 시계열이면 None.
    pub fn summary(&self) -> Option<DataSummary> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        let closes = self.closes();
        let volumes: Vec<f64> = self.bars().map(|b| b.volume).collect();

        Some(DataSummary {
            total_records: self.len(),
            start_date: first.bar.date,
            end_date: last.bar.date,
            latest_close: last.bar.close,
            close: ColumnStats::from_values(&closes)?,
            volume: ColumnStats::from_values(&volumes)?,
        })
    }

    fn retain<F: FnMut(&CleanedBar) -> bool>(&mut self, f: F) -> usize {
        let before = self.rows.len();
        self.rows.retain(f);
        before - self.rows.len()
    }
}

/// 열 통계.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// 표본 표준편차 (행이 하나면 0)
    pub std: f64,
}

impl ColumnStats {
    fn from_values(values: &[f64]) -> Option<Self> {
        Some(Self {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: mean(values)?,
            std: sample_std(values).unwrap_or(0.0),
        })
    }
}

/// 데이터 요약.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub latest_close: f64,
    pub close: ColumnStats,
    pub volume: ColumnStats,
}

/// 정제 파이프라인.
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    config: FeatureConfig,
    trend: TrendIndicators,
    momentum: MomentumIndicators,
    volatility: VolatilityIndicators,
}

impl FeaturePipeline {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// 원시 일봉을 정제하고 지표를 붙입니다. 빈 입력은 빈 시계열을 반환합니다.
    pub fn process(&self, raw: Vec<RawBar>) -> CleanedSeries {
        if raw.is_empty() {
            return CleanedSeries::default();
        }
        let input_rows = raw.len();

        let rows = sort_and_dedupe(raw);
        let rows = self.fill_gaps(rows);
        let mut series = drop_incomplete(rows);

        if let Err(e) = self.attach_indicators(&mut series) {
            warn!(error = %e, "지표 계산 실패, 지표 없이 진행");
        }

        self.repair_integrity(&mut series);

        debug!(input_rows, output_rows = series.len(), "일봉 정제 완료");
        series
    }

    /// 모델 입력용 정제.
    ///
    /// [`process`](Self::process) 결과에 거래량 로그/정규화 열을 더하고
    /// 변화율 이상치를 IQR 경계로 자릅니다.
    pub fn prepare_for_model(&self, raw: Vec<RawBar>) -> MlResult<CleanedSeries> {
        let mut series = self.process(raw);
        if series.is_empty() {
            return Err(MlError::NoData("정제 후 남은 일봉 없음".to_string()));
        }

        self.attach_volume_features(&mut series);
        self.cap_change_outliers(&mut series);
        Ok(series)
    }

    fn fill_gaps(&self, mut rows: Vec<RawBar>) -> Vec<RawBar> {
        for row in rows.iter_mut() {
            for field in [
                &mut row.open,
                &mut row.high,
                &mut row.low,
                &mut row.close,
                &mut row.volume,
                &mut row.adj_close,
            ] {
                if field.is_some_and(|v| !v.is_finite()) {
                    *field = None;
                }
            }
        }

        forward_fill(&mut rows, |r| &mut r.open);
        forward_fill(&mut rows, |r| &mut r.high);
        forward_fill(&mut rows, |r| &mut r.low);
        forward_fill(&mut rows, |r| &mut r.close);
        forward_fill(&mut rows, |r| &mut r.adj_close);

        let original: Vec<Option<f64>> = rows.iter().map(|r| r.volume).collect();
        let window = self.config.volume_fill_window.max(1);
        let mut filled = 0usize;
        for (i, row) in rows.iter_mut().enumerate() {
            if row.volume.is_none() {
                let start = (i + 1).saturating_sub(window);
                let observed: Vec<f64> = original[start..=i].iter().flatten().copied().collect();
                row.volume = median(&observed);
                filled += usize::from(row.volume.is_some());
            }
        }

        if rows.iter().any(|r| r.volume.is_none()) {
            let observed: Vec<f64> = rows.iter().filter_map(|r| r.volume).collect();
            if let Some(overall) = median(&observed) {
                for row in rows.iter_mut().filter(|r| r.volume.is_none()) {
                    row.volume = Some(overall);
                    filled += 1;
                }
            }
        }

        if filled > 0 {
            info!(filled, "거래량 결측치 보간");
        }
        rows
    }

    fn attach_indicators(&self, series: &mut CleanedSeries) -> IndicatorResult<()> {
        let cfg = &self.config;
        let closes = series.closes();
        let volumes: Vec<f64> = series.bars().map(|b| b.volume).collect();

        let [p_short, p_mid, p_long] = cfg.sma_periods;
        let sma_short = self.trend.sma(&closes, SmaParams { period: p_short })?;
        let sma_mid = self.trend.sma(&closes, SmaParams { period: p_mid })?;
        let sma_long = self.trend.sma(&closes, SmaParams { period: p_long })?;
        let ema_fast = self.trend.ema(&closes, EmaParams { span: cfg.macd.fast_span })?;
        let ema_slow = self.trend.ema(&closes, EmaParams { span: cfg.macd.slow_span })?;
        let macd = self.trend.macd(&closes, cfg.macd)?;
        let rsi = self.momentum.rsi(&closes, RsiParams { period: cfg.rsi_period })?;
        let bands = self.volatility.bollinger(&closes, cfg.bollinger)?;
        let change = self.momentum.price_change(&closes);
        let change_pct = self.momentum.price_change_pct(&closes);
        let volume_sma = self.trend.sma(&volumes, SmaParams { period: cfg.volume_sma_period })?;
        let volatility = self
            .volatility
            .rolling_std(&change_pct, cfg.volatility_period)?;

        for (i, row) in series.rows.iter_mut().enumerate() {
            let ind = &mut row.indicators;
            ind.sma_5 = sma_short[i];
            ind.sma_10 = sma_mid[i];
            ind.sma_20 = sma_long[i];
            ind.ema_12 = Some(ema_fast[i]);
            ind.ema_26 = Some(ema_slow[i]);
            ind.macd = Some(macd[i].macd);
            ind.macd_signal = Some(macd[i].signal);
            ind.rsi = rsi[i];
            ind.bb_middle = bands[i].map(|b| b.middle);
            ind.bb_upper = bands[i].map(|b| b.upper);
            ind.bb_lower = bands[i].map(|b| b.lower);
            ind.price_change = change[i];
            ind.price_change_pct = change_pct[i];
            ind.volume_sma = volume_sma[i];
            ind.volume_ratio = volume_sma[i]
                .filter(|s| *s != 0.0)
                .map(|s| row.bar.volume / s);
            ind.volatility = volatility[i];
        }
        Ok(())
    }

    fn repair_integrity(&self, series: &mut CleanedSeries) {
        let inverted = series.retain(|r| r.bar.high >= r.bar.low);
        if inverted > 0 {
            warn!(rows = inverted, "고가 < 저가 행 제거");
        }

        let non_positive = series.retain(|r| {
            let b = &r.bar;
            b.open > 0.0 && b.high > 0.0 && b.low > 0.0 && b.close > 0.0
        });
        if non_positive > 0 {
            warn!(rows = non_positive, "0 이하 가격 행 제거");
        }

        let volumes: Vec<f64> = series.bars().map(|b| b.volume).collect();
        if let Some(p) = quantile(&volumes, self.config.volume_outlier_quantile) {
            let limit = p * self.config.volume_outlier_multiplier;
            let outliers = series.retain(|r| r.bar.volume <= limit);
            if outliers > 0 {
                warn!(rows = outliers, limit, "거래량 이상치 행 제거");
            }
        }
    }

    fn attach_volume_features(&self, series: &mut CleanedSeries) {
        let volumes: Vec<Option<f64>> = series.bars().map(|b| Some(b.volume)).collect();
        let window = self.config.volume_zscore_window.max(1);
        let means = rolling(&volumes, window, mean);
        let stds = rolling(&volumes, window, sample_std);

        for (i, row) in series.rows.iter_mut().enumerate() {
            let volume = row.bar.volume;
            row.indicators.volume_log = Some(volume.ln_1p());
            row.indicators.volume_normalized = Some(match (means[i], stds[i]) {
                (Some(m), Some(s)) if s > 0.0 => (volume - m) / s,
                _ => 0.0,
            });
        }
    }

    fn cap_change_outliers(&self, series: &mut CleanedSeries) {
        let changes: Vec<f64> = series
            .rows
            .iter()
            .filter_map(|r| r.indicators.price_change_pct)
            .collect();
        let (Some(q1), Some(q3)) = (quantile(&changes, 0.25), quantile(&changes, 0.75)) else {
            return;
        };
        let iqr = q3 - q1;
        let lower = q1 - self.config.iqr_multiplier * iqr;
        let upper = q3 + self.config.iqr_multiplier * iqr;

        let mut capped = 0usize;
        for row in series.rows.iter_mut() {
            if let Some(v) = row.indicators.price_change_pct {
                let clamped = v.clamp(lower, upper);
                if clamped != v {
                    capped += 1;
                    row.indicators.price_change_pct = Some(clamped);
                }
            }
        }
        if capped > 0 {
            debug!(capped, lower, upper, "변화율 이상치 제한");
        }
    }
}

/// 날짜 오름차순 정렬 후 같은 날짜는 마지막 행만 남깁니다.
fn sort_and_dedupe(mut rows: Vec<RawBar>) -> Vec<RawBar> {
    rows.sort_by_key(|r| r.date);

    let before = rows.len();
    let mut unique: Vec<RawBar> = Vec::with_capacity(rows.len());
    for row in rows {
        match unique.last_mut() {
            Some(last) if last.date == row.date => *last = row,
            _ => unique.push(row),
        }
    }

    let duplicates = before - unique.len();
    if duplicates > 0 {
        warn!(duplicates, "중복 날짜 제거 (마지막 행 유지)");
    }
    unique
}

fn forward_fill<F>(rows: &mut [RawBar], field: F)
where
    F: Fn(&mut RawBar) -> &mut Option<f64>,
{
    let mut last = None;
    for row in rows.iter_mut() {
        let slot = field(row);
        match *slot {
            Some(v) => last = Some(v),
            None => *slot = last,
        }
    }
}

fn drop_incomplete(rows: Vec<RawBar>) -> CleanedSeries {
    let before = rows.len();
    let bars: Vec<Bar> = rows.iter().filter_map(RawBar::to_bar).collect();
    let dropped = before - bars.len();
    if dropped > 0 {
        warn!(rows = dropped, "보간 후에도 빈 필드가 있는 행 제거");
    }
    CleanedSeries::from_bars(bars)
}
