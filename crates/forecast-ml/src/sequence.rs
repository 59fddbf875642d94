//! 윈도우 구성과 min-max 스케일링.
//!
//! 입력 feature는 (Open, High, Low, Close, Volume) 순서입니다.
//! 스케일러는 학습 시 한 번만 fit하고 예측 시에는 같은 상태를 재사용합니다.

use crate::error::{MlError, MlResult};
use forecast_core::{FeatureRow, CLOSE_INDEX, FEATURE_COUNT};
use ndarray::{s, Array1, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

/// 모델 입력 윈도우 길이 (거래일).
pub const WINDOW_SIZE: usize = 60;

/// 학습에 필요한 최소 일봉 수.
pub const MIN_TRAINING_BARS: usize = WINDOW_SIZE + 30;

/// feature별 min-max 스케일러 상태.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: FeatureRow,
    data_max: FeatureRow,
}

impl MinMaxScaler {
    /// 주어진 행들의 feature별 최소/최대를 기록합니다.
    pub fn fit(rows: &[FeatureRow]) -> MlResult<Self> {
        if rows.is_empty() {
            return Err(MlError::InvalidInput("빈 데이터로 스케일러를 fit할 수 없습니다".to_string()));
        }

        let mut data_min = [f64::INFINITY; FEATURE_COUNT];
        let mut data_max = [f64::NEG_INFINITY; FEATURE_COUNT];
        for row in rows {
            for j in 0..FEATURE_COUNT {
                if !row[j].is_finite() {
                    return Err(MlError::InvalidInput(format!(
                        "유한하지 않은 feature 값: {}",
                        row[j]
                    )));
                }
                data_min[j] = data_min[j].min(row[j]);
                data_max[j] = data_max[j].max(row[j]);
            }
        }

        Ok(Self { data_min, data_max })
    }

    pub fn data_min(&self) -> &FeatureRow {
        &self.data_min
    }

    pub fn data_max(&self) -> &FeatureRow {
        &self.data_max
    }

    /// 범위가 0인 feature는 1로 나눕니다.
    fn range(&self, j: usize) -> f64 {
        let range = self.data_max[j] - self.data_min[j];
        if range > 0.0 {
            range
        } else {
            1.0
        }
    }

    pub fn transform_row(&self, row: &FeatureRow) -> FeatureRow {
        std::array::from_fn(|j| (row[j] - self.data_min[j]) / self.range(j))
    }

    pub fn inverse_transform_row(&self, row: &FeatureRow) -> FeatureRow {
        std::array::from_fn(|j| row[j] * self.range(j) + self.data_min[j])
    }

    pub fn transform(&self, rows: &[FeatureRow]) -> Vec<FeatureRow> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// 스케일된 종가를 실제 가격으로 되돌립니다.
    pub fn inverse_close(&self, scaled: f64) -> f64 {
        scaled * self.range(CLOSE_INDEX) + self.data_min[CLOSE_INDEX]
    }
}

/// 학습용 (윈도우, 다음 종가) 쌍.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    /// (samples, window, features)
    pub inputs: Array3<f64>,
    /// 스케일된 다음 종가 (samples)
    pub targets: Array1<f64>,
}

impl SequenceDataset {
    /// i ∈ [window, len) 에 대해 X_i = rows[i-window..i], y_i = rows[i].close.
    pub fn build(scaled: &[FeatureRow], window: usize) -> MlResult<Self> {
        if window == 0 {
            return Err(MlError::InvalidInput("윈도우 길이는 0보다 커야 합니다".to_string()));
        }
        if scaled.len() <= window {
            return Err(MlError::InsufficientHistory {
                required: window + 1,
                actual: scaled.len(),
            });
        }

        let samples = scaled.len() - window;
        let mut flat = Vec::with_capacity(samples * window * FEATURE_COUNT);
        let mut targets = Vec::with_capacity(samples);
        for i in window..scaled.len() {
            for row in &scaled[i - window..i] {
                flat.extend_from_slice(row);
            }
            targets.push(scaled[i][CLOSE_INDEX]);
        }

        let inputs = Array3::from_shape_vec((samples, window, FEATURE_COUNT), flat)
            .map_err(|e| MlError::Training(format!("입력 텐서 구성 실패: {}", e)))?;

        Ok(Self {
            inputs,
            targets: Array1::from(targets),
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 앞쪽 `train_fraction`을 학습, 나머지를 검증으로 나눕니다. 순서는 유지됩니다.
    pub fn split(&self, train_fraction: f64) -> (SequenceDataset, SequenceDataset) {
        let split = ((self.len() as f64) * train_fraction).floor() as usize;
        let split = split.min(self.len());

        let train = SequenceDataset {
            inputs: self.inputs.slice(s![..split, .., ..]).to_owned(),
            targets: self.targets.slice(s![..split]).to_owned(),
        };
        let validation = SequenceDataset {
            inputs: self.inputs.slice(s![split.., .., ..]).to_owned(),
            targets: self.targets.slice(s![split..]).to_owned(),
        };
        (train, validation)
    }

    /// 주어진 인덱스의 샘플로 미니배치를 만듭니다.
    pub fn batch(&self, indices: &[usize]) -> (Array3<f64>, Array1<f64>) {
        (
            self.inputs.select(Axis(0), indices),
            self.targets.select(Axis(0), indices),
        )
    }
}

/// 예측 시작 윈도우: 최근 `window`개 행을 기존 스케일러로 변환합니다.
pub fn seed_window(
    scaler: &MinMaxScaler,
    rows: &[FeatureRow],
    window: usize,
) -> MlResult<Array2<f64>> {
    if rows.len() < window {
        return Err(MlError::InsufficientHistory {
            required: window,
            actual: rows.len(),
        });
    }

    let mut seed = Array2::zeros((window, FEATURE_COUNT));
    for (i, row) in rows[rows.len() - window..].iter().enumerate() {
        let scaled = scaler.transform_row(row);
        seed.row_mut(i).assign(&ndarray::ArrayView1::from(&scaled[..]));
    }
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<FeatureRow> {
        (0..n)
            .map(|i| {
                let c = 10.0 + i as f64;
                [c - 0.5, c + 1.0, c - 1.0, c, 1_000.0 + i as f64 * 10.0]
            })
            .collect()
    }

    #[test]
    fn test_scaler_maps_to_unit_range() {
        let data = rows(20);
        let scaler = MinMaxScaler::fit(&data).unwrap();
        let scaled = scaler.transform(&data);
        for row in &scaled {
            for v in row {
                assert!((0.0..=1.0).contains(v));
            }
        }
        assert_eq!(scaled[0][CLOSE_INDEX], 0.0);
        assert_eq!(scaled[19][CLOSE_INDEX], 1.0);
    }

    #[test]
    fn test_constant_feature_uses_unit_scale() {
        let data = vec![[1.0, 2.0, 0.5, 1.5, 100.0], [1.1, 2.1, 0.6, 1.6, 100.0]];
        let scaler = MinMaxScaler::fit(&data).unwrap();
        let scaled = scaler.transform_row(&data[1]);
        assert_eq!(scaled[4], 0.0);
        assert_eq!(scaler.inverse_transform_row(&scaled)[4], 100.0);
    }

    #[test]
    fn test_fit_rejects_empty_and_nan() {
        assert!(MinMaxScaler::fit(&[]).is_err());
        assert!(MinMaxScaler::fit(&[[1.0, f64::NAN, 1.0, 1.0, 1.0]]).is_err());
    }

    #[test]
    fn test_inverse_close_matches_row_inverse() {
        let data = rows(30);
        let scaler = MinMaxScaler::fit(&data).unwrap();
        let scaled = scaler.transform_row(&data[7]);
        let back = scaler.inverse_close(scaled[CLOSE_INDEX]);
        assert!((back - data[7][CLOSE_INDEX]).abs() < 1e-9);
    }

    #[test]
    fn test_build_sequences_shapes_and_targets() {
        let data = rows(70);
        let scaler = MinMaxScaler::fit(&data).unwrap();
        let scaled = scaler.transform(&data);
        let dataset = SequenceDataset::build(&scaled, WINDOW_SIZE).unwrap();

        assert_eq!(dataset.len(), 10);
        assert_eq!(dataset.inputs.shape(), &[10, WINDOW_SIZE, FEATURE_COUNT]);
        // 첫 샘플의 타깃은 60번째 행의 종가
        assert_eq!(dataset.targets[0], scaled[60][CLOSE_INDEX]);
        // 첫 샘플의 마지막 입력 행은 59번째 행
        assert_eq!(dataset.inputs[[0, WINDOW_SIZE - 1, CLOSE_INDEX]], scaled[59][CLOSE_INDEX]);
    }

    #[test]
    fn test_build_requires_more_than_window() {
        let data = rows(60);
        assert!(matches!(
            SequenceDataset::build(&data, WINDOW_SIZE),
            Err(MlError::InsufficientHistory { required: 61, actual: 60 })
        ));
    }

    #[test]
    fn test_split_is_contiguous() {
        let data = rows(90);
        let dataset = SequenceDataset::build(&data, WINDOW_SIZE).unwrap();
        let (train, val) = dataset.split(0.8);
        assert_eq!(train.len(), 24);
        assert_eq!(val.len(), 6);
        assert_eq!(train.targets[23], dataset.targets[23]);
        assert_eq!(val.targets[0], dataset.targets[24]);
    }

    #[test]
    fn test_seed_window_uses_latest_rows() {
        let data = rows(75);
        let scaler = MinMaxScaler::fit(&data[..70]).unwrap();
        let seed = seed_window(&scaler, &data, WINDOW_SIZE).unwrap();
        assert_eq!(seed.shape(), &[WINDOW_SIZE, FEATURE_COUNT]);
        let expected = scaler.transform_row(&data[74]);
        assert_eq!(seed[[WINDOW_SIZE - 1, CLOSE_INDEX]], expected[CLOSE_INDEX]);

        assert!(matches!(
            seed_window(&scaler, &data[..59], WINDOW_SIZE),
            Err(MlError::InsufficientHistory { required: 60, actual: 59 })
        ));
    }
}
