//! ML 모듈 에러 타입.

use forecast_core::ForecastError;
use forecast_data::DataError;
use thiserror::Error;

/// 예측 파이프라인에서 발생할 수 있는 에러.
#[derive(Debug, Error)]
pub enum MlError {
    /// 외부 소스가 데이터를 반환하지 않음
    #[error("No data available: {0}")]
    NoData(String),

    /// 학습/예측에 필요한 이력 부족
    #[error("Insufficient history: need {required} bars, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// 사용할 수 있는 모델이 없고 학습도 실패함
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// 모델 아티팩트 저장/로드 실패
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// 유효하지 않은 입력
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 학습 중 에러
    #[error("Training error: {0}")]
    Training(String),

    /// 모델 추론 중 에러
    #[error("Inference error: {0}")]
    Inference(String),

    /// 데이터 계층 에러
    #[error(transparent)]
    Data(DataError),
}

/// ML 작업을 위한 Result 타입.
pub type MlResult<T> = Result<T, MlError>;

impl MlError {
    /// 호출자 요청이 원인인 에러인지 확인 (외부 경계에서 4xx로 매핑).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MlError::NoData(_) | MlError::InsufficientHistory { .. } | MlError::InvalidInput(_)
        )
    }

    /// 외부에 노출해도 되는 메시지.
    ///
    /// 서버 측 에러는 내부 사정을 숨긴 일반 메시지로 대체합니다.
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            match self {
                MlError::ModelUnavailable(_) => "Model is not available".to_string(),
                _ => "Internal server error".to_string(),
            }
        }
    }
}

impl From<DataError> for MlError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NoData(msg) => MlError::NoData(msg),
            other => MlError::Data(other),
        }
    }
}

impl From<ForecastError> for MlError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::InvalidTicker(msg) | ForecastError::InvalidInput(msg) => {
                MlError::InvalidInput(msg)
            }
            other => MlError::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for MlError {
    fn from(err: serde_json::Error) -> Self {
        MlError::Persistence(err.to_string())
    }
}

impl From<bincode::Error> for MlError {
    fn from(err: bincode::Error) -> Self {
        MlError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MlError::InsufficientHistory {
            required: 90,
            actual: 89,
        };
        assert_eq!(err.to_string(), "Insufficient history: need 90 bars, got 89");
    }

    #[test]
    fn test_client_error_mapping() {
        assert!(MlError::NoData("X".to_string()).is_client_error());
        assert!(MlError::InvalidInput("days".to_string()).is_client_error());
        assert!(!MlError::ModelUnavailable("X".to_string()).is_client_error());
        assert!(!MlError::Persistence("disk".to_string()).is_client_error());
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = MlError::Persistence("/secret/path: permission denied".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = MlError::NoData("ZZZ".to_string());
        assert!(err.public_message().contains("ZZZ"));
    }

    #[test]
    fn test_data_no_data_maps_to_no_data() {
        let err: MlError = DataError::NoData("QQQ".to_string()).into();
        assert!(matches!(err, MlError::NoData(_)));

        let err: MlError = DataError::InvalidData("neg".to_string()).into();
        assert!(matches!(err, MlError::Data(_)));
    }
}
