//! 코어 에러 타입.
//!
//! 설정 로드, 티커 파싱 등 도메인 계층 공통 에러를 정의합니다.

use thiserror::Error;

/// 코어 계층 에러.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 티커
    #[error("잘못된 티커: {0}")]
    InvalidTicker(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 코어 작업을 위한 Result 타입.
pub type ForecastResult<T> = Result<T, ForecastError>;

impl ForecastError {
    /// 호출자 입력이 원인인 에러인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::InvalidTicker(_) | ForecastError::InvalidInput(_)
        )
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for ForecastError {
    fn from(err: config::ConfigError) -> Self {
        ForecastError::Config(err.to_string())
    }
}
