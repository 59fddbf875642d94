//! 데이터 모듈 오류 타입.

use std::path::PathBuf;
use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 외부 소스가 데이터를 반환하지 않음
    #[error("No data: {0}")]
    NoData(String),

    /// 검증에 실패한 데이터
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 캐시 오류
    #[error("Cache error: {0}")]
    CacheError(String),

    /// 파일 입출력 오류
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 외부 소스 호출 오류
    #[error("Fetch error: {0}")]
    FetchError(String),
}

impl DataError {
    /// 경로 정보가 포함된 I/O 오류를 생성합니다.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
