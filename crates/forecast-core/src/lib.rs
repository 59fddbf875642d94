//! # Forecast Core
//!
//! 주가 예측 서비스의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 워크스페이스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 일봉(Bar) 및 원시 일봉(RawBar) 구조체
//! - 예측 결과(ForecastPoint) 구조체
//! - 티커 정규화
//! - 주입 가능한 시계(Clock)
//! - 설정 관리
//! - 로깅 인프라

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use clock::*;
pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
