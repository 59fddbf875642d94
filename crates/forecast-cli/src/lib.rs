//! `forecast` CLI 명령어 구현.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 설정과 저장소로 [`ForecastService`](forecast_ml::ForecastService) 구성
//! - 이력 조회 / 예측 / 재학습 / 상태 / 정리 명령
//! - 데이터 캐시 관리 명령

pub mod commands;
