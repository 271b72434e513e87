//! Logship 공통 크레이트
//!
//! 모든 워크스페이스 크레이트가 공유하는 에러 타입, 설정 구조체,
//! 메트릭 이름 상수를 정의합니다.
//!
//! - [`config`]: `logship.toml` 파싱, 환경변수 오버라이드, 유효성 검증
//! - [`error`]: 최상위 에러 타입 [`LogshipError`]
//! - [`metrics`]: Prometheus 메트릭 이름과 설명 등록

pub mod config;
pub mod error;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, FilterError, LogshipError, PipelineError};

// 설정
pub use config::{
    ActionConfig, AntispamConfig, ExceptionRuleConfig, GeneralConfig, LogshipConfig,
    MetricsConfig, PipelineConfig,
};
