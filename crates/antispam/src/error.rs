//! Antispam 에러 타입
//!
//! 가드 빌드 시점에만 발생합니다. `IsSpam` 판단과 유지보수 주기는 실패하지 않습니다.

use logship_core::error::{FilterError, LogshipError};
use logship_doif::DoIfError;

/// Antispam 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AntispamError {
    /// 설정 값 오류
    #[error("invalid antispam config: {field}: {reason}")]
    Config {
        /// 설정 필드
        field: String,
        /// 실패 사유
        reason: String,
    },

    /// 예외 규칙 조건 빌드 실패
    #[error("exception rule '{rule}': {source}")]
    Condition {
        /// 규칙 이름
        rule: String,
        /// 조건 트리 에러
        #[source]
        source: DoIfError,
    },
}

impl From<AntispamError> for LogshipError {
    fn from(err: AntispamError) -> Self {
        LogshipError::Filter(FilterError::Antispam(err.to_string()))
    }
}
