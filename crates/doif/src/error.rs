//! DoIf 에러 타입
//!
//! [`DoIfError`]는 설정에서 조건 트리를 빌드할 때만 발생합니다.
//! 평가(check) 중에는 에러가 없으며, 필드 누락이나 타입 불일치는 모두 `false`로 처리됩니다.
//! `From<DoIfError> for LogshipError` 변환이 구현되어 있어 상위 레이어에서 `?`로 전파할 수 있습니다.

use logship_core::error::{FilterError, LogshipError};

/// 조건 트리 빌드 에러
#[derive(Debug, thiserror::Error)]
pub enum DoIfError {
    /// 알 수 없는 연산자
    #[error("unknown op '{0}'")]
    UnknownOp(String),

    /// 필수 키 누락
    #[error("op '{op}': missing required key '{key}'")]
    MissingKey {
        /// 연산자 이름
        op: String,
        /// 누락된 키
        key: &'static str,
    },

    /// 빈 필드 경로
    #[error("op '{op}': field path must not be empty")]
    EmptyField {
        /// 연산자 이름
        op: String,
    },

    /// 빈 값 목록
    #[error("op '{op}': values must not be empty")]
    EmptyValues {
        /// 연산자 이름
        op: String,
    },

    /// equal 이외의 연산자에 null 값 지정
    #[error("op '{op}': null values are only allowed for 'equal'")]
    NullValue {
        /// 연산자 이름
        op: String,
    },

    /// 정규식 컴파일 실패
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        /// 원본 패턴
        pattern: String,
        /// 컴파일 에러
        #[source]
        source: regex::Error,
    },

    /// 부분 문자열 오토마톤 빌드 실패
    #[error("failed to build substring matcher: {0}")]
    Matcher(String),

    /// 알 수 없는 비교 연산자
    #[error("unknown cmp_op '{0}', expected one of lt, le, gt, ge, eq, ne")]
    UnknownCmpOp(String),

    /// 길이 임계값이 음수이거나 정수가 아님
    #[error("length value must be a non-negative integer, got {0}")]
    InvalidLength(String),

    /// 피연산자 개수 오류
    #[error("op '{op}' expects {expected} operand(s), got {got}")]
    OperandCount {
        /// 연산자 이름
        op: String,
        /// 기대 개수 설명
        expected: &'static str,
        /// 실제 개수
        got: usize,
    },

    /// 알 수 없는 타입 토큰
    #[error("unknown type '{0}', expected one of obj, arr, num, str, null, nil")]
    UnknownType(String),

    /// 타임스탬프 상수 파싱 실패
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// 원본 값
        value: String,
        /// 실패 사유
        reason: String,
    },

    /// 기간 문자열 파싱 실패
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration {
        /// 원본 값
        value: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 역직렬화 실패
    #[error("config decode failed: {0}")]
    Decode(String),
}

impl From<DoIfError> for LogshipError {
    fn from(err: DoIfError) -> Self {
        LogshipError::Filter(FilterError::DoIf(err.to_string()))
    }
}

/// 구조 비교 불일치
///
/// [`Checker::is_equal_to`](crate::Checker::is_equal_to)가 처음 발견한 차이를 담습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct Mismatch {
    /// 트리 내 위치 (예: `root.operands[1].values`)
    pub path: String,
    /// 차이 설명
    pub reason: String,
}

impl Mismatch {
    pub(crate) fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

/// 두 값이 다르면 [`Mismatch`]를 반환합니다.
pub(crate) fn ensure_eq<T: PartialEq + std::fmt::Debug>(
    path: &str,
    what: &str,
    lhs: &T,
    rhs: &T,
) -> Result<(), Mismatch> {
    if lhs == rhs {
        Ok(())
    } else {
        Err(Mismatch::new(
            &format!("{path}.{what}"),
            format!("{lhs:?} != {rhs:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_count_display() {
        let err = DoIfError::OperandCount {
            op: "not".to_owned(),
            expected: "exactly 1",
            got: 2,
        };
        assert_eq!(err.to_string(), "op 'not' expects exactly 1 operand(s), got 2");
    }

    #[test]
    fn converts_to_logship_error() {
        let err: LogshipError = DoIfError::UnknownOp("xor".to_owned()).into();
        assert!(matches!(err, LogshipError::Filter(FilterError::DoIf(_))));
        assert!(err.to_string().contains("xor"));
    }

    #[test]
    fn ensure_eq_reports_path() {
        let err = ensure_eq("root", "op", &"and", &"or").unwrap_err();
        assert_eq!(err.path, "root.op");
        assert!(err.reason.contains("and"));
    }
}
