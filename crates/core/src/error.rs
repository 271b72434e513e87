//! 에러 타입 -- 도메인별 에러 정의

/// Logship 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogshipError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 필터(DoIf/Antispam) 구성 에러
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 필터 구성 에러
///
/// 조건 트리나 antispam 규칙을 설정에서 빌드하다 실패한 경우입니다.
/// 평가 시점에는 발생하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// DoIf 조건 트리 빌드 실패
    #[error("do_if build failed: {0}")]
    DoIf(String),

    /// Antispam 가드 빌드 실패
    #[error("antispam build failed: {0}")]
    Antispam(String),
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 입력 소스 열기 실패
    #[error("input '{path}' failed: {reason}")]
    Input { path: String, reason: String },

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 워커/리더 태스크 비정상 종료
    #[error("pipeline task failed: {0}")]
    TaskFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: LogshipError = ConfigError::ParseFailed {
            reason: "bad".to_owned(),
        }
        .into();
        assert!(matches!(err, LogshipError::Config(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn filter_error_display() {
        let err: LogshipError = FilterError::DoIf("unknown op 'foo'".to_owned()).into();
        assert_eq!(
            err.to_string(),
            "filter error: do_if build failed: unknown op 'foo'"
        );
    }

    #[test]
    fn input_error_display() {
        let err = PipelineError::Input {
            path: "/var/log/app.log".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/var/log/app.log"));
        assert!(msg.contains("permission denied"));
    }
}
