//! 설정 관리 -- logship.toml 파싱 및 런타임 설정
//!
//! [`LogshipConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSHIP_PIPELINE_WORKERS=8` 형식)
//! 3. 설정 파일 (`logship.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! 조건 트리(`do_if`, antispam `condition`)는 이 크레이트에서 해석하지 않고
//! [`serde_json::Value`] 그대로 보관합니다. 실제 빌드는 `logship-doif`가 담당합니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logship_core::error::LogshipError> {
//! use logship_core::config::LogshipConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogshipConfig::load("logship.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogshipConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogshipError};

/// 무제한 임계값 (antispam)
pub const THRESHOLD_UNLIMITED: i64 = -1;

const MAX_WORKERS: usize = 1024;

/// Logship 통합 설정
///
/// `logship.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogshipConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// antispam 설정
    #[serde(default)]
    pub antispam: AntispamConfig,
}

impl LogshipConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogshipError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogshipError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogshipError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogshipError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogshipError> {
        toml::from_str(toml_str).map_err(|e| {
            LogshipError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSHIP_{SECTION}_{FIELD}`
    /// 예: `LOGSHIP_ANTISPAM_THRESHOLD=500`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSHIP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSHIP_GENERAL_LOG_FORMAT");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGSHIP_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGSHIP_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGSHIP_METRICS_PORT");

        // Pipeline
        override_csv(&mut self.pipeline.inputs, "LOGSHIP_PIPELINE_INPUTS");
        override_usize(&mut self.pipeline.workers, "LOGSHIP_PIPELINE_WORKERS");
        override_string(&mut self.pipeline.time_field, "LOGSHIP_PIPELINE_TIME_FIELD");
        override_usize(
            &mut self.pipeline.channel_capacity,
            "LOGSHIP_PIPELINE_CHANNEL_CAPACITY",
        );

        // Antispam
        override_i64(&mut self.antispam.threshold, "LOGSHIP_ANTISPAM_THRESHOLD");
        override_u32(
            &mut self.antispam.unban_iterations,
            "LOGSHIP_ANTISPAM_UNBAN_ITERATIONS",
        );
        override_u64(
            &mut self.antispam.maintenance_interval_secs,
            "LOGSHIP_ANTISPAM_MAINTENANCE_INTERVAL_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogshipError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.metrics.enabled && self.metrics.endpoint != "/metrics" {
            return Err(invalid(
                "metrics.endpoint",
                "only '/metrics' is supported".to_owned(),
            ));
        }

        self.pipeline.validate()?;
        self.antispam.validate()?;

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> LogshipError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Prometheus 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 입력 경로 목록 (`-`는 stdin)
    pub inputs: Vec<String>,
    /// 워커 스레드 수
    pub workers: usize,
    /// 이벤트 시각 필드 (RFC3339). 없거나 파싱 실패 시 현재 시각 사용
    pub time_field: String,
    /// 워커당 입력 채널 용량
    pub channel_capacity: usize,
    /// 이벤트별 액션 목록 (순서대로 적용)
    pub actions: Vec<ActionConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: vec!["-".to_owned()],
            workers: 4,
            time_field: "time".to_owned(),
            channel_capacity: 1024,
            actions: Vec::new(),
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), LogshipError> {
        if self.inputs.is_empty() {
            return Err(invalid(
                "pipeline.inputs",
                "at least one input must be configured".to_owned(),
            ));
        }

        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(invalid(
                "pipeline.workers",
                format!("must be 1-{MAX_WORKERS}"),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(invalid(
                "pipeline.channel_capacity",
                "must be greater than 0".to_owned(),
            ));
        }

        for (idx, action) in self.actions.iter().enumerate() {
            match action.kind.as_str() {
                "discard" => {}
                "remove_fields" => {
                    if action.fields.is_empty() {
                        return Err(invalid(
                            &format!("pipeline.actions[{idx}].fields"),
                            "remove_fields requires at least one field".to_owned(),
                        ));
                    }
                }
                other => {
                    return Err(invalid(
                        &format!("pipeline.actions[{idx}].type"),
                        format!("unknown action '{other}', expected discard or remove_fields"),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// 파이프라인 액션 설정
///
/// ```toml
/// [[pipeline.actions]]
/// type = "discard"
/// do_if = { op = "equal", field = "level", values = ["debug"] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    /// 액션 종류 (discard, remove_fields)
    #[serde(rename = "type")]
    pub kind: String,
    /// remove_fields 대상 필드 경로
    #[serde(default)]
    pub fields: Vec<String>,
    /// 적용 조건 (없으면 항상 적용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_if: Option<serde_json::Value>,
}

/// Antispam 설정
///
/// 임계값 규칙: `-1` 무제한, `0` 전부 차단, 양수는 유지보수 주기당 허용 이벤트 수.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AntispamConfig {
    /// 전역 임계값
    pub threshold: i64,
    /// 차단 해제까지 필요한 유지보수 주기 수
    pub unban_iterations: u32,
    /// 유지보수 주기 (초)
    pub maintenance_interval_secs: u64,
    /// 예외 규칙 목록 (순서대로 평가, 첫 매칭 우선)
    pub exceptions: Vec<ExceptionRuleConfig>,
}

impl Default for AntispamConfig {
    fn default() -> Self {
        Self {
            threshold: THRESHOLD_UNLIMITED,
            unban_iterations: 2,
            maintenance_interval_secs: 5,
            exceptions: Vec::new(),
        }
    }
}

impl AntispamConfig {
    /// 가드가 비활성 상태(전역 무제한 + 예외 규칙 없음)인지 확인합니다.
    pub fn is_disabled(&self) -> bool {
        self.threshold == THRESHOLD_UNLIMITED && self.exceptions.is_empty()
    }

    fn validate(&self) -> Result<(), LogshipError> {
        if self.threshold < THRESHOLD_UNLIMITED {
            return Err(invalid(
                "antispam.threshold",
                "must be -1 (unlimited), 0 (block) or positive".to_owned(),
            ));
        }

        if self.is_disabled() {
            return Ok(());
        }

        if self.unban_iterations == 0 {
            return Err(invalid(
                "antispam.unban_iterations",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.maintenance_interval_secs == 0 {
            return Err(invalid(
                "antispam.maintenance_interval_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        let mut seen = HashSet::new();
        for (idx, rule) in self.exceptions.iter().enumerate() {
            if rule.name.is_empty() {
                return Err(invalid(
                    &format!("antispam.exceptions[{idx}].name"),
                    "rule name must not be empty".to_owned(),
                ));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(invalid(
                    &format!("antispam.exceptions[{idx}].name"),
                    format!("duplicate rule name '{}'", rule.name),
                ));
            }
            if rule.threshold < THRESHOLD_UNLIMITED {
                return Err(invalid(
                    &format!("antispam.exceptions[{idx}].threshold"),
                    "must be -1 (unlimited), 0 (block) or positive".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

/// Antispam 예외 규칙 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRuleConfig {
    /// 규칙 이름 (메트릭 레이블로 사용)
    pub name: String,
    /// 규칙 임계값 (기본: 무제한)
    #[serde(default = "default_rule_threshold")]
    pub threshold: i64,
    /// 이벤트 대신 소스 이름에 조건을 적용
    #[serde(default)]
    pub check_source_name: bool,
    /// 지정 시 해당 메타데이터 값에 조건을 적용
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_key: Option<String>,
    /// 원시(raw) 모드 조건 트리
    pub condition: serde_json::Value,
}

fn default_rule_threshold() -> i64 {
    THRESHOLD_UNLIMITED
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_i64(target: &mut i64, env_key: &str) {
    override_parsed(target, env_key, "i64");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = LogshipConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(!config.metrics.enabled);
        assert_eq!(config.pipeline.inputs, vec!["-"]);
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.antispam.threshold, THRESHOLD_UNLIMITED);
        assert!(config.antispam.is_disabled());
    }

    #[test]
    fn default_config_passes_validation() {
        LogshipConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = LogshipConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.antispam.unban_iterations, 2);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[antispam]
threshold = 100
"#;
        let config = LogshipConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.antispam.threshold, 100);
        assert_eq!(config.antispam.maintenance_interval_secs, 5);
        assert!(!config.antispam.is_disabled());
    }

    #[test]
    fn from_str_actions_and_exceptions() {
        let toml = r#"
[pipeline]
inputs = ["/var/log/app.json"]
workers = 2

[[pipeline.actions]]
type = "discard"
do_if = { op = "equal", field = "level", values = ["debug"] }

[[pipeline.actions]]
type = "remove_fields"
fields = ["password", "token"]

[antispam]
threshold = 3000
unban_iterations = 4

[[antispam.exceptions]]
name = "payments"
check_source_name = true
condition = { op = "prefix", values = ["/var/log/payments"] }
"#;
        let config = LogshipConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.pipeline.actions.len(), 2);
        assert_eq!(config.pipeline.actions[0].kind, "discard");
        let do_if = config.pipeline.actions[0].do_if.as_ref().unwrap();
        assert_eq!(do_if["op"], "equal");
        assert_eq!(config.pipeline.actions[1].fields, vec!["password", "token"]);

        let rule = &config.antispam.exceptions[0];
        assert_eq!(rule.name, "payments");
        assert_eq!(rule.threshold, THRESHOLD_UNLIMITED);
        assert!(rule.check_source_name);
        assert_eq!(rule.condition["values"][0], "/var/log/payments");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = LogshipConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            LogshipError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = LogshipConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = LogshipConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = LogshipConfig::default();
        config.pipeline.workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn validate_rejects_unknown_action() {
        let mut config = LogshipConfig::default();
        config.pipeline.actions.push(ActionConfig {
            kind: "explode".to_owned(),
            ..Default::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("explode"));
    }

    #[test]
    fn validate_rejects_remove_fields_without_fields() {
        let mut config = LogshipConfig::default();
        config.pipeline.actions.push(ActionConfig {
            kind: "remove_fields".to_owned(),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_threshold_below_unlimited() {
        let mut config = LogshipConfig::default();
        config.antispam.threshold = -2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_skips_antispam_checks_when_disabled() {
        let mut config = LogshipConfig::default();
        config.antispam.unban_iterations = 0;
        config.validate().unwrap();

        config.antispam.threshold = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unban_iterations"));
    }

    #[test]
    fn validate_rejects_duplicate_exception_names() {
        let mut config = LogshipConfig::default();
        let rule = ExceptionRuleConfig {
            name: "dup".to_owned(),
            threshold: THRESHOLD_UNLIMITED,
            check_source_name: false,
            meta_key: None,
            condition: serde_json::json!({"op": "contains", "values": ["x"]}),
        };
        config.antispam.exceptions = vec![rule.clone(), rule];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    #[serial]
    fn env_override_applies_typed_values() {
        // SAFETY: serial 테스트로 실행되어 환경변수 조작이 다른 테스트와 겹치지 않습니다.
        unsafe {
            std::env::set_var("LOGSHIP_PIPELINE_WORKERS", "16");
            std::env::set_var("LOGSHIP_ANTISPAM_THRESHOLD", "250");
            std::env::set_var("LOGSHIP_PIPELINE_INPUTS", "/a.log, /b.log");
        }
        let mut config = LogshipConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.pipeline.workers, 16);
        assert_eq!(config.antispam.threshold, 250);
        assert_eq!(config.pipeline.inputs, vec!["/a.log", "/b.log"]);
        unsafe {
            std::env::remove_var("LOGSHIP_PIPELINE_WORKERS");
            std::env::remove_var("LOGSHIP_ANTISPAM_THRESHOLD");
            std::env::remove_var("LOGSHIP_PIPELINE_INPUTS");
        }
    }

    #[test]
    #[serial]
    fn env_override_invalid_keeps_original() {
        // SAFETY: serial 테스트로 실행되어 환경변수 조작이 다른 테스트와 겹치지 않습니다.
        unsafe { std::env::set_var("LOGSHIP_METRICS_ENABLED", "not-a-bool") };
        let mut config = LogshipConfig::default();
        config.apply_env_overrides();
        assert!(!config.metrics.enabled); // 원래 값 유지
        unsafe { std::env::remove_var("LOGSHIP_METRICS_ENABLED") };
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = LogshipConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LogshipConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.pipeline.workers, parsed.pipeline.workers);
        assert_eq!(
            config.antispam.maintenance_interval_secs,
            parsed.antispam.maintenance_interval_secs
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = LogshipConfig::from_file("/nonexistent/path/logship.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LogshipError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logship.toml");

        std::fs::write(&path, "[pipeline]\nworkers = 3\n").unwrap();
        let config = LogshipConfig::from_file(&path).await.unwrap();
        assert_eq!(config.pipeline.workers, 3);

        std::fs::write(&path, "[pipeline]\nworkers = 0\n").unwrap();
        assert!(LogshipConfig::from_file(&path).await.is_err());
    }
}
