//! Antispam 가드 설정
//!
//! [`GuardConfig`]는 core의 [`AntispamConfig`]에서 생성하거나
//! [`GuardConfigBuilder`]로 직접 조립합니다.

use std::time::Duration;

use logship_core::config::{AntispamConfig, ExceptionRuleConfig, THRESHOLD_UNLIMITED};

use crate::error::AntispamError;

/// 가드 설정
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// 전역 임계값 (-1 무제한, 0 차단, 양수 제한)
    pub threshold: i64,
    /// 차단 해제까지 필요한 유지보수 주기 수
    pub unban_iterations: u32,
    /// 유지보수 주기. 같은 주기 안의 이벤트만 카운트됩니다.
    pub maintenance_interval: Duration,
    /// 예외 규칙 (순서대로 평가)
    pub exceptions: Vec<ExceptionRuleConfig>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            threshold: THRESHOLD_UNLIMITED,
            unban_iterations: 2,
            maintenance_interval: Duration::from_secs(5),
            exceptions: Vec::new(),
        }
    }
}

impl GuardConfig {
    /// core의 `AntispamConfig`에서 가드 설정을 생성합니다.
    pub fn from_core(core: &AntispamConfig) -> Self {
        Self {
            threshold: core.threshold,
            unban_iterations: core.unban_iterations,
            maintenance_interval: Duration::from_secs(core.maintenance_interval_secs),
            exceptions: core.exceptions.clone(),
        }
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), AntispamError> {
        if self.threshold < THRESHOLD_UNLIMITED {
            return Err(invalid("threshold", "must be -1, 0 or positive"));
        }
        if self.unban_iterations == 0 {
            return Err(invalid("unban_iterations", "must be greater than 0"));
        }
        if self.maintenance_interval.is_zero() {
            return Err(invalid("maintenance_interval", "must be greater than 0"));
        }
        for (idx, rule) in self.exceptions.iter().enumerate() {
            if rule.threshold < THRESHOLD_UNLIMITED {
                return Err(invalid(
                    &format!("exceptions[{idx}].threshold"),
                    "must be -1, 0 or positive",
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> AntispamError {
    AntispamError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// 가드 설정 빌더
#[derive(Default)]
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 전역 임계값을 설정합니다.
    pub fn threshold(mut self, threshold: i64) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// 차단 해제 주기 수를 설정합니다.
    pub fn unban_iterations(mut self, iterations: u32) -> Self {
        self.config.unban_iterations = iterations;
        self
    }

    /// 유지보수 주기를 설정합니다.
    pub fn maintenance_interval(mut self, interval: Duration) -> Self {
        self.config.maintenance_interval = interval;
        self
    }

    /// 예외 규칙을 추가합니다.
    pub fn exception(mut self, rule: ExceptionRuleConfig) -> Self {
        self.config.exceptions.push(rule);
        self
    }

    /// 설정을 검증하고 `GuardConfig`를 생성합니다.
    pub fn build(self) -> Result<GuardConfig, AntispamError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GuardConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = AntispamConfig {
            threshold: 100,
            unban_iterations: 3,
            maintenance_interval_secs: 10,
            ..Default::default()
        };
        let config = GuardConfig::from_core(&core);
        assert_eq!(config.threshold, 100);
        assert_eq!(config.unban_iterations, 3);
        assert_eq!(config.maintenance_interval, Duration::from_secs(10));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        assert!(GuardConfigBuilder::new().threshold(-2).build().is_err());
        assert!(GuardConfigBuilder::new().unban_iterations(0).build().is_err());
        assert!(
            GuardConfigBuilder::new()
                .maintenance_interval(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_rejects_bad_rule_threshold() {
        let rule = ExceptionRuleConfig {
            name: "r".to_owned(),
            threshold: -5,
            check_source_name: false,
            meta_key: None,
            condition: serde_json::json!({"op": "contains", "values": ["x"]}),
        };
        let err = GuardConfigBuilder::new().exception(rule).build().unwrap_err();
        assert!(err.to_string().contains("exceptions[0].threshold"));
    }
}
