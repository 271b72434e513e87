//! 임계값과 예외 규칙

use std::collections::HashMap;
use std::fmt;

use logship_core::config::ExceptionRuleConfig;
use logship_doif::Checker;

use crate::error::AntispamError;

/// 유입 임계값
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// 제한 없음 (`-1`)
    Unlimited,
    /// 무조건 차단 (`0`)
    Block,
    /// 유지보수 주기당 허용 이벤트 수
    Limit(u64),
}

impl Threshold {
    /// 설정 값(`-1`, `0`, 양수)을 해석합니다.
    pub fn from_raw(raw: i64) -> Result<Self, AntispamError> {
        match raw {
            -1 => Ok(Self::Unlimited),
            0 => Ok(Self::Block),
            n if n > 0 => Ok(Self::Limit(n as u64)),
            n => Err(AntispamError::Config {
                field: "threshold".to_owned(),
                reason: format!("{n} is not -1, 0 or positive"),
            }),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Block => f.write_str("block"),
            Self::Limit(n) => write!(f, "{n}"),
        }
    }
}

/// 조건을 적용할 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    /// 원본 이벤트 바이트
    Event,
    /// 소스 이름
    SourceName,
    /// 메타데이터 값
    Meta(String),
}

/// 예외 규칙
#[derive(Debug)]
pub struct ExceptionRule {
    name: String,
    threshold: Threshold,
    target: RuleTarget,
    condition: Checker,
}

impl ExceptionRule {
    /// core 설정에서 규칙을 빌드합니다. 조건은 원시 바이트 모드로 컴파일됩니다.
    pub fn from_core(config: &ExceptionRuleConfig) -> Result<Self, AntispamError> {
        let condition =
            Checker::from_raw_value(&config.condition).map_err(|source| {
                AntispamError::Condition {
                    rule: config.name.clone(),
                    source,
                }
            })?;

        let target = match (&config.meta_key, config.check_source_name) {
            (Some(key), _) => RuleTarget::Meta(key.clone()),
            (None, true) => RuleTarget::SourceName,
            (None, false) => RuleTarget::Event,
        };

        Ok(Self {
            name: config.name.clone(),
            threshold: Threshold::from_raw(config.threshold)?,
            target,
            condition,
        })
    }

    /// 규칙 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 규칙 임계값
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// 조건 대상
    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    /// 규칙이 이벤트에 적용되는지 확인합니다. 메타데이터 키가 없으면 `false`입니다.
    pub fn matches(
        &self,
        event: &[u8],
        source_name: &str,
        meta: &HashMap<String, String>,
    ) -> bool {
        let data = match &self.target {
            RuleTarget::Event => event,
            RuleTarget::SourceName => source_name.as_bytes(),
            RuleTarget::Meta(key) => match meta.get(key) {
                Some(value) => value.as_bytes(),
                None => return false,
            },
        };
        self.condition.check_raw(data)
    }
}
