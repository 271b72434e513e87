//! 조건 트리 설정과 빌더
//!
//! [`NodeConfig`]는 JSON/YAML/TOML에서 역직렬화되는 노드 설정입니다.
//! 빌더는 설정을 한 번 검증하면서 [`Node`] 트리로 컴파일하고,
//! 고유 필드 경로마다 스크래치 슬롯 번호를 부여합니다.
//!
//! # 설정 예시
//!
//! ```yaml
//! op: and
//! operands:
//!   - op: prefix
//!     field: level
//!     values: [err, warn]
//!     case_sensitive: false
//!   - op: array_len_cmp
//!     field: items
//!     cmp_op: lt
//!     value: 2
//! ```

use std::collections::HashMap;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::cmp::{CmpOp, Comparator};
use crate::duration::parse_duration;
use crate::error::DoIfError;
use crate::field::FieldPath;
use crate::node::{
    DEFAULT_FORMAT, FieldNode, LenKind, LenNode, LogicNode, LogicOp, Node, TsLayout, TsNode,
    TypeNode,
};
use crate::scratch::FieldRef;
use crate::str_matcher::{MatchOp, StringMatcher};

/// `update_interval` 기본값
pub const DEFAULT_UPDATE_INTERVAL: &str = "10s";

/// 노드 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// 연산자 이름
    pub op: String,

    /// 필드 경로 (`.` 구분, `\.`은 리터럴 점)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// 매칭 값 또는 타입 토큰
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<ValuesConfig>,

    /// 대소문자 구분 여부 (기본: true)
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,

    /// 논리 연산자의 피연산자
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<NodeConfig>,

    /// 비교 연산자 (`lt`, `le`, `gt`, `ge`, `eq`, `ne`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmp_op: Option<String>,

    /// 길이 임계값(정수) 또는 타임스탬프 상수(문자열)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    /// 시각 형식 이름 또는 strftime 패턴
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// 우변 시각 이동량 (예: `-5m`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_shift: Option<String>,

    /// 현재 시각 갱신 주기
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_interval: Option<String>,
}

fn default_case_sensitive() -> bool {
    true
}

impl NodeConfig {
    /// 지정한 연산자의 빈 설정을 생성합니다.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            field: None,
            values: None,
            case_sensitive: true,
            operands: Vec::new(),
            cmp_op: None,
            value: None,
            format: None,
            value_shift: None,
            update_interval: None,
        }
    }

    /// 필드 경로를 지정합니다.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// 값 목록을 지정합니다.
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(ValuesConfig::Many(
            values.into_iter().map(|v| Some(v.into())).collect(),
        ));
        self
    }

    /// 대소문자 구분 여부를 지정합니다.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// 피연산자를 지정합니다.
    pub fn operands(mut self, operands: Vec<NodeConfig>) -> Self {
        self.operands = operands;
        self
    }

    /// 비교 연산자와 값을 지정합니다.
    pub fn compare(mut self, cmp_op: &str, value: impl Into<serde_json::Value>) -> Self {
        self.cmp_op = Some(cmp_op.to_owned());
        self.value = Some(value.into());
        self
    }
}

/// `values` 키: 단일 문자열 또는 문자열/null 배열
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValuesConfig {
    /// `values: err`
    One(String),
    /// `values: [err, null]`
    Many(Vec<Option<String>>),
}

impl ValuesConfig {
    fn into_list(self) -> Vec<Option<String>> {
        match self {
            ValuesConfig::One(value) => vec![Some(value)],
            ValuesConfig::Many(values) => values,
        }
    }
}

/// 필드 해석 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildMode {
    /// JSON 문서 필드 탐색
    Document,
    /// 단일 바이트 버퍼 평가. 필드는 선택이며 평가에 쓰이지 않습니다.
    Raw,
}

/// 빌드 결과
pub(crate) struct Compiled {
    pub(crate) root: Node,
    pub(crate) fields: Vec<FieldPath>,
    pub(crate) layout: Vec<bool>,
}

/// 설정 트리를 노드 트리로 컴파일합니다.
pub(crate) fn compile(config: &NodeConfig, mode: BuildMode) -> Result<Compiled, DoIfError> {
    let mut builder = Builder {
        mode,
        slots: HashMap::new(),
        fields: Vec::new(),
        layout: Vec::new(),
    };
    let root = builder.build(config)?;
    Ok(Compiled {
        root,
        fields: builder.fields,
        layout: builder.layout,
    })
}

struct Builder {
    mode: BuildMode,
    slots: HashMap<String, usize>,
    fields: Vec<FieldPath>,
    /// 슬롯별 인코딩 길이 필요 여부
    layout: Vec<bool>,
}

impl Builder {
    fn build(&mut self, config: &NodeConfig) -> Result<Node, DoIfError> {
        let op = config.op.as_str();

        if let Some(match_op) = MatchOp::parse(op) {
            return self.build_field(config, match_op);
        }
        if let Some(logic_op) = LogicOp::parse(op) {
            return self.build_logic(config, logic_op);
        }
        match op {
            "byte_len_cmp" => self.build_len(config, LenKind::Bytes),
            "array_len_cmp" => self.build_len(config, LenKind::Array),
            "ts_cmp" => self.build_ts(config),
            "check_type" => self.build_type(config),
            other => Err(DoIfError::UnknownOp(other.to_owned())),
        }
    }

    /// 경로를 슬롯에 배정합니다. 같은 경로는 같은 슬롯을 공유합니다.
    fn intern(&mut self, raw: &str, wants_encoded_len: bool) -> FieldRef {
        let slot = match self.slots.get(raw) {
            Some(&slot) => slot,
            None => {
                let slot = self.fields.len();
                self.slots.insert(raw.to_owned(), slot);
                self.fields.push(FieldPath::parse(raw));
                self.layout.push(false);
                slot
            }
        };
        self.layout[slot] |= wants_encoded_len;
        FieldRef {
            path: self.fields[slot].clone(),
            slot,
        }
    }

    /// 문자열 매칭 연산자의 필드. 문서 모드에서는 비어 있으면 안 됩니다.
    fn required_field(&mut self, config: &NodeConfig) -> Result<FieldRef, DoIfError> {
        match (self.mode, config.field.as_deref()) {
            (BuildMode::Raw, field) => Ok(self.intern(field.unwrap_or(""), false)),
            (BuildMode::Document, None) => Err(DoIfError::MissingKey {
                op: config.op.clone(),
                key: "field",
            }),
            (BuildMode::Document, Some("")) => Err(DoIfError::EmptyField {
                op: config.op.clone(),
            }),
            (BuildMode::Document, Some(field)) => Ok(self.intern(field, false)),
        }
    }

    /// 생략하면 문서 루트
    fn optional_field(&mut self, config: &NodeConfig, wants_encoded_len: bool) -> FieldRef {
        self.intern(config.field.as_deref().unwrap_or(""), wants_encoded_len)
    }

    fn cmp_op(&self, config: &NodeConfig) -> Result<CmpOp, DoIfError> {
        let name = config.cmp_op.as_deref().ok_or_else(|| DoIfError::MissingKey {
            op: config.op.clone(),
            key: "cmp_op",
        })?;
        CmpOp::parse(name)
    }

    fn build_field(&mut self, config: &NodeConfig, op: MatchOp) -> Result<Node, DoIfError> {
        let field = self.required_field(config)?;
        let values = config
            .values
            .clone()
            .map(ValuesConfig::into_list)
            .unwrap_or_default();
        let matcher = StringMatcher::new(op, config.case_sensitive, &values)?;
        Ok(Node::Field(FieldNode { field, matcher }))
    }

    fn build_len(&mut self, config: &NodeConfig, kind: LenKind) -> Result<Node, DoIfError> {
        let cmp_op = self.cmp_op(config)?;
        let value = config.value.as_ref().ok_or_else(|| DoIfError::MissingKey {
            op: config.op.clone(),
            key: "value",
        })?;
        let threshold = value
            .as_i64()
            .ok_or_else(|| DoIfError::InvalidLength(value.to_string()))?;
        let cmp = Comparator::new(cmp_op, threshold)?;
        let field = self.optional_field(config, kind == LenKind::Bytes);
        Ok(Node::Len(LenNode { kind, field, cmp }))
    }

    fn build_ts(&mut self, config: &NodeConfig) -> Result<Node, DoIfError> {
        let cmp = self.cmp_op(config)?;
        let format = config
            .format
            .clone()
            .unwrap_or_else(|| DEFAULT_FORMAT.to_owned());
        let layout = TsLayout::resolve(&format)?;

        let value = match &config.value {
            Some(serde_json::Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(DoIfError::InvalidTimestamp {
                    value: other.to_string(),
                    reason: "expected a string".to_owned(),
                });
            }
            None => {
                return Err(DoIfError::MissingKey {
                    op: config.op.clone(),
                    key: "value",
                });
            }
        };

        let value_shift = match &config.value_shift {
            Some(shift) => parse_duration(shift)?,
            None => TimeDelta::zero(),
        };
        let update_interval =
            parse_duration(config.update_interval.as_deref().unwrap_or(DEFAULT_UPDATE_INTERVAL))?;
        if update_interval <= TimeDelta::zero() {
            return Err(DoIfError::InvalidDuration {
                value: config.update_interval.clone().unwrap_or_default(),
                reason: "update_interval must be positive".to_owned(),
            });
        }

        let rhs = TsNode::resolve_rhs(value, &layout, value_shift)?;
        let field = self.optional_field(config, false);

        Ok(Node::Ts(TsNode {
            field,
            format,
            layout,
            cmp,
            rhs,
            value_shift,
            update_interval,
        }))
    }

    fn build_type(&mut self, config: &NodeConfig) -> Result<Node, DoIfError> {
        let tokens = config
            .values
            .clone()
            .map(ValuesConfig::into_list)
            .unwrap_or_default();
        if tokens.is_empty() {
            return Err(DoIfError::EmptyValues {
                op: config.op.clone(),
            });
        }
        if tokens.iter().any(Option::is_none) {
            return Err(DoIfError::NullValue {
                op: config.op.clone(),
            });
        }

        let kinds = TypeNode::normalize(tokens.iter().flatten().map(String::as_str))?;
        let field = self.optional_field(config, false);
        Ok(Node::Type(TypeNode { field, kinds }))
    }

    fn build_logic(&mut self, config: &NodeConfig, op: LogicOp) -> Result<Node, DoIfError> {
        let got = config.operands.len();
        let valid = match op {
            LogicOp::Not => got == 1,
            LogicOp::And | LogicOp::Or => got >= 1,
        };
        if !valid {
            return Err(DoIfError::OperandCount {
                op: op.as_str().to_owned(),
                expected: if op == LogicOp::Not { "exactly 1" } else { "at least 1" },
                got,
            });
        }

        let operands = config
            .operands
            .iter()
            .map(|operand| self.build(operand))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::Logic(LogicNode { op, operands }))
    }
}
