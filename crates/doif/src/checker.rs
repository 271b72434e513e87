//! 조건 트리 (Checker)
//!
//! [`Checker`]는 루트 노드 하나를 소유하며 빌드 후 불변입니다.
//! 여러 워커가 동시에 `&Checker`로 평가해도 안전합니다.
//! 설정이 바뀌면 트리를 통째로 새로 빌드해 교체합니다.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{BuildMode, Compiled, NodeConfig, compile};
use crate::error::{DoIfError, Mismatch};
use crate::field::FieldPath;
use crate::node::{Input, Node};
use crate::scratch::{FieldScratch, FieldValueCache};

/// 컴파일된 조건 트리
#[derive(Debug)]
pub struct Checker {
    root: Node,
    fields: Vec<FieldPath>,
    layout: Vec<bool>,
    cache: FieldValueCache,
}

impl Checker {
    /// JSON 문서용 트리를 빌드합니다.
    pub fn from_config(config: &NodeConfig) -> Result<Self, DoIfError> {
        Self::build(config, BuildMode::Document)
    }

    /// 원시 바이트 버퍼용 트리를 빌드합니다. 필드 경로는 선택입니다.
    pub fn from_config_raw(config: &NodeConfig) -> Result<Self, DoIfError> {
        Self::build(config, BuildMode::Raw)
    }

    /// 이미 파싱된 설정 값(JSON 트리)에서 빌드합니다.
    pub fn from_value(value: &Value) -> Result<Self, DoIfError> {
        Self::from_config(&decode_value(value)?)
    }

    /// 이미 파싱된 설정 값에서 원시 바이트용 트리를 빌드합니다.
    pub fn from_raw_value(value: &Value) -> Result<Self, DoIfError> {
        Self::from_config_raw(&decode_value(value)?)
    }

    /// JSON 텍스트에서 빌드합니다.
    pub fn from_json(text: &str) -> Result<Self, DoIfError> {
        let config: NodeConfig =
            serde_json::from_str(text).map_err(|e| DoIfError::Decode(e.to_string()))?;
        Self::from_config(&config)
    }

    /// YAML 텍스트에서 빌드합니다.
    pub fn from_yaml(text: &str) -> Result<Self, DoIfError> {
        let config: NodeConfig =
            serde_yaml::from_str(text).map_err(|e| DoIfError::Decode(e.to_string()))?;
        Self::from_config(&config)
    }

    fn build(config: &NodeConfig, mode: BuildMode) -> Result<Self, DoIfError> {
        let Compiled {
            root,
            fields,
            layout,
        } = compile(config, mode)?;

        debug!(
            op = %config.op,
            fields = fields.len(),
            raw = mode == BuildMode::Raw,
            "do_if tree built"
        );

        Ok(Self {
            root,
            fields,
            layout,
            cache: FieldValueCache::new(),
        })
    }

    /// 문서를 평가합니다. 문서가 없으면 `false`입니다.
    ///
    /// proc ID 0의 스크래치를 사용합니다.
    pub fn check(&self, doc: Option<&Value>) -> bool {
        self.check_proc(0, doc)
    }

    /// 지정한 워커의 스크래치로 문서를 평가합니다.
    ///
    /// 처음 보는 proc ID면 스크래치를 생성합니다.
    pub fn check_proc(&self, proc_id: usize, doc: Option<&Value>) -> bool {
        let Some(doc) = doc else {
            return false;
        };
        let worker = self.cache.scratch(proc_id);
        let mut scratch = worker.lock();
        self.check_with(doc, &mut scratch)
    }

    /// 호출자가 소유한 스크래치로 문서를 평가합니다. 잠금이 없습니다.
    ///
    /// 평가가 끝나면 스크래치는 비워집니다.
    pub fn check_with(&self, doc: &Value, scratch: &mut FieldScratch) -> bool {
        scratch.prepare(&self.layout);
        let matched = self.root.check(&mut Input::Doc {
            doc,
            scratch: &mut *scratch,
        });
        scratch.clear();
        matched
    }

    /// 단일 바이트 버퍼를 평가합니다.
    pub fn check_raw(&self, data: &[u8]) -> bool {
        self.root.check(&mut Input::Raw(data))
    }

    /// 이 트리에 맞춘 새 스크래치
    pub fn new_scratch(&self) -> FieldScratch {
        let mut scratch = FieldScratch::new();
        scratch.prepare(&self.layout);
        scratch
    }

    /// 트리가 참조하는 고유 필드 경로
    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    /// 고유 필드 경로 수
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// 두 트리를 위치 기준으로 비교합니다.
    ///
    /// 의미가 같더라도 별칭 철자나 피연산자 순서가 다르면 다른 트리입니다.
    pub fn is_equal_to(&self, other: &Checker) -> Result<(), Mismatch> {
        self.root.diff(&other.root, "root")
    }
}

fn decode_value(value: &Value) -> Result<NodeConfig, DoIfError> {
    NodeConfig::deserialize(value).map_err(|e| DoIfError::Decode(e.to_string()))
}
