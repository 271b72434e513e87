//! 조건 트리 노드
//!
//! 노드 종류는 닫힌 열거형 [`Node`]이며 평가는 `match`로 분기합니다.
//! 모든 노드는 빌드 후 불변이고, 평가 중 에러는 `false`로 표현됩니다.
//!
//! 노드는 두 가지 입력을 받습니다.
//!
//! - [`Input::Doc`]: JSON 문서와 워커 스크래치. 필드는 스크래치 슬롯을 통해 탐색됩니다.
//! - [`Input::Raw`]: 단일 바이트 버퍼. 필드 경로는 무시되고 버퍼 자체가 값입니다.

mod field;
mod len;
mod logic;
mod ts;
mod types;

pub(crate) use field::FieldNode;
pub(crate) use len::{LenKind, LenNode};
pub(crate) use logic::{LogicNode, LogicOp};
pub(crate) use ts::{DEFAULT_FORMAT, TsLayout, TsNode};
pub(crate) use types::TypeNode;

use serde_json::Value;

use crate::error::Mismatch;
use crate::scratch::FieldScratch;

/// 평가 입력
pub(crate) enum Input<'a> {
    /// JSON 문서
    Doc {
        doc: &'a Value,
        scratch: &'a mut FieldScratch,
    },
    /// 원시 바이트 버퍼
    Raw(&'a [u8]),
}

/// 조건 노드
#[derive(Debug)]
pub(crate) enum Node {
    Field(FieldNode),
    Len(LenNode),
    Ts(TsNode),
    Type(TypeNode),
    Logic(LogicNode),
}

impl Node {
    pub(crate) fn check(&self, input: &mut Input<'_>) -> bool {
        match self {
            Node::Field(node) => node.check(input),
            Node::Len(node) => node.check(input),
            Node::Ts(node) => node.check(input),
            Node::Type(node) => node.check(input),
            Node::Logic(node) => node.check(input),
        }
    }

    /// 위치 기반 구조 비교. 처음 발견한 차이를 반환합니다.
    pub(crate) fn diff(&self, other: &Node, path: &str) -> Result<(), Mismatch> {
        match (self, other) {
            (Node::Field(a), Node::Field(b)) => a.diff(b, path),
            (Node::Len(a), Node::Len(b)) => a.diff(b, path),
            (Node::Ts(a), Node::Ts(b)) => a.diff(b, path),
            (Node::Type(a), Node::Type(b)) => a.diff(b, path),
            (Node::Logic(a), Node::Logic(b)) => a.diff(b, path),
            _ => Err(Mismatch::new(
                path,
                format!("node kind {} != {}", self.kind_name(), other.kind_name()),
            )),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Node::Field(_) => "field",
            Node::Len(_) => "length",
            Node::Ts(_) => "timestamp",
            Node::Type(_) => "type",
            Node::Logic(_) => "logical",
        }
    }
}
