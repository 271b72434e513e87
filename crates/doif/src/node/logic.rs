use crate::error::{Mismatch, ensure_eq};

use super::{Input, Node};

/// 논리 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicOp {
    And,
    Or,
    Not,
}

impl LogicOp {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

/// 하위 노드를 결합하는 내부 노드
///
/// `and`/`or`는 단락 평가합니다. `not`은 피연산자가 정확히 하나입니다.
#[derive(Debug)]
pub(crate) struct LogicNode {
    pub(crate) op: LogicOp,
    pub(crate) operands: Vec<Node>,
}

impl LogicNode {
    pub(crate) fn check(&self, input: &mut Input<'_>) -> bool {
        match self.op {
            LogicOp::And => self.operands.iter().all(|node| node.check(input)),
            LogicOp::Or => self.operands.iter().any(|node| node.check(input)),
            LogicOp::Not => !self.operands[0].check(input),
        }
    }

    pub(crate) fn diff(&self, other: &Self, path: &str) -> Result<(), Mismatch> {
        ensure_eq(path, "op", &self.op, &other.op)?;
        ensure_eq(
            path,
            "operands.len",
            &self.operands.len(),
            &other.operands.len(),
        )?;
        for (i, (a, b)) in self.operands.iter().zip(&other.operands).enumerate() {
            a.diff(b, &format!("{path}.operands[{i}]"))?;
        }
        Ok(())
    }
}
