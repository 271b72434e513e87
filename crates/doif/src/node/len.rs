use crate::cmp::Comparator;
use crate::error::{Mismatch, ensure_eq};
use crate::field::NodeKind;
use crate::scratch::FieldRef;

use super::Input;

/// 길이 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LenKind {
    /// 값의 바이트 길이 (배열/객체는 compact JSON 길이)
    Bytes,
    /// 배열 원소 수. 배열이 아니면 `false`
    Array,
}

/// 필드 길이를 상수와 비교하는 리프
#[derive(Debug)]
pub(crate) struct LenNode {
    pub(crate) kind: LenKind,
    pub(crate) field: FieldRef,
    pub(crate) cmp: Comparator,
}

impl LenNode {
    pub(crate) fn check(&self, input: &mut Input<'_>) -> bool {
        let len = match input {
            Input::Doc { doc, scratch } => {
                let slot = scratch.slot(&self.field, *doc);
                match self.kind {
                    LenKind::Bytes => slot.byte_len(),
                    LenKind::Array => (slot.kind == NodeKind::Array).then_some(slot.array_len),
                }
            }
            Input::Raw(data) => match self.kind {
                LenKind::Bytes => Some(data.len()),
                LenKind::Array => None,
            },
        };
        len.is_some_and(|len| self.cmp.compare(len))
    }

    pub(crate) fn diff(&self, other: &Self, path: &str) -> Result<(), Mismatch> {
        ensure_eq(path, "kind", &self.kind, &other.kind)?;
        ensure_eq(path, "field", &self.field.path, &other.field.path)?;
        ensure_eq(path, "cmp_op", &self.cmp.op(), &other.cmp.op())?;
        ensure_eq(path, "value", &self.cmp.value(), &other.cmp.value())
    }
}
