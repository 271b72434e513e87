use crate::error::{Mismatch, ensure_eq};
use crate::field::NodeKind;
use crate::scratch::FieldRef;
use crate::str_matcher::StringMatcher;

use super::Input;

/// 필드 값을 문자열 매처로 검사하는 리프
///
/// 배열과 객체는 직렬화하지 않고 항상 `false`입니다.
#[derive(Debug)]
pub(crate) struct FieldNode {
    pub(crate) field: FieldRef,
    pub(crate) matcher: StringMatcher,
}

impl FieldNode {
    pub(crate) fn check(&self, input: &mut Input<'_>) -> bool {
        match input {
            Input::Doc { doc, scratch } => {
                let slot = scratch.slot(&self.field, *doc);
                match slot.kind {
                    NodeKind::Array | NodeKind::Object => false,
                    _ => self.matcher.check(slot.scalar()),
                }
            }
            Input::Raw(data) => self.matcher.check(Some(*data)),
        }
    }

    pub(crate) fn diff(&self, other: &Self, path: &str) -> Result<(), Mismatch> {
        ensure_eq(path, "field", &self.field.path, &other.field.path)?;
        self.matcher.diff(&other.matcher, path)
    }
}
