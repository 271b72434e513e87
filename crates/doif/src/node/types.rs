use crate::error::{DoIfError, Mismatch, ensure_eq};
use crate::field::NodeKind;
use crate::scratch::FieldRef;

use super::Input;

/// `check_type`가 허용하는 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeKind {
    Object,
    Array,
    Number,
    String,
    /// JSON null (존재하는 노드)
    Null,
    /// 경로가 해석되지 않음
    Nil,
}

impl TypeKind {
    pub(crate) fn parse(token: &str) -> Result<Self, DoIfError> {
        match token {
            "obj" | "object" => Ok(Self::Object),
            "arr" | "array" => Ok(Self::Array),
            "num" | "number" => Ok(Self::Number),
            "str" | "string" => Ok(Self::String),
            "null" => Ok(Self::Null),
            "nil" => Ok(Self::Nil),
            other => Err(DoIfError::UnknownType(other.to_owned())),
        }
    }

    fn matches(self, kind: NodeKind) -> bool {
        matches!(
            (self, kind),
            (Self::Object, NodeKind::Object)
                | (Self::Array, NodeKind::Array)
                | (Self::Number, NodeKind::Number)
                | (Self::String, NodeKind::String)
                | (Self::Null, NodeKind::Null)
                | (Self::Nil, NodeKind::Absent)
        )
    }
}

/// 필드의 JSON 종류를 검사하는 리프
#[derive(Debug)]
pub(crate) struct TypeNode {
    pub(crate) field: FieldRef,
    /// 중복 제거된 종류 (처음 등장한 순서)
    pub(crate) kinds: Vec<TypeKind>,
}

impl TypeNode {
    /// 토큰 목록을 정규화합니다. 별칭이 달라도 같은 종류는 한 번만 남습니다.
    pub(crate) fn normalize<'a>(
        tokens: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<TypeKind>, DoIfError> {
        let mut kinds = Vec::new();
        for token in tokens {
            let kind = TypeKind::parse(token)?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    pub(crate) fn check(&self, input: &mut Input<'_>) -> bool {
        let kind = match input {
            Input::Doc { doc, scratch } => scratch.slot(&self.field, *doc).kind,
            Input::Raw(_) => NodeKind::String,
        };
        self.kinds.iter().any(|t| t.matches(kind))
    }

    pub(crate) fn diff(&self, other: &Self, path: &str) -> Result<(), Mismatch> {
        ensure_eq(path, "field", &self.field.path, &other.field.path)?;
        ensure_eq(path, "values", &self.kinds, &other.kinds)
    }
}
