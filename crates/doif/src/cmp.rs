//! 비교 연산자와 길이 비교기

use std::cmp::Ordering;

use crate::error::DoIfError;

/// 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl CmpOp {
    /// `lt`, `le`, `gt`, `ge`, `eq`, `ne` 중 하나를 파싱합니다.
    pub fn parse(name: &str) -> Result<Self, DoIfError> {
        match name {
            "lt" => Ok(Self::Lt),
            "le" => Ok(Self::Le),
            "gt" => Ok(Self::Gt),
            "ge" => Ok(Self::Ge),
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            other => Err(DoIfError::UnknownCmpOp(other.to_owned())),
        }
    }

    /// 설정에서 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Eq => "eq",
            Self::Ne => "ne",
        }
    }

    /// `lhs <op> rhs`를 계산합니다.
    #[inline]
    pub fn apply<T: Ord>(&self, lhs: &T, rhs: &T) -> bool {
        let ord = lhs.cmp(rhs);
        match self {
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
        }
    }
}

/// 음이 아닌 정수 임계값과의 비교기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparator {
    op: CmpOp,
    value: u64,
}

impl Comparator {
    /// 비교기를 생성합니다. 음수 임계값은 거부합니다.
    pub fn new(op: CmpOp, value: i64) -> Result<Self, DoIfError> {
        let value = u64::try_from(value).map_err(|_| DoIfError::InvalidLength(value.to_string()))?;
        Ok(Self { op, value })
    }

    /// 비교 연산자
    pub fn op(&self) -> CmpOp {
        self.op
    }

    /// 임계값
    pub fn value(&self) -> u64 {
        self.value
    }

    /// `x <op> value`
    #[inline]
    pub fn compare(&self, x: usize) -> bool {
        self.op.apply(&(x as u64), &self.value)
    }
}
