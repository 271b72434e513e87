//! 바이트 문자열 매처
//!
//! [`StringMatcher`]는 빌드 시점에 값 집합을 전처리해 두고,
//! 평가 시점에는 할당 없이 후보 바이트열을 검사합니다.
//!
//! - `equal`: 값을 바이트 길이별 버킷으로 나눠 두어 길이가 다른 후보는 즉시 거부
//! - `contains`: Aho-Corasick 오토마톤으로 모든 값을 한 번에 탐색
//! - `prefix` / `suffix`: 최소 길이 미만은 즉시 거부, 후보는 최대 길이로 잘라서 비교
//! - `regex`: 원본 바이트에 정규식 적용 (대소문자 플래그 무시)
//!
//! 대소문자 무시는 ASCII 기준입니다.

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex::bytes::Regex;

use crate::error::{DoIfError, Mismatch, ensure_eq};

/// 문자열 매칭 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    /// 완전 일치
    Equal,
    /// 부분 문자열 포함
    Contains,
    /// 접두사 일치
    Prefix,
    /// 접미사 일치
    Suffix,
    /// 정규식 일치
    Regex,
}

impl MatchOp {
    /// 연산자 이름을 파싱합니다. 문자열 매칭 연산자가 아니면 `None`입니다.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "equal" => Some(Self::Equal),
            "contains" => Some(Self::Contains),
            "prefix" => Some(Self::Prefix),
            "suffix" => Some(Self::Suffix),
            "regex" => Some(Self::Regex),
            _ => None,
        }
    }

    /// 설정에서 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Contains => "contains",
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
            Self::Regex => "regex",
        }
    }
}

impl std::fmt::Display for MatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 컴파일된 문자열 매처
#[derive(Debug, Clone)]
pub struct StringMatcher {
    op: MatchOp,
    case_sensitive: bool,
    /// null이 아닌 값 (대소문자 무시 시 소문자로 변환됨)
    values: Vec<Vec<u8>>,
    /// 값 목록에 null이 포함되었는지 (`equal`만 허용)
    has_null: bool,
    /// `equal` 전용: 바이트 길이 -> 해당 길이의 값 목록
    by_len: HashMap<usize, Vec<Vec<u8>>>,
    min_len: usize,
    max_len: usize,
    contains: Option<AhoCorasick>,
    regexes: Vec<Regex>,
}

impl StringMatcher {
    /// 매처를 빌드합니다.
    ///
    /// `None` 값은 null을 뜻하며 `equal`에서만 허용됩니다.
    ///
    /// `case_sensitive = false`는 ASCII 문자만 접습니다. 비ASCII 문자(`É`, `Ä` 등)는 그대로 비교됩니다.
    ///
    /// # Errors
    ///
    /// - 값 목록이 비어 있으면 [`DoIfError::EmptyValues`]
    /// - `equal` 이외의 연산자에 null이 있으면 [`DoIfError::NullValue`]
    /// - 정규식 컴파일에 실패하면 [`DoIfError::InvalidRegex`]
    pub fn new(
        op: MatchOp,
        case_sensitive: bool,
        raw_values: &[Option<String>],
    ) -> Result<Self, DoIfError> {
        if raw_values.is_empty() {
            return Err(DoIfError::EmptyValues {
                op: op.as_str().to_owned(),
            });
        }

        let mut has_null = false;
        let mut values = Vec::with_capacity(raw_values.len());
        for value in raw_values {
            match value {
                None if op == MatchOp::Equal => has_null = true,
                None => {
                    return Err(DoIfError::NullValue {
                        op: op.as_str().to_owned(),
                    });
                }
                Some(s) if op == MatchOp::Regex || case_sensitive => {
                    values.push(s.as_bytes().to_vec());
                }
                Some(s) => values.push(s.as_bytes().to_ascii_lowercase()),
            }
        }

        let min_len = values.iter().map(Vec::len).min().unwrap_or(0);
        let max_len = values.iter().map(Vec::len).max().unwrap_or(0);

        let mut by_len: HashMap<usize, Vec<Vec<u8>>> = HashMap::new();
        let mut contains = None;
        let mut regexes = Vec::new();

        match op {
            MatchOp::Equal => {
                for value in &values {
                    by_len.entry(value.len()).or_default().push(value.clone());
                }
            }
            MatchOp::Contains => {
                let automaton = AhoCorasickBuilder::new()
                    .ascii_case_insensitive(!case_sensitive)
                    .build(&values)
                    .map_err(|e| DoIfError::Matcher(e.to_string()))?;
                contains = Some(automaton);
            }
            MatchOp::Regex => {
                for value in raw_values.iter().flatten() {
                    let re = Regex::new(value).map_err(|source| DoIfError::InvalidRegex {
                        pattern: value.clone(),
                        source,
                    })?;
                    regexes.push(re);
                }
            }
            MatchOp::Prefix | MatchOp::Suffix => {}
        }

        Ok(Self {
            op,
            case_sensitive,
            values,
            has_null,
            by_len,
            min_len,
            max_len,
            contains,
            regexes,
        })
    }

    /// 매칭 연산자
    pub fn op(&self) -> MatchOp {
        self.op
    }

    /// 후보를 검사합니다. `None`은 null 또는 누락된 필드입니다.
    pub fn check(&self, data: Option<&[u8]>) -> bool {
        let Some(data) = data else {
            return self.has_null;
        };

        match self.op {
            MatchOp::Equal => self.check_equal(data),
            MatchOp::Contains => self
                .contains
                .as_ref()
                .is_some_and(|automaton| automaton.is_match(data)),
            MatchOp::Prefix => {
                if data.len() < self.min_len {
                    return false;
                }
                let clipped = &data[..data.len().min(self.max_len)];
                self.values
                    .iter()
                    .any(|v| clipped.len() >= v.len() && self.bytes_eq(&clipped[..v.len()], v))
            }
            MatchOp::Suffix => {
                if data.len() < self.min_len {
                    return false;
                }
                let clipped = &data[data.len() - data.len().min(self.max_len)..];
                self.values.iter().any(|v| {
                    clipped.len() >= v.len()
                        && self.bytes_eq(&clipped[clipped.len() - v.len()..], v)
                })
            }
            MatchOp::Regex => self.regexes.iter().any(|re| re.is_match(data)),
        }
    }

    fn check_equal(&self, data: &[u8]) -> bool {
        if data.len() < self.min_len || data.len() > self.max_len {
            return false;
        }
        match self.by_len.get(&data.len()) {
            Some(bucket) => bucket.iter().any(|v| self.bytes_eq(data, v)),
            None => false,
        }
    }

    /// 값은 이미 소문자이므로 후보만 접어서 비교합니다.
    #[inline]
    fn bytes_eq(&self, candidate: &[u8], value: &[u8]) -> bool {
        if self.case_sensitive {
            candidate == value
        } else {
            candidate.eq_ignore_ascii_case(value)
        }
    }

    /// 구조 비교
    pub(crate) fn diff(&self, other: &Self, path: &str) -> Result<(), Mismatch> {
        ensure_eq(path, "op", &self.op, &other.op)?;
        ensure_eq(path, "case_sensitive", &self.case_sensitive, &other.case_sensitive)?;
        ensure_eq(path, "values", &self.values, &other.values)?;
        ensure_eq(path, "has_null", &self.has_null, &other.has_null)?;
        ensure_eq(path, "by_len", &self.by_len, &other.by_len)?;
        ensure_eq(path, "min_len", &self.min_len, &other.min_len)?;
        ensure_eq(path, "max_len", &self.max_len, &other.max_len)?;

        let lhs: Vec<&str> = self.regexes.iter().map(Regex::as_str).collect();
        let rhs: Vec<&str> = other.regexes.iter().map(Regex::as_str).collect();
        ensure_eq(path, "regexes", &lhs, &rhs)
    }
}
