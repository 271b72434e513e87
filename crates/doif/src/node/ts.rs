//! 타임스탬프 비교 리프
//!
//! 필드 문자열을 `format`으로 파싱해 우변 시각과 비교합니다.
//! 우변은 평가마다 읽는 현재 시각(`now`) 또는 빌드 시 고정된 시각입니다.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use crate::cmp::CmpOp;
use crate::error::{DoIfError, Mismatch, ensure_eq};
use crate::field::NodeKind;
use crate::scratch::FieldRef;

use super::Input;

/// 기본 형식 이름
pub(crate) const DEFAULT_FORMAT: &str = "rfc3339nano";

/// 시각 형식
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TsLayout {
    /// RFC 3339 (소수 초 선택)
    Rfc3339,
    /// chrono strftime 패턴
    Pattern(String),
}

impl TsLayout {
    /// 형식 이름 또는 별칭을 해석합니다. 별칭이 아니면 strftime 패턴으로 취급합니다.
    ///
    /// chrono가 해석하지 못하는 지정자가 있으면 빌드 에러입니다.
    pub(crate) fn resolve(format: &str) -> Result<Self, DoIfError> {
        let pattern = match format.to_ascii_lowercase().as_str() {
            "" | "rfc3339nano" | "rfc3339" => return Ok(Self::Rfc3339),
            "ansic" => "%a %b %e %H:%M:%S %Y",
            "unixdate" => "%a %b %e %H:%M:%S %Z %Y",
            "rubydate" => "%a %b %d %H:%M:%S %z %Y",
            "rfc822" => "%d %b %y %H:%M %Z",
            "rfc822z" => "%d %b %y %H:%M %z",
            "rfc850" => "%A, %d-%b-%y %H:%M:%S %Z",
            "rfc1123" => "%a, %d %b %Y %H:%M:%S %Z",
            "rfc1123z" => "%a, %d %b %Y %H:%M:%S %z",
            "kitchen" => "%I:%M%p",
            "datetime" => "%Y-%m-%d %H:%M:%S",
            "dateonly" => "%Y-%m-%d",
            "timeonly" => "%H:%M:%S",
            _ => format,
        };
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return Err(DoIfError::InvalidTimestamp {
                value: format.to_owned(),
                reason: "invalid format".to_owned(),
            });
        }
        Ok(Self::Pattern(pattern.to_owned()))
    }

    /// 문자열을 UTC 시각으로 파싱합니다.
    ///
    /// 오프셋이 없는 형식은 UTC로, 날짜가 없는 형식은 0000-01-01로 읽습니다.
    pub(crate) fn parse(&self, input: &str) -> Option<DateTime<Utc>> {
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Self::Pattern(fmt) => {
                if let Ok(t) = DateTime::parse_from_str(input, fmt) {
                    return Some(t.with_timezone(&Utc));
                }
                if let Ok(t) = NaiveDateTime::parse_from_str(input, fmt) {
                    return Some(t.and_utc());
                }
                if let Ok(d) = NaiveDate::parse_from_str(input, fmt) {
                    return Some(d.and_time(NaiveTime::MIN).and_utc());
                }
                let t = NaiveTime::parse_from_str(input, fmt).ok()?;
                NaiveDate::from_ymd_opt(0, 1, 1).map(|d| d.and_time(t).and_utc())
            }
        }
    }
}

/// 비교 우변
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TsRhs {
    /// 평가 시점의 현재 시각 + shift
    Now,
    /// 빌드 시 고정된 시각 (shift 적용 완료)
    Explicit(DateTime<Utc>),
}

#[derive(Debug)]
pub(crate) struct TsNode {
    pub(crate) field: FieldRef,
    /// 설정에 적힌 형식 이름
    pub(crate) format: String,
    pub(crate) layout: TsLayout,
    pub(crate) cmp: CmpOp,
    pub(crate) rhs: TsRhs,
    pub(crate) value_shift: TimeDelta,
    /// 구조 비교에만 쓰입니다
    pub(crate) update_interval: TimeDelta,
}

impl TsNode {
    /// 우변 상수를 해석합니다. `now`가 아니면 형식에 맞춰 파싱하고 shift를 적용합니다.
    pub(crate) fn resolve_rhs(
        value: &str,
        layout: &TsLayout,
        shift: TimeDelta,
    ) -> Result<TsRhs, DoIfError> {
        if value == "now" {
            return Ok(TsRhs::Now);
        }

        let parsed = layout
            .parse(value)
            .or_else(|| TsLayout::Rfc3339.parse(value))
            .ok_or_else(|| DoIfError::InvalidTimestamp {
                value: value.to_owned(),
                reason: "does not match format".to_owned(),
            })?;
        parsed
            .checked_add_signed(shift)
            .map(TsRhs::Explicit)
            .ok_or_else(|| DoIfError::InvalidTimestamp {
                value: value.to_owned(),
                reason: "value_shift out of range".to_owned(),
            })
    }

    pub(crate) fn check(&self, input: &mut Input<'_>) -> bool {
        let lhs = match input {
            Input::Doc { doc, scratch } => {
                let slot = scratch.slot(&self.field, *doc);
                if slot.kind != NodeKind::String {
                    return false;
                }
                std::str::from_utf8(&slot.bytes)
                    .ok()
                    .and_then(|s| self.layout.parse(s))
            }
            Input::Raw(data) => std::str::from_utf8(data)
                .ok()
                .and_then(|s| self.layout.parse(s)),
        };
        let Some(lhs) = lhs else {
            return false;
        };

        let rhs = match &self.rhs {
            TsRhs::Now => Utc::now() + self.value_shift,
            TsRhs::Explicit(t) => *t,
        };
        self.cmp.apply(&lhs, &rhs)
    }

    pub(crate) fn diff(&self, other: &Self, path: &str) -> Result<(), Mismatch> {
        ensure_eq(path, "field", &self.field.path, &other.field.path)?;
        ensure_eq(path, "format", &self.format, &other.format)?;
        ensure_eq(path, "cmp_op", &self.cmp, &other.cmp)?;
        ensure_eq(path, "value", &self.rhs, &other.rhs)?;
        ensure_eq(path, "value_shift", &self.value_shift, &other.value_shift)?;
        ensure_eq(
            path,
            "update_interval",
            &self.update_interval,
            &other.update_interval,
        )
    }
}
