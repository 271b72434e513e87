//! 기간 문자열 파싱
//!
//! `value_shift`, `update_interval` 설정 값을 파싱합니다.
//! 형식은 부호(선택)와 `<숫자><단위>` 조각의 나열입니다.
//!
//! ```text
//! "1h30m"   -> 5400s
//! "-15m"    -> -900s
//! "1.5s"    -> 1500ms
//! "0"       -> 0
//! ```
//!
//! 단위: `ns`, `us` (`µs`, `μs`), `ms`, `s`, `m`, `h`

use chrono::TimeDelta;

use crate::error::DoIfError;

/// 기간 문자열을 [`TimeDelta`]로 파싱합니다.
pub fn parse_duration(input: &str) -> Result<TimeDelta, DoIfError> {
    let invalid = |reason: &str| DoIfError::InvalidDuration {
        value: input.to_owned(),
        reason: reason.to_owned(),
    };

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total_nanos: i128 = 0;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..num_end];
        if number.is_empty() || number == "." {
            return Err(invalid("expected number"));
        }
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let scale: i128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid(&format!("unknown unit '{unit}'"))),
        };

        total_nanos += scale_number(number, scale).ok_or_else(|| invalid("number out of range"))?;
        if total_nanos > i64::MAX as i128 {
            return Err(invalid("duration out of range"));
        }
    }

    let nanos = if negative { -total_nanos } else { total_nanos };
    Ok(TimeDelta::nanoseconds(nanos as i64))
}

/// `"1.25"` * scale을 정수 나노초로 계산합니다. 단위 미만 자릿수는 버립니다.
fn scale_number(number: &str, scale: i128) -> Option<i128> {
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    if frac_part.contains('.') {
        return None;
    }

    let int: i128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut value = int.checked_mul(scale)?;

    let mut divisor: i128 = 1;
    for digit in frac_part.bytes() {
        divisor = divisor.checked_mul(10)?;
        if divisor > scale {
            break;
        }
        value += i128::from(digit - b'0') * scale / divisor;
    }
    Some(value)
}
