//! 필드 경로와 JSON 노드 탐색
//!
//! 경로는 `.`으로 구분하며 `\.`은 키 안의 리터럴 점입니다.
//! 빈 경로는 문서 루트를 가리킵니다.
//!
//! ```text
//! "k8s.pod"          -> ["k8s", "pod"]
//! "labels.app\.kind" -> ["labels", "app.kind"]
//! "items.0"          -> ["items", "0"]  (배열이면 인덱스로 해석)
//! ```

use std::fmt;
use std::io;

use serde_json::Value;

/// JSON 문서 내 위치
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// 경로 문자열을 파싱합니다.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::root();
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'.') => {
                    current.push('.');
                    chars.next();
                }
                '.' => segments.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        segments.push(current);

        Self {
            raw: raw.to_owned(),
            segments,
        }
    }

    /// 루트 경로
    pub fn root() -> Self {
        Self {
            raw: String::new(),
            segments: Vec::new(),
        }
    }

    /// 루트 경로인지 확인합니다.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// 경로 세그먼트
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// 원본 경로 문자열
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 문서에서 노드를 찾습니다. 경로가 해석되지 않으면 `None`입니다.
    pub fn dig<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(doc, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// 문서에서 노드를 제거합니다. 제거된 노드를 반환합니다.
    pub fn remove(&self, doc: &mut Value) -> Option<Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut node = doc;
        for segment in parents {
            node = match node {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        match node {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let idx = last.parse::<usize>().ok()?;
                (idx < items.len()).then(|| items.remove(idx))
            }
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 탐색 결과 노드의 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeKind {
    /// 경로가 해석되지 않음
    #[default]
    Absent,
    /// JSON null
    Null,
    /// true / false
    Bool,
    /// 숫자
    Number,
    /// 문자열
    String,
    /// 배열
    Array,
    /// 객체
    Object,
}

impl NodeKind {
    /// 노드의 종류를 판별합니다.
    pub fn of(node: Option<&Value>) -> Self {
        match node {
            None => NodeKind::Absent,
            Some(Value::Null) => NodeKind::Null,
            Some(Value::Bool(_)) => NodeKind::Bool,
            Some(Value::Number(_)) => NodeKind::Number,
            Some(Value::String(_)) => NodeKind::String,
            Some(Value::Array(_)) => NodeKind::Array,
            Some(Value::Object(_)) => NodeKind::Object,
        }
    }
}

/// 스칼라 노드의 바이트 표현을 `buf`에 씁니다.
///
/// 문자열은 이스케이프가 풀린 UTF-8, 숫자는 JSON 텍스트, bool은 `true`/`false`입니다.
/// null, 배열, 객체는 아무것도 쓰지 않습니다.
pub(crate) fn write_scalar(node: &Value, buf: &mut Vec<u8>) {
    match node {
        Value::String(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Number(n) => {
            use std::io::Write;
            // Vec<u8>에 대한 쓰기는 실패하지 않습니다
            let _ = write!(buf, "{n}");
        }
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        _ => {}
    }
}

/// 노드를 compact JSON으로 인코딩했을 때의 바이트 길이
///
/// 실제 버퍼를 만들지 않고 길이만 셉니다.
pub fn encoded_len(node: &Value) -> usize {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, node) {
        Ok(()) => counter.0,
        Err(_) => 0,
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_simple_path() {
        let path = FieldPath::parse("k8s.pod.name");
        assert_eq!(path.segments(), &["k8s", "pod", "name"]);
        assert_eq!(path.as_str(), "k8s.pod.name");
    }

    #[test]
    fn parse_escaped_dot() {
        let path = FieldPath::parse(r"labels.app\.kubernetes\.io");
        assert_eq!(path.segments(), &["labels", "app.kubernetes.io"]);
    }

    #[test]
    fn backslash_without_dot_is_kept() {
        let path = FieldPath::parse(r"a\b");
        assert_eq!(path.segments(), &[r"a\b"]);
    }

    #[test]
    fn empty_path_is_root() {
        let path = FieldPath::parse("");
        assert!(path.is_root());
        let doc = json!({"a": 1});
        assert_eq!(path.dig(&doc), Some(&doc));
    }

    #[test]
    fn dig_nested_object() {
        let doc = json!({"k8s": {"pod": "api-7f9c"}});
        let node = FieldPath::parse("k8s.pod").dig(&doc);
        assert_eq!(node, Some(&json!("api-7f9c")));
    }

    #[test]
    fn dig_array_index() {
        let doc = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(FieldPath::parse("items.1.id").dig(&doc), Some(&json!(2)));
        assert_eq!(FieldPath::parse("items.5.id").dig(&doc), None);
        assert_eq!(FieldPath::parse("items.x").dig(&doc), None);
    }

    #[test]
    fn dig_through_scalar_fails() {
        let doc = json!({"level": "error"});
        assert_eq!(FieldPath::parse("level.inner").dig(&doc), None);
    }

    #[test]
    fn remove_nested_field() {
        let mut doc = json!({"user": {"name": "kim", "password": "hunter2"}});
        let removed = FieldPath::parse("user.password").remove(&mut doc);
        assert_eq!(removed, Some(json!("hunter2")));
        assert_eq!(doc, json!({"user": {"name": "kim"}}));
        assert_eq!(FieldPath::parse("user.password").remove(&mut doc), None);
    }

    #[test]
    fn node_kind_of_values() {
        assert_eq!(NodeKind::of(None), NodeKind::Absent);
        assert_eq!(NodeKind::of(Some(&json!(null))), NodeKind::Null);
        assert_eq!(NodeKind::of(Some(&json!([1]))), NodeKind::Array);
        assert_eq!(NodeKind::of(Some(&json!({}))), NodeKind::Object);
        assert_eq!(NodeKind::of(Some(&json!(1.5))), NodeKind::Number);
    }

    #[test]
    fn scalar_bytes() {
        let mut buf = Vec::new();
        write_scalar(&json!("héllo"), &mut buf);
        assert_eq!(buf, "héllo".as_bytes());

        buf.clear();
        write_scalar(&json!(42), &mut buf);
        assert_eq!(buf, b"42");

        buf.clear();
        write_scalar(&json!(false), &mut buf);
        assert_eq!(buf, b"false");
    }

    #[test]
    fn encoded_len_matches_serialization() {
        let node = json!({"a": [1, 2, {"b": "c"}], "d": null});
        assert_eq!(encoded_len(&node), serde_json::to_vec(&node).unwrap().len());
    }
}
