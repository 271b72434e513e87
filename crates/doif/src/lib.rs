//! Logship DoIf -- JSON 이벤트 조건 트리
//!
//! 설정에서 한 번 빌드하고 이벤트마다 평가하는 작은 조건 언어입니다.
//! 액션의 `do_if`와 antispam 예외 규칙이 이 트리를 사용합니다.
//!
//! # 노드 종류
//!
//! | op | 노드 | 설명 |
//! |----|------|------|
//! | `equal`, `contains`, `prefix`, `suffix`, `regex` | 필드 | 필드 값을 문자열 매처로 검사 |
//! | `byte_len_cmp`, `array_len_cmp` | 길이 | 바이트 길이/배열 길이 비교 |
//! | `ts_cmp` | 타임스탬프 | 필드 시각을 현재 또는 고정 시각과 비교 |
//! | `check_type` | 타입 | 필드의 JSON 종류 검사 |
//! | `and`, `or`, `not` | 논리 | 하위 노드 결합 (단락 평가) |
//!
//! # 사용 예시
//!
//! ```
//! use logship_doif::Checker;
//! use serde_json::json;
//!
//! let checker = Checker::from_value(&json!({
//!     "op": "prefix",
//!     "field": "level",
//!     "values": ["err"],
//!     "case_sensitive": false,
//! }))
//! .unwrap();
//!
//! assert!(checker.check(Some(&json!({"level": "ERROR"}))));
//! assert!(!checker.check(Some(&json!({"level": "warn"}))));
//! ```
//!
//! 평가 중에는 에러가 없습니다. 필드 누락, 타입 불일치, 파싱 실패는 모두 `false`입니다.

pub mod checker;
pub mod cmp;
pub mod config;
pub mod duration;
pub mod error;
pub mod field;
mod node;
pub mod scratch;
pub mod str_matcher;

pub use checker::Checker;
pub use cmp::{CmpOp, Comparator};
pub use config::{NodeConfig, ValuesConfig};
pub use duration::parse_duration;
pub use error::{DoIfError, Mismatch};
pub use field::{FieldPath, NodeKind};
pub use scratch::{FieldScratch, FieldValueCache};
pub use str_matcher::{MatchOp, StringMatcher};
