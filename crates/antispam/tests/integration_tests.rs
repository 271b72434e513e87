//! 통합 테스트 -- 차단/해제 상태 전이와 예외 규칙 검증

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use proptest::prelude::*;
use serde_json::json;

use logship_antispam::{Antispammer, GuardConfigBuilder};
use logship_core::config::{AntispamConfig, ExceptionRuleConfig};

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::milliseconds(ms)
}

fn guard(threshold: i64, unban_iterations: u32) -> Antispammer {
    let config = GuardConfigBuilder::new()
        .threshold(threshold)
        .unban_iterations(unban_iterations)
        .maintenance_interval(Duration::from_secs(5))
        .build()
        .expect("valid config");
    Antispammer::new(&config).expect("guard")
}

fn rule(name: &str, threshold: i64, condition: serde_json::Value) -> ExceptionRuleConfig {
    ExceptionRuleConfig {
        name: name.to_owned(),
        threshold,
        check_source_name: false,
        meta_key: None,
        condition,
    }
}

/// threshold=5, unban_iterations=2
#[test]
fn test_ban_then_unban_after_two_sweeps() {
    let g = guard(5, 2);
    let meta = HashMap::new();

    for i in 0..4 {
        assert!(!g.is_spam(1, "s", false, b"{}", at(i), &meta), "event {}", i + 1);
    }
    assert!(g.is_spam(1, "s", false, b"{}", at(4), &meta));
    assert!(g.is_banned(1));

    g.maintenance();
    assert!(g.is_banned(1), "still banned after sweep 1");

    g.maintenance();
    assert!(!g.is_banned(1), "unbanned after sweep 2");
    assert_eq!(g.tracked(), 0);
}

#[test]
fn test_sources_are_independent() {
    let g = guard(3, 1);
    let meta = HashMap::new();

    for i in 0..3 {
        g.is_spam(1, "noisy", false, b"{}", at(i), &meta);
    }
    assert!(g.is_banned(1));
    assert!(!g.is_spam(2, "quiet", false, b"{}", at(3), &meta));
    assert!(!g.is_banned(2));
}

#[test]
fn test_new_source_grace() {
    let g = guard(2, 2);
    let meta = HashMap::new();

    assert!(!g.is_spam(1, "s", false, b"{}", at(0), &meta));
    assert!(g.is_spam(1, "s", false, b"{}", at(1), &meta));

    // 파일 로테이션 등으로 소스가 새로 열리면 카운터 초기화
    assert!(!g.is_spam(1, "s", true, b"{}", at(2), &meta));
    assert!(!g.is_spam(1, "s", false, b"{}", at(3), &meta));
}

#[test]
fn test_exception_unlimited_bypasses_counting() {
    let config = GuardConfigBuilder::new()
        .threshold(1)
        .exception(rule(
            "healthcheck",
            -1,
            json!({"op": "contains", "values": ["/healthz"]}),
        ))
        .build()
        .unwrap();
    let g = Antispammer::new(&config).unwrap();
    let meta = HashMap::new();

    for i in 0..10 {
        assert!(!g.is_spam(1, "s", false, br#"{"path":"/healthz"}"#, at(i), &meta));
    }
    assert_eq!(g.source_counter(1), None);
    assert!(g.is_spam(1, "s", false, br#"{"path":"/"}"#, at(11), &meta));
}

#[test]
fn test_exception_block_forces_spam() {
    let config = GuardConfigBuilder::new()
        .exception(rule("debug", 0, json!({"op": "prefix", "values": ["DEBUG"]})))
        .build()
        .unwrap();
    let g = Antispammer::new(&config).unwrap();
    assert!(!g.is_disabled());

    let meta = HashMap::new();
    assert!(g.is_spam(1, "s", false, b"DEBUG noisy", at(0), &meta));
    assert!(!g.is_spam(1, "s", false, b"INFO ok", at(1), &meta));
}

#[test]
fn test_exception_limit_uses_shared_bucket() {
    let config = GuardConfigBuilder::new()
        .threshold(-1)
        .unban_iterations(1)
        .exception(rule(
            "audit",
            3,
            json!({"op": "contains", "values": ["audit"]}),
        ))
        .build()
        .unwrap();
    let g = Antispammer::new(&config).unwrap();
    let meta = HashMap::new();

    assert!(!g.is_spam(1, "a", false, b"audit 1", at(0), &meta));
    assert!(!g.is_spam(2, "b", false, b"audit 2", at(1), &meta));
    assert!(g.is_spam(3, "c", false, b"audit 3", at(2), &meta));
    assert_eq!(g.rule_counter("audit"), Some(3));
    assert_eq!(g.source_counter(1), None);

    // 규칙에 매칭되지 않는 이벤트는 전역 무제한
    assert!(!g.is_spam(1, "a", false, b"hello", at(3), &meta));

    g.maintenance();
    assert_eq!(g.rule_counter("audit"), None);
}

#[test]
fn test_first_matching_rule_wins() {
    let config = GuardConfigBuilder::new()
        .threshold(100)
        .exception(rule("allow", -1, json!({"op": "contains", "values": ["vip"]})))
        .exception(rule("deny", 0, json!({"op": "contains", "values": ["spam"]})))
        .build()
        .unwrap();
    let g = Antispammer::new(&config).unwrap();
    let meta = HashMap::new();

    assert!(!g.is_spam(1, "s", false, b"vip spam", at(0), &meta));
    assert!(g.is_spam(1, "s", false, b"spam", at(1), &meta));
}

#[test]
fn test_rule_on_source_name_and_meta() {
    let mut by_name = rule("k8s", -1, json!({"op": "suffix", "values": [".k8s.log"]}));
    by_name.check_source_name = true;

    let mut by_meta = rule("ns", 0, json!({"op": "equal", "values": ["kube-system"]}));
    by_meta.meta_key = Some("namespace".to_owned());

    let config = GuardConfigBuilder::new()
        .threshold(1)
        .exception(by_name)
        .exception(by_meta)
        .build()
        .unwrap();
    let g = Antispammer::new(&config).unwrap();

    let empty = HashMap::new();
    let mut meta = HashMap::new();
    meta.insert("namespace".to_owned(), "kube-system".to_owned());

    assert!(!g.is_spam(1, "/var/log/app.k8s.log", false, b"x", at(0), &meta));
    assert!(g.is_spam(2, "/var/log/app.log", false, b"x", at(1), &meta));
    assert!(g.is_spam(3, "/var/log/other.log", false, b"x", at(2), &empty));
}

#[test]
fn test_from_core_config() {
    let core = AntispamConfig {
        threshold: 2,
        unban_iterations: 1,
        maintenance_interval_secs: 1,
        exceptions: vec![],
    };
    let g = Antispammer::from_core(&core).unwrap();
    let meta = HashMap::new();
    assert!(!g.is_spam(9, "s", false, b"x", at(0), &meta));
    assert!(g.is_spam(9, "s", false, b"x", at(10), &meta));
}

#[test]
fn test_invalid_rule_condition_fails_build() {
    let config = GuardConfigBuilder::new()
        .exception(rule("bad", -1, json!({"op": "nope"})))
        .build()
        .unwrap();
    let err = Antispammer::new(&config).unwrap_err();
    assert!(err.to_string().contains("'bad'"));
}

#[test]
fn test_concurrent_sources() {
    let g = Arc::new(guard(1_000, 2));

    let handles: Vec<_> = (0..4u64)
        .map(|id| {
            let g = Arc::clone(&g);
            thread::spawn(move || {
                let meta = HashMap::new();
                for i in 0..500 {
                    assert!(!g.is_spam(id, "s", false, b"x", at(i), &meta));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    for id in 0..4 {
        assert_eq!(g.source_counter(id), Some(500));
    }
}

proptest! {
    /// 임계값에 한 번 도달한 뒤 조용해진 소스는 정확히 U번째 sweep에서 해제
    #[test]
    fn prop_hysteresis(threshold in 1i64..20, unban_iterations in 1u32..6) {
        let g = guard(threshold, unban_iterations);
        let meta = HashMap::new();

        for i in 0..threshold {
            g.is_spam(1, "s", false, b"x", at(i), &meta);
        }
        prop_assert!(g.is_banned(1));

        for sweep in 1..unban_iterations {
            g.maintenance();
            prop_assert!(g.is_banned(1), "banned after sweep {}", sweep);
        }
        g.maintenance();
        prop_assert!(!g.is_banned(1));
    }
}
