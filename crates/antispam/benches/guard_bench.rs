//! Antispam 판단 벤치마크
//!
//! 비활성 가드의 fast path, 기존 소스 조회, 예외 규칙 평가 비용을 측정합니다.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;

use logship_antispam::{Antispammer, GuardConfigBuilder};
use logship_core::config::ExceptionRuleConfig;

const EVENT: &[u8] = br#"{"level":"info","path":"/api/v1/users","status":200}"#;

fn bench_is_spam(c: &mut Criterion) {
    let meta = HashMap::new();
    let now = Utc::now();

    let disabled = Antispammer::new(&GuardConfigBuilder::new().build().unwrap()).unwrap();
    let limited = Antispammer::new(
        &GuardConfigBuilder::new()
            .threshold(i64::MAX)
            .maintenance_interval(Duration::from_secs(3600))
            .build()
            .unwrap(),
    )
    .unwrap();
    let with_rules = Antispammer::new(
        &GuardConfigBuilder::new()
            .threshold(i64::MAX)
            .exception(ExceptionRuleConfig {
                name: "health".to_owned(),
                threshold: -1,
                check_source_name: false,
                meta_key: None,
                condition: json!({"op": "contains", "values": ["/healthz", "/readyz"]}),
            })
            .build()
            .unwrap(),
    )
    .unwrap();

    let mut group = c.benchmark_group("is_spam");
    group.throughput(Throughput::Elements(1));

    group.bench_function("disabled", |b| {
        b.iter(|| disabled.is_spam(1, "app.log", false, black_box(EVENT), now, &meta))
    });
    group.bench_function("existing_source", |b| {
        b.iter(|| limited.is_spam(black_box(1), "app.log", false, EVENT, now, &meta))
    });
    group.bench_function("with_exception_rule", |b| {
        b.iter(|| with_rules.is_spam(1, "app.log", false, black_box(EVENT), now, &meta))
    });

    group.finish();
}

fn bench_maintenance(c: &mut Criterion) {
    let meta = HashMap::new();
    let now = Utc::now();
    let guard = Antispammer::new(&GuardConfigBuilder::new().threshold(10).build().unwrap()).unwrap();

    c.bench_function("maintenance_1000_sources", |b| {
        b.iter(|| {
            for id in 0..1000 {
                guard.is_spam(id, "src", false, EVENT, now, &meta);
            }
            guard.maintenance();
        })
    });
}

criterion_group!(benches, bench_is_spam, bench_maintenance);
criterion_main!(benches);
