//! 조건 트리 평가 벤치마크
//!
//! 단일 리프, 공유 필드를 참조하는 트리, 원시 바이트 평가의 처리량을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};

use logship_doif::{Checker, MatchOp, StringMatcher};

fn sample_event() -> Value {
    json!({
        "time": "2024-01-15T12:00:00.123456Z",
        "level": "error",
        "service": "api-gateway",
        "message": "upstream connect error or disconnect/reset before headers",
        "k8s": {"namespace": "prod", "pod": "api-gateway-7f9c-xk2p", "labels": {"app": "api"}},
        "tags": ["edge", "eu-west-1"]
    })
}

fn bench_equal_buckets(c: &mut Criterion) {
    let mut group = c.benchmark_group("equal_matcher");

    for count in [1usize, 16, 256] {
        let values: Vec<Option<String>> = (0..count).map(|i| Some(format!("service-{i:04}"))).collect();
        let matcher = StringMatcher::new(MatchOp::Equal, true, &values).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("miss_same_len", count), &matcher, |b, m| {
            b.iter(|| m.check(black_box(Some(&b"service-9999"[..]))))
        });
        group.bench_with_input(BenchmarkId::new("miss_other_len", count), &matcher, |b, m| {
            b.iter(|| m.check(black_box(Some(&b"api-gateway"[..]))))
        });
    }

    group.finish();
}

fn bench_tree(c: &mut Criterion) {
    let checker = Checker::from_value(&json!({
        "op": "and",
        "operands": [
            {"op": "equal", "field": "k8s.namespace", "values": ["prod", "staging"]},
            {"op": "or", "operands": [
                {"op": "prefix", "field": "level", "values": ["err", "fatal"], "case_sensitive": false},
                {"op": "contains", "field": "message", "values": ["timeout", "reset"]}
            ]},
            {"op": "byte_len_cmp", "field": "message", "cmp_op": "lt", "value": 4096},
            {"op": "ts_cmp", "field": "time", "cmp_op": "lt", "value": "now"}
        ]
    }))
    .unwrap();
    let event = sample_event();

    let mut group = c.benchmark_group("tree");
    group.throughput(Throughput::Elements(1));

    let mut scratch = checker.new_scratch();
    group.bench_function("check_with_owned_scratch", |b| {
        b.iter(|| checker.check_with(black_box(&event), &mut scratch))
    });
    group.bench_function("check_proc_cache", |b| {
        b.iter(|| checker.check_proc(1, black_box(Some(&event))))
    });

    group.throughput(Throughput::Elements(1000));
    group.bench_function("throughput_1000", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                checker.check_with(black_box(&event), &mut scratch);
            }
        })
    });

    group.finish();
}

fn bench_raw(c: &mut Criterion) {
    let checker = Checker::from_raw_value(&json!({
        "op": "or",
        "operands": [
            {"op": "contains", "values": ["healthcheck", "readiness", "liveness"], "case_sensitive": false},
            {"op": "regex", "values": ["^GET /metrics"]}
        ]
    }))
    .unwrap();
    let line = br#"{"level":"info","message":"GET /api/v1/users 200 12ms"}"#;

    c.bench_function("raw_contains_regex", |b| {
        b.iter(|| checker.check_raw(black_box(line)))
    });
}

criterion_group!(benches, bench_equal_buckets, bench_tree, bench_raw);
criterion_main!(benches);
