//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logship_`
//! - 모듈명: `antispam_`, `pipeline_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logship_core::metrics::PIPELINE_EVENTS_IN_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소스 이름 레이블 키
pub const LABEL_SOURCE: &str = "source";

/// 예외 규칙 이름 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 드롭 사유 레이블 키 (antispam, discard)
pub const LABEL_REASON: &str = "reason";

// ─── Antispam 메트릭 ────────────────────────────────────────────────

/// Antispam: 가드 활성 상태 (gauge, 1 = active)
pub const ANTISPAM_ACTIVE: &str = "logship_antispam_active";

/// Antispam: 소스별 차단 상태 (gauge, label: source, 1 = banned)
pub const ANTISPAM_BANNED: &str = "logship_antispam_banned";

/// Antispam: 예외 규칙 매칭 수 (counter, label: rule)
pub const ANTISPAM_EXCEPTION_MATCHES_TOTAL: &str = "logship_antispam_exception_matches_total";

// ─── Pipeline 메트릭 ────────────────────────────────────────────────

/// Pipeline: 유입된 이벤트 수 (counter)
pub const PIPELINE_EVENTS_IN_TOTAL: &str = "logship_pipeline_events_in_total";

/// Pipeline: 출력된 이벤트 수 (counter)
pub const PIPELINE_EVENTS_OUT_TOTAL: &str = "logship_pipeline_events_out_total";

/// Pipeline: 드롭된 이벤트 수 (counter, label: reason)
pub const PIPELINE_EVENTS_DISCARDED_TOTAL: &str = "logship_pipeline_events_discarded_total";

/// Pipeline: JSON 디코딩 실패 수 (counter)
pub const PIPELINE_PARSE_ERRORS_TOTAL: &str = "logship_pipeline_parse_errors_total";

/// Pipeline: 이벤트 처리 지연 시간 (histogram, 초)
pub const PIPELINE_PROCESSING_DURATION_SECONDS: &str =
    "logship_pipeline_processing_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "logship_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "logship_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 이벤트 처리 지연 시간 히스토그램 버킷 (초)
///
/// 1us ~ 10ms 범위. 조건 평가는 I/O 없이 끝나므로 범위가 좁습니다.
pub const PROCESSING_DURATION_BUCKETS: [f64; 8] = [
    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.01,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `logship-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Antispam
    describe_gauge!(
        ANTISPAM_ACTIVE,
        "Whether the antispam guard is active (1) or disabled (0)"
    );
    describe_gauge!(
        ANTISPAM_BANNED,
        "Whether a source is currently banned by antispam (1) or not (0)"
    );
    describe_counter!(
        ANTISPAM_EXCEPTION_MATCHES_TOTAL,
        "Total number of events matched by each antispam exception rule"
    );

    // Pipeline
    describe_counter!(
        PIPELINE_EVENTS_IN_TOTAL,
        "Total number of events read from all inputs"
    );
    describe_counter!(
        PIPELINE_EVENTS_OUT_TOTAL,
        "Total number of events written to the output"
    );
    describe_counter!(
        PIPELINE_EVENTS_DISCARDED_TOTAL,
        "Total number of events dropped by antispam or discard actions"
    );
    describe_counter!(
        PIPELINE_PARSE_ERRORS_TOTAL,
        "Total number of input lines that were not valid JSON"
    );
    describe_histogram!(
        PIPELINE_PROCESSING_DURATION_SECONDS,
        "Time to run antispam and actions for a single event in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Logship daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        ANTISPAM_ACTIVE,
        ANTISPAM_BANNED,
        ANTISPAM_EXCEPTION_MATCHES_TOTAL,
        PIPELINE_EVENTS_IN_TOTAL,
        PIPELINE_EVENTS_OUT_TOTAL,
        PIPELINE_EVENTS_DISCARDED_TOTAL,
        PIPELINE_PARSE_ERRORS_TOTAL,
        PIPELINE_PROCESSING_DURATION_SECONDS,
        DAEMON_UPTIME_SECONDS,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_logship_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("logship_"),
                "Metric '{}' does not start with 'logship_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            ANTISPAM_EXCEPTION_MATCHES_TOTAL,
            PIPELINE_EVENTS_IN_TOTAL,
            PIPELINE_EVENTS_OUT_TOTAL,
            PIPELINE_EVENTS_DISCARDED_TOTAL,
            PIPELINE_PARSE_ERRORS_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{name}' lacks _total");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 설치되지 않은 상태에서도 패닉이 없어야 합니다
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_SOURCE, LABEL_RULE, LABEL_REASON] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn processing_duration_buckets_are_sorted() {
        let buckets = PROCESSING_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
