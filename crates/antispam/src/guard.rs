//! Antispam 가드
//!
//! 소스별 카운터로 유지보수 주기당 유입량을 세고, 임계값을 넘은 소스를 차단합니다.
//!
//! # 상태 전이
//!
//! ```text
//!  Unbanned --(주기 안에서 카운터가 임계값 도달)--> Banned
//!     ^                                              |
//!     +------(유지보수 sweep으로 임계값 미만 감소)-------+
//! ```
//!
//! 차단 시 카운터를 `unban_iterations * threshold`로 올려 두므로
//! 유입이 즉시 멈춰도 `unban_iterations`번의 sweep 동안 차단이 유지됩니다.
//!
//! # 동시성
//!
//! 소스 맵은 `RwLock`으로 보호합니다. `is_spam`은 읽기 잠금으로 기존 레코드를 찾고
//! 처음 보는 소스일 때만 쓰기 잠금을 잡습니다. 카운터와 타임스탬프는 원자 변수입니다.
//! `maintenance`는 sweep 전체 동안 쓰기 잠금을 유지하며 레코드를 제거하는 유일한 연산입니다.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use parking_lot::RwLock;
use tracing::{debug, info};

use logship_core::config::AntispamConfig;
use logship_core::metrics as m;

use crate::config::GuardConfig;
use crate::error::AntispamError;
use crate::rule::{ExceptionRule, Threshold};

/// 카운터 레코드 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum RecordKey {
    /// 소스 ID
    Source(u64),
    /// 예외 규칙 버킷 (규칙 인덱스). 규칙에 매칭된 모든 소스가 공유합니다.
    Rule(usize),
}

#[derive(Debug)]
struct SourceRecord {
    counter: AtomicU64,
    /// 마지막 이벤트 시각 (유닉스 나노초)
    timestamp: AtomicI64,
    /// 이 레코드에 적용되는 임계값 (sweep 감쇠량)
    threshold: u64,
    name: String,
}

impl SourceRecord {
    fn new(name: &str, threshold: u64, timestamp: i64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            timestamp: AtomicI64::new(timestamp),
            threshold,
            name: name.to_owned(),
        }
    }
}

/// 소스별 유입 제한 가드
#[derive(Debug)]
pub struct Antispammer {
    threshold: Threshold,
    unban_iterations: u64,
    maintenance_interval_ns: i64,
    rules: Vec<ExceptionRule>,
    disabled: bool,
    sources: RwLock<HashMap<RecordKey, SourceRecord>>,
}

impl Antispammer {
    /// 가드를 생성합니다.
    pub fn new(config: &GuardConfig) -> Result<Self, AntispamError> {
        config.validate()?;

        let threshold = Threshold::from_raw(config.threshold)?;
        let rules = config
            .exceptions
            .iter()
            .map(ExceptionRule::from_core)
            .collect::<Result<Vec<_>, _>>()?;
        let disabled = threshold == Threshold::Unlimited && rules.is_empty();
        let maintenance_interval_ns =
            i64::try_from(config.maintenance_interval.as_nanos()).unwrap_or(i64::MAX);

        gauge!(m::ANTISPAM_ACTIVE).set(if disabled { 0.0 } else { 1.0 });
        if disabled {
            debug!("antispam disabled");
        } else {
            info!(
                threshold = %threshold,
                unban_iterations = config.unban_iterations,
                maintenance_interval_ms = config.maintenance_interval.as_millis() as u64,
                rules = rules.len(),
                "antispam enabled"
            );
        }

        Ok(Self {
            threshold,
            unban_iterations: u64::from(config.unban_iterations),
            maintenance_interval_ns,
            rules,
            disabled,
            sources: RwLock::new(HashMap::new()),
        })
    }

    /// core 설정에서 가드를 생성합니다.
    pub fn from_core(core: &AntispamConfig) -> Result<Self, AntispamError> {
        Self::new(&GuardConfig::from_core(core))
    }

    /// 가드가 비활성 상태인지 확인합니다.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// 이벤트를 스팸으로 판단해 드롭해야 하는지 확인합니다.
    ///
    /// - `is_new_source`: 호출자가 새로 연 소스의 첫 이벤트임을 알리는 플래그.
    ///   카운터를 0으로 되돌리고 `false`를 반환합니다.
    /// - `event_time`: 이벤트에 기록된 시각. 재처리 시에도 판단이 같도록 벽시계 대신 사용합니다.
    pub fn is_spam(
        &self,
        source_id: u64,
        source_name: &str,
        is_new_source: bool,
        event: &[u8],
        event_time: DateTime<Utc>,
        meta: &HashMap<String, String>,
    ) -> bool {
        if self.disabled {
            return false;
        }

        let mut threshold = self.threshold;
        let mut key = RecordKey::Source(source_id);
        let mut name = source_name;

        if let Some((idx, rule)) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(event, source_name, meta))
        {
            counter!(m::ANTISPAM_EXCEPTION_MATCHES_TOTAL, m::LABEL_RULE => rule.name().to_owned())
                .increment(1);
            match rule.threshold() {
                Threshold::Unlimited => return false,
                Threshold::Block => return true,
                limit @ Threshold::Limit(_) => {
                    threshold = limit;
                    key = RecordKey::Rule(idx);
                    name = rule.name();
                }
            }
        }

        let limit = match threshold {
            Threshold::Unlimited => return false,
            Threshold::Block => return true,
            Threshold::Limit(limit) => limit,
        };

        let timestamp = event_time.timestamp_nanos_opt().unwrap_or(i64::MAX);
        self.with_record(key, name, limit, timestamp, |record| {
            if is_new_source {
                if let RecordKey::Source(_) = key {
                    let prev = record.counter.swap(0, Ordering::Relaxed);
                    record.timestamp.store(timestamp, Ordering::Relaxed);
                    if prev >= record.threshold {
                        unban(record);
                    }
                }
                return false;
            }

            let last = record.timestamp.swap(timestamp, Ordering::Relaxed);
            let current = if timestamp.saturating_sub(last) < self.maintenance_interval_ns {
                let prev = record.counter.fetch_add(1, Ordering::Relaxed);
                if prev < limit && prev + 1 >= limit {
                    self.ban(record, limit);
                }
                prev + 1
            } else {
                record.counter.load(Ordering::Relaxed)
            };

            current >= limit
        })
    }

    fn ban(&self, record: &SourceRecord, limit: u64) {
        record
            .counter
            .fetch_max(self.unban_iterations.saturating_mul(limit), Ordering::Relaxed);
        gauge!(m::ANTISPAM_BANNED, m::LABEL_SOURCE => record.name.clone()).set(1.0);
        info!(
            source = %record.name,
            threshold = limit,
            "source banned by antispam"
        );
    }

    /// 기존 레코드는 읽기 잠금으로, 새 레코드는 쓰기 잠금으로 접근합니다.
    fn with_record<R>(
        &self,
        key: RecordKey,
        name: &str,
        threshold: u64,
        timestamp: i64,
        f: impl FnOnce(&SourceRecord) -> R,
    ) -> R {
        {
            let sources = self.sources.read();
            if let Some(record) = sources.get(&key) {
                return f(record);
            }
        }

        let mut sources = self.sources.write();
        let record = sources
            .entry(key)
            .or_insert_with(|| SourceRecord::new(name, threshold, timestamp));
        f(record)
    }

    /// 유지보수 sweep
    ///
    /// 모든 레코드의 카운터에서 임계값을 빼고(0 하한), `unban_iterations * threshold`로 상한을 둡니다.
    /// 임계값 미만으로 떨어진 소스는 차단 해제되고, 0이 된 레코드는 제거됩니다.
    pub fn maintenance(&self) {
        if self.disabled {
            return;
        }

        let mut sources = self.sources.write();
        let before = sources.len();

        sources.retain(|_, record| {
            let limit = record.threshold;
            let current = record.counter.load(Ordering::Relaxed);
            let next = current
                .saturating_sub(limit)
                .min(self.unban_iterations.saturating_mul(limit));
            record.counter.store(next, Ordering::Relaxed);

            if current >= limit && next < limit {
                unban(record);
            }
            next > 0
        });

        debug!(
            tracked = sources.len(),
            removed = before - sources.len(),
            "antispam maintenance done"
        );
    }

    /// 추적 중인 레코드 수 (소스 + 규칙 버킷)
    pub fn tracked(&self) -> usize {
        self.sources.read().len()
    }

    /// 소스의 현재 카운터. 추적 중이 아니면 `None`입니다.
    pub fn source_counter(&self, source_id: u64) -> Option<u64> {
        self.sources
            .read()
            .get(&RecordKey::Source(source_id))
            .map(|r| r.counter.load(Ordering::Relaxed))
    }

    /// 예외 규칙 버킷의 현재 카운터
    pub fn rule_counter(&self, rule_name: &str) -> Option<u64> {
        let idx = self.rules.iter().position(|r| r.name() == rule_name)?;
        self.sources
            .read()
            .get(&RecordKey::Rule(idx))
            .map(|r| r.counter.load(Ordering::Relaxed))
    }

    /// 소스가 현재 차단 상태인지 확인합니다.
    pub fn is_banned(&self, source_id: u64) -> bool {
        self.sources
            .read()
            .get(&RecordKey::Source(source_id))
            .is_some_and(|r| r.counter.load(Ordering::Relaxed) >= r.threshold)
    }

    /// 추적 중인 레코드를 사람이 읽을 수 있는 형태로 출력합니다.
    pub fn dump(&self) -> String {
        let sources = self.sources.read();
        let mut keys: Vec<&RecordKey> = sources.keys().collect();
        keys.sort();

        let mut out = String::from("antispam sources:\n");
        for key in keys {
            let record = &sources[key];
            let counter = record.counter.load(Ordering::Relaxed);
            let kind = match key {
                RecordKey::Source(id) => format!("source#{id}"),
                RecordKey::Rule(_) => "rule".to_owned(),
            };
            let _ = writeln!(
                out,
                "  {kind} {name}: counter={counter} threshold={threshold} banned={banned}",
                name = record.name,
                threshold = record.threshold,
                banned = counter >= record.threshold,
            );
        }
        out
    }
}

fn unban(record: &SourceRecord) {
    gauge!(m::ANTISPAM_BANNED, m::LABEL_SOURCE => record.name.clone()).set(0.0);
    info!(source = %record.name, "source unbanned by antispam");
}
