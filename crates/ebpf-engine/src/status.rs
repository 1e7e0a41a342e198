//! 상태 집계 — CPU별 카운터 합산 및 보고서 구성
//!
//! 카운터 테이블은 CPU마다 복제본을 가지므로 대상 하나의 논리 값은
//! 모든 복제본의 합입니다.
//!
//! # 데이터 흐름
//! ```text
//! LruPerCpuHashMap (kernel) ──iter──▶ (addr, [TargetCounters; ncpu]) ──sum──▶ TargetStatsRow
//! LpmTrie (kernel)          ──keys──▶ BlockKey                       ──fmt──▶ "a.b.c.d/n"
//! ```
//!
//! 어느 한 테이블의 순회가 실패하면 로그를 남기고 해당 섹션만 비웁니다.

use tracing::warn;
use xdpwall_core::api::TargetStatsRow;
use xdpwall_core::metrics as m;

use crate::blocklist::BlocklistState;
use crate::table::{CounterTable, TargetCounters};

/// CPU별 복제본을 합산합니다.
pub fn aggregate(replicas: &[TargetCounters]) -> TargetCounters {
    replicas
        .iter()
        .fold(TargetCounters::default(), |mut total, replica| {
            total.accumulate(replica);
            total
        })
}

/// 카운터 테이블을 한 번 순회하여 대상별 합산 행을 만듭니다 (주소 순 정렬).
///
/// 순회 에러 시 빈 목록을 반환합니다.
pub fn collect_stats(counters: &dyn CounterTable) -> Vec<TargetStatsRow> {
    let entries = match counters.entries().collect::<Result<Vec<_>, _>>() {
        Ok(entries) => entries,
        Err(e) => {
            warn!(table = counters.name(), error = %e, "failed to iterate counter table");
            return Vec::new();
        }
    };

    let mut rows: Vec<_> = entries
        .into_iter()
        .map(|(addr, replicas)| (addr, aggregate(&replicas)))
        .collect();
    rows.sort_by_key(|(addr, _)| *addr);

    let (packets, bytes) = rows.iter().fold((0u64, 0u64), |(p, b), (_, c)| {
        (
            p.saturating_add(c.src_packets).saturating_add(c.dst_packets),
            b.saturating_add(c.src_bytes).saturating_add(c.dst_bytes),
        )
    });
    metrics::gauge!(m::COUNTERS_DROPPED_PACKETS).set(packets as f64);
    metrics::gauge!(m::COUNTERS_DROPPED_BYTES).set(bytes as f64);

    rows.into_iter()
        .map(|(addr, total)| TargetStatsRow {
            target: addr.to_string(),
            src_count: total.src_packets,
            src_bytes_dropped: total.src_bytes,
            dst_count: total.dst_packets,
            dst_bytes_dropped: total.dst_bytes,
        })
        .collect()
}

/// 차단 목록을 한 번 순회하여 CIDR 텍스트 목록을 만듭니다.
///
/// 순회 에러 시 빈 목록을 반환합니다.
pub fn collect_blocked(state: &BlocklistState) -> Vec<String> {
    match state.blocked() {
        Ok(keys) => keys.iter().map(ToString::to_string).collect(),
        Err(e) => {
            warn!(error = %e, "failed to iterate blocklist table");
            Vec::new()
        }
    }
}
