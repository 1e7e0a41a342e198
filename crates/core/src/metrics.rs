//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `xdpwall_`
//! - 영역: `link_`, `blocklist_`, `expiry_`, `counters_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use xdpwall_core::metrics as m;
//!
//! metrics::counter!(m::BLOCKLIST_UPDATES_TOTAL, m::LABEL_ACTION => "block").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 액션 레이블 키 (block, allow)
pub const LABEL_ACTION: &str = "action";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 테이블 레이블 키 (blocklist, counters)
pub const LABEL_TABLE: &str = "table";

// ─── Link 메트릭 ────────────────────────────────────────────────────

/// 현재 XDP가 어태치된 인터페이스 수 (gauge)
pub const LINK_ATTACHED_INTERFACES: &str = "xdpwall_link_attached_interfaces";

/// 어태치 시도 수 (counter, label: result)
pub const LINK_ATTACH_TOTAL: &str = "xdpwall_link_attach_total";

/// 디태치 시도 수 (counter, label: result)
pub const LINK_DETACH_TOTAL: &str = "xdpwall_link_detach_total";

// ─── Blocklist 메트릭 ───────────────────────────────────────────────

/// 차단 목록 갱신 요청 수 (counter, labels: action, result)
pub const BLOCKLIST_UPDATES_TOTAL: &str = "xdpwall_blocklist_updates_total";

/// 마지막 상태 조회 시점의 차단 목록 엔트리 수 (gauge)
pub const BLOCKLIST_ENTRIES: &str = "xdpwall_blocklist_entries";

// ─── Expiry 메트릭 ──────────────────────────────────────────────────

/// 대기 중인 만료 레코드 수 (gauge)
pub const EXPIRY_PENDING: &str = "xdpwall_expiry_pending";

/// 만료되어 해제된 차단 수 (counter)
pub const EXPIRY_REAPED_TOTAL: &str = "xdpwall_expiry_reaped_total";

// ─── Counter 테이블 메트릭 ─────────────────────────────────────────

/// 드롭된 패킷 수 합계 (gauge, 마지막 상태 조회 기준)
pub const COUNTERS_DROPPED_PACKETS: &str = "xdpwall_counters_dropped_packets";

/// 드롭된 바이트 수 합계 (gauge, 마지막 상태 조회 기준)
pub const COUNTERS_DROPPED_BYTES: &str = "xdpwall_counters_dropped_bytes";

/// flush 요청 수 (counter, labels: table, result)
pub const FLUSH_TOTAL: &str = "xdpwall_flush_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_gauge!(
        LINK_ATTACHED_INTERFACES,
        "Number of interfaces the XDP program is currently attached to"
    );
    describe_counter!(LINK_ATTACH_TOTAL, "XDP attach attempts by result");
    describe_counter!(LINK_DETACH_TOTAL, "XDP detach attempts by result");

    describe_counter!(
        BLOCKLIST_UPDATES_TOTAL,
        "Blocklist block/allow requests by action and result"
    );
    describe_gauge!(
        BLOCKLIST_ENTRIES,
        "Blocklist entries observed by the last status report"
    );

    describe_gauge!(EXPIRY_PENDING, "Temporary blocks waiting for expiry");
    describe_counter!(
        EXPIRY_REAPED_TOTAL,
        "Temporary blocks revoked by the expiry reaper"
    );

    describe_gauge!(
        COUNTERS_DROPPED_PACKETS,
        "Packets dropped for blocked targets, summed over all CPUs"
    );
    describe_gauge!(
        COUNTERS_DROPPED_BYTES,
        "Bytes dropped for blocked targets, summed over all CPUs"
    );
    describe_counter!(FLUSH_TOTAL, "Flush requests by table and result");
}
