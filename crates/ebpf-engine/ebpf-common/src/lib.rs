//! eBPF 커널/유저스페이스 공유 타입
//!
//! 이 크레이트는 `#![no_std]` 환경에서 사용 가능한 공통 타입을 정의합니다.
//! XDP 프로그램과 컨트롤 플레인이 동일한 메모리 레이아웃(`#[repr(C)]`)을
//! 사용하도록 보장합니다.
//!
//! # 맵 타입 선택 근거
//! - **LpmTrie** (`BLOCKED_IPV4`): CIDR 차단 목록 — 최장 접두사 매칭
//! - **LruPerCpuHashMap** (`TARGET_STATS`): 대상 IP별 드롭 카운터 — CPU별 독립 카운터,
//!   가득 차면 가장 오래된 대상부터 밀려남

#![no_std]

// =============================================================================
// 맵 / 프로그램 이름 상수
// =============================================================================

/// CIDR 차단 목록 LpmTrie 맵 이름
pub const MAP_BLOCKED_IPV4: &str = "BLOCKED_IPV4";
/// 대상별 카운터 LruPerCpuHashMap 맵 이름
pub const MAP_TARGET_STATS: &str = "TARGET_STATS";
/// XDP 프로그램 이름
pub const PROGRAM_FIREWALL: &str = "xdpwall_firewall";

// =============================================================================
// 맵 크기
// =============================================================================

/// 차단 목록 최대 엔트리 수
pub const BLOCKED_MAX_ENTRIES: u32 = 10_000;
/// 카운터 맵 최대 엔트리 수
pub const STATS_MAX_ENTRIES: u32 = 10_000;

// =============================================================================
// 차단 목록 키/값
// =============================================================================

/// 차단 목록 값 — 키가 존재한다는 표시일 뿐 의미 있는 내용은 없음
pub const BLOCKED_MARKER: u8 = 1;

/// LpmTrie 키 전체 크기 (바이트)
///
/// # 메모리 레이아웃 (8 바이트)
/// ```text
/// offset  field       size  byte order
/// 0       prefix_len  4     host
/// 4       addr        4     network (big endian)
/// ```
///
/// 키의 데이터 부분은 `u32`로 다루되, 메모리상의 바이트가 네트워크 바이트
/// 오더가 되도록 `u32::from_ne_bytes(octets)`로 만듭니다.
pub const LPM_KEY_SIZE: usize = 8;

/// 옥텟 배열(네트워크 바이트 오더)을 LpmTrie 키 데이터로 변환합니다.
#[inline(always)]
pub const fn lpm_data_from_octets(octets: [u8; 4]) -> u32 {
    u32::from_ne_bytes(octets)
}

/// LpmTrie 키 데이터를 옥텟 배열(네트워크 바이트 오더)로 변환합니다.
#[inline(always)]
pub const fn lpm_data_to_octets(data: u32) -> [u8; 4] {
    data.to_ne_bytes()
}

// =============================================================================
// 대상별 카운터
// =============================================================================

/// 대상 IP별 드롭 카운터
///
/// `LruPerCpuHashMap<u32, TargetStats>` 맵에서 사용됩니다.
/// 키는 패킷 헤더에서 그대로 읽은 IPv4 주소 (네트워크 바이트 오더) 입니다.
///
/// # 맵 선택 근거
/// CPU별 인스턴스만 갱신하므로 원자 연산 없이 카운터를 증가시킬 수 있습니다.
/// 유저스페이스에서 모든 CPU 값을 합산하여 논리 값을 계산합니다.
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "user", derive(Debug, PartialEq, Eq, Default))]
pub struct TargetStats {
    /// 출발지로 매칭되어 드롭된 패킷 수
    pub src_packets: u64,
    /// 출발지로 매칭되어 드롭된 바이트 수
    pub src_bytes: u64,
    /// 목적지로 매칭되어 드롭된 패킷 수
    pub dst_packets: u64,
    /// 목적지로 매칭되어 드롭된 바이트 수
    pub dst_bytes: u64,
}

// SAFETY: TargetStats는 #[repr(C)]이며 모든 필드가 u64(POD)이고 패딩이 없습니다.
#[cfg(feature = "user")]
unsafe impl aya::Pod for TargetStats {}

impl TargetStats {
    /// 출발지 매칭 첫 패킷 카운터를 생성합니다.
    pub const fn first_src(len: u64) -> Self {
        Self {
            src_packets: 1,
            src_bytes: len,
            dst_packets: 0,
            dst_bytes: 0,
        }
    }

    /// 목적지 매칭 첫 패킷 카운터를 생성합니다.
    pub const fn first_dst(len: u64) -> Self {
        Self {
            src_packets: 0,
            src_bytes: 0,
            dst_packets: 1,
            dst_bytes: len,
        }
    }
}
