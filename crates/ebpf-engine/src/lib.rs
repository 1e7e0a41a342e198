//! xdpwall 컨트롤 플레인 엔진
//!
//! 커널의 XDP 필터링 프로그램이 읽는 두 공유 테이블(차단 목록 LpmTrie,
//! 대상별 CPU 카운터)과 인터페이스 어태치 상태를 관리합니다.
//!
//! # 모듈 구성
//! - [`codec`]: CIDR 텍스트 ↔ 커널 공유 키 변환
//! - [`table`]: 테이블 접근 trait + 인메모리 구현
//! - [`link`]: 인터페이스별 어태치/디태치 (LinkManager)
//! - [`blocklist`]: block/allow 처리와 만료 예약
//! - [`expiry`]: 만료 시각 테이블, Clock trait
//! - [`status`]: CPU별 카운터 합산, 상태 보고서 섹션
//! - [`flush`]: 테이블 일괄 삭제
//! - [`control`]: 요청 핸들러가 공유하는 ControlPlane
//! - [`reaper`]: 만료 리퍼 백그라운드 태스크
//! - `loader` (Linux 전용): aya 맵/프로그램 바인딩
//!
//! # 공유 타입
//! 커널/유저스페이스 공유 타입은 [`xdpwall_ebpf_common`] 크레이트에 정의되어 있습니다.

pub mod blocklist;
pub mod codec;
pub mod config;
pub mod control;
pub mod expiry;
pub mod flush;
pub mod link;
#[cfg(target_os = "linux")]
pub mod loader;
pub mod reaper;
pub mod status;
pub mod table;

// --- 주요 타입 re-export ---

// 컨트롤 플레인
pub use control::ControlPlane;
pub use reaper::spawn_reaper;

// 설정
pub use config::EngineConfig;

// 코덱
pub use codec::BlockKey;

// 링크
pub use link::{AttachMode, Attacher, LoadReport, MemoryAttacher, UnloadReport, UnloadTarget};

// 차단 목록 / 만료
pub use blocklist::BlockAction;
pub use expiry::{Clock, ManualClock, SystemClock};

// 테이블
pub use table::{
    BlocklistTable, CounterTable, MemoryBlocklist, MemoryCounters, TableError, TargetCounters,
};

// 공유 타입 (커널/유저스페이스 공통)
pub use xdpwall_ebpf_common;
