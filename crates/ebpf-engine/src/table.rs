//! 커널 공유 테이블 접근 인터페이스
//!
//! 컨트롤 플레인은 차단 목록(LpmTrie)과 카운터(LruPerCpuHashMap)에
//! [`BlocklistTable`] / [`CounterTable`] trait을 통해서만 접근합니다.
//! Linux에서는 [`crate::loader`]가 aya 맵으로 구현하고, 테스트와 비-Linux
//! 환경에서는 [`MemoryBlocklist`] / [`MemoryCounters`]를 사용합니다.
//!
//! 각 호출은 단일 엔트리 수준에서만 원자적입니다. 조회 후 변경처럼
//! 두 호출에 걸친 시퀀스는 원자적이지 않습니다.

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

use xdpwall_ebpf_common::BLOCKED_MARKER;

use crate::codec::BlockKey;

/// 테이블 접근 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// 삭제/조회 대상 키가 없음
    #[error("key not found")]
    KeyNotFound,

    /// 커널이 호출을 거부함 (맵 가득 참, 권한 등)
    #[error("{0}")]
    Map(String),

    /// 엔트리를 해석할 수 없음 (해당 엔트리만 건너뜀)
    #[error("malformed entry: {0}")]
    Malformed(String),
}

/// 테이블 순회 결과
pub type TableIter<'a, T> = Box<dyn Iterator<Item = Result<T, TableError>> + 'a>;

/// 차단 목록 테이블 (BlockKey → 존재 표시)
pub trait BlocklistTable: Send {
    /// 키를 추가하거나 덮어씁니다.
    fn insert(&mut self, key: BlockKey, marker: u8) -> Result<(), TableError>;

    /// 키를 삭제합니다. 없으면 [`TableError::KeyNotFound`].
    fn remove(&mut self, key: &BlockKey) -> Result<(), TableError>;

    /// 정확히 일치하는 키의 값을 조회합니다.
    fn lookup(&self, key: &BlockKey) -> Result<Option<u8>, TableError>;

    /// 모든 키를 순회합니다. 순서는 테이블이 정합니다.
    fn keys(&self) -> TableIter<'_, BlockKey>;

    /// 테이블 이름 (로그/에러 메시지용)
    fn name(&self) -> &str;
}

/// CPU 한 개에 저장된 대상별 카운터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetCounters {
    pub src_packets: u64,
    pub src_bytes: u64,
    pub dst_packets: u64,
    pub dst_bytes: u64,
}

impl TargetCounters {
    /// 다른 복제본을 더합니다. 오버플로는 포화시킵니다.
    pub fn accumulate(&mut self, other: &Self) {
        self.src_packets = self.src_packets.saturating_add(other.src_packets);
        self.src_bytes = self.src_bytes.saturating_add(other.src_bytes);
        self.dst_packets = self.dst_packets.saturating_add(other.dst_packets);
        self.dst_bytes = self.dst_bytes.saturating_add(other.dst_bytes);
    }
}

/// 카운터 테이블 (대상 주소 → CPU별 카운터 복제본)
pub trait CounterTable: Send {
    /// 모든 대상과 CPU별 복제본을 순회합니다.
    fn entries(&self) -> TableIter<'_, (Ipv4Addr, Vec<TargetCounters>)>;

    /// 대상의 카운터를 삭제합니다.
    fn remove(&mut self, target: Ipv4Addr) -> Result<(), TableError>;

    fn name(&self) -> &str;
}

// =============================================================================
// 인메모리 구현
// =============================================================================

/// 메모리 기반 차단 목록
///
/// 커널 없이 컨트롤 플레인을 구동할 때 사용합니다. 장애 주입 옵션으로
/// 커널 호출 실패를 재현할 수 있습니다.
#[derive(Debug, Default)]
pub struct MemoryBlocklist {
    entries: BTreeMap<BlockKey, u8>,
    fail_insert: bool,
    fail_iteration: bool,
    malformed_entry: bool,
    fail_remove: HashSet<BlockKey>,
}

impl MemoryBlocklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 엔트리를 채웁니다.
    pub fn with_entries(keys: impl IntoIterator<Item = BlockKey>) -> Self {
        Self {
            entries: keys.into_iter().map(|k| (k, BLOCKED_MARKER)).collect(),
            ..Self::default()
        }
    }

    /// 모든 insert가 실패하도록 합니다.
    pub fn failing_inserts(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    /// 순회가 실패하도록 합니다.
    pub fn failing_iteration(mut self) -> Self {
        self.fail_iteration = true;
        self
    }

    /// 순회 중 해석할 수 없는 엔트리 하나를 끼워 넣습니다.
    pub fn with_malformed_entry(mut self) -> Self {
        self.malformed_entry = true;
        self
    }

    /// 특정 키의 삭제가 실패하도록 합니다.
    pub fn failing_remove(mut self, key: BlockKey) -> Self {
        self.fail_remove.insert(key);
        self
    }
}

impl BlocklistTable for MemoryBlocklist {
    fn insert(&mut self, key: BlockKey, marker: u8) -> Result<(), TableError> {
        if self.fail_insert {
            return Err(TableError::Map("injected insert failure".to_owned()));
        }
        self.entries.insert(key, marker);
        Ok(())
    }

    fn remove(&mut self, key: &BlockKey) -> Result<(), TableError> {
        if self.fail_remove.contains(key) {
            return Err(TableError::Map("injected remove failure".to_owned()));
        }
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or(TableError::KeyNotFound)
    }

    fn lookup(&self, key: &BlockKey) -> Result<Option<u8>, TableError> {
        Ok(self.entries.get(key).copied())
    }

    fn keys(&self) -> TableIter<'_, BlockKey> {
        if self.fail_iteration {
            return Box::new(std::iter::once(Err(TableError::Map(
                "injected iteration failure".to_owned(),
            ))));
        }
        let malformed = self
            .malformed_entry
            .then(|| Err(TableError::Malformed("prefix length 40".to_owned())));
        Box::new(malformed.into_iter().chain(self.entries.keys().copied().map(Ok)))
    }

    fn name(&self) -> &str {
        "memory-blocklist"
    }
}

/// 메모리 기반 CPU별 카운터
#[derive(Debug)]
pub struct MemoryCounters {
    cpus: usize,
    entries: BTreeMap<Ipv4Addr, Vec<TargetCounters>>,
    fail_iteration: bool,
    fail_remove: HashSet<Ipv4Addr>,
}

impl MemoryCounters {
    /// `cpus`개의 복제본을 가진 빈 테이블을 생성합니다 (최소 1).
    pub fn new(cpus: usize) -> Self {
        Self {
            cpus: cpus.max(1),
            entries: BTreeMap::new(),
            fail_iteration: false,
            fail_remove: HashSet::new(),
        }
    }

    /// 특정 CPU 복제본의 카운터를 기록합니다 (커널 프로그램 대역).
    pub fn record(&mut self, target: Ipv4Addr, cpu: usize, counters: TargetCounters) {
        let cpus = self.cpus;
        let replicas = self
            .entries
            .entry(target)
            .or_insert_with(|| vec![TargetCounters::default(); cpus]);
        if let Some(slot) = replicas.get_mut(cpu % cpus) {
            slot.accumulate(&counters);
        }
    }

    pub fn failing_iteration(mut self) -> Self {
        self.fail_iteration = true;
        self
    }

    pub fn failing_remove(mut self, target: Ipv4Addr) -> Self {
        self.fail_remove.insert(target);
        self
    }
}

impl Default for MemoryCounters {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CounterTable for MemoryCounters {
    fn entries(&self) -> TableIter<'_, (Ipv4Addr, Vec<TargetCounters>)> {
        if self.fail_iteration {
            return Box::new(std::iter::once(Err(TableError::Map(
                "injected iteration failure".to_owned(),
            ))));
        }
        Box::new(
            self.entries
                .iter()
                .map(|(addr, replicas)| Ok((*addr, replicas.clone()))),
        )
    }

    fn remove(&mut self, target: Ipv4Addr) -> Result<(), TableError> {
        if self.fail_remove.contains(&target) {
            return Err(TableError::Map("injected remove failure".to_owned()));
        }
        self.entries
            .remove(&target)
            .map(|_| ())
            .ok_or(TableError::KeyNotFound)
    }

    fn name(&self) -> &str {
        "memory-counters"
    }
}
