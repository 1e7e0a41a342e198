//! 만료 추적 — 임시 차단의 만료 시각 기록
//!
//! 커널 차단 목록 자체에는 만료 개념이 없습니다. [`ExpiryTracker`]는
//! 컨트롤 플레인이 소유한 만료 시각 테이블이며, 리퍼가 이 테이블을 보고
//! 만료된 차단을 직접 해제합니다.
//!
//! 불변식: 모든 만료 기록의 키는 차단 목록에 존재해야 합니다. 이 불변식은
//! [`crate::blocklist::BlocklistState`]가 두 테이블을 같은 락 아래에서
//! 함께 갱신하여 유지합니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, TimeDelta};
use xdpwall_core::api::TimeoutEntry;

use crate::codec::BlockKey;

/// 상태 보고서의 만료 시각 형식
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 현재 시각 공급자
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// 수동으로 진행시키는 시계
///
/// 복제본끼리 같은 시간을 공유하므로, 테스트는 컨트롤 플레인에 넘긴 뒤에도
/// 자신의 복제본으로 시간을 진행시킬 수 있습니다.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: DateTime<Local>,
    offset_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(base: DateTime<Local>) -> Self {
        Self {
            base,
            offset_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// 현재 시스템 시각에서 시작합니다.
    pub fn starting_now() -> Self {
        Self::new(Local::now())
    }

    /// 시간을 진행시킵니다.
    pub fn advance(&self, delta: TimeDelta) {
        self.offset_ms
            .fetch_add(delta.num_milliseconds(), Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.base + TimeDelta::milliseconds(self.offset_ms.load(Ordering::Acquire))
    }
}

/// 만료 시각 테이블
#[derive(Debug, Default)]
pub struct ExpiryTracker {
    records: HashMap<BlockKey, DateTime<Local>>,
}

impl ExpiryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 만료 시각을 기록하거나 덮어씁니다.
    pub fn schedule(&mut self, key: BlockKey, expires_at: DateTime<Local>) {
        self.records.insert(key, expires_at);
    }

    /// 기록을 제거합니다. 기록이 있었으면 `true`.
    pub fn cancel(&mut self, key: &BlockKey) -> bool {
        self.records.remove(key).is_some()
    }

    pub fn expires_at(&self, key: &BlockKey) -> Option<DateTime<Local>> {
        self.records.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `now` 시점에 만료된 키 (정렬됨)
    pub fn due(&self, now: DateTime<Local>) -> Vec<BlockKey> {
        let mut due: Vec<BlockKey> = self
            .records
            .iter()
            .filter(|(_, expires_at)| **expires_at <= now)
            .map(|(key, _)| *key)
            .collect();
        due.sort();
        due
    }

    /// 상태 보고서용 항목을 만듭니다 (대상 순 정렬).
    ///
    /// 남은 시간은 초 단위로 절삭하며, 이미 지났으면 음수 그대로 보고합니다.
    pub fn report(&self, now: DateTime<Local>) -> Vec<TimeoutEntry> {
        let mut keys: Vec<&BlockKey> = self.records.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| {
                self.records.get(key).map(|expires_at| TimeoutEntry {
                    target: key.to_string(),
                    timeout: expires_at.format(TIMESTAMP_FORMAT).to_string(),
                    remaining_time: (*expires_at - now).num_seconds(),
                })
            })
            .collect()
    }
}

/// `now + timeout_secs`를 계산합니다. 표현 범위를 넘으면 `None`.
pub fn expiry_after(now: DateTime<Local>, timeout_secs: u64) -> Option<DateTime<Local>> {
    let secs = i64::try_from(timeout_secs).ok()?;
    let delta = TimeDelta::try_seconds(secs)?;
    now.checked_add_signed(delta)
}
