//! 차단 목록 컨트롤러 — CIDR 차단/해제와 만료 예약
//!
//! [`BlocklistState`]는 커널 차단 목록 테이블과 [`ExpiryTracker`]를 함께 소유합니다.
//! 둘은 항상 같은 락 아래에서 갱신되므로, 만료 기록이 차단 목록에 없는
//! 키를 가리키는 상태는 다른 요청에서 관측되지 않습니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};
use xdpwall_core::error::ControlError;
use xdpwall_core::metrics as m;
use xdpwall_ebpf_common::BLOCKED_MARKER;

use crate::codec::BlockKey;
use crate::expiry::{ExpiryTracker, expiry_after};
use crate::table::{BlocklistTable, TableError};

/// 차단 목록 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAction {
    Block,
    Allow,
}

impl BlockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Allow => "allow",
        }
    }
}

impl FromStr for BlockAction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Self::Block),
            "allow" => Ok(Self::Allow),
            other => Err(ControlError::InvalidAction(other.to_owned())),
        }
    }
}

impl fmt::Display for BlockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 차단 목록 테이블 + 만료 테이블
pub struct BlocklistState {
    pub(crate) table: Box<dyn BlocklistTable>,
    pub(crate) expiry: ExpiryTracker,
}

impl BlocklistState {
    pub fn new(table: Box<dyn BlocklistTable>) -> Self {
        Self {
            table,
            expiry: ExpiryTracker::new(),
        }
    }

    pub fn expiry(&self) -> &ExpiryTracker {
        &self.expiry
    }

    /// 대상 CIDR을 차단하거나 해제합니다.
    ///
    /// - `block`: 테이블에 upsert합니다. `timeout_secs`가 0이 아니면
    ///   `now + timeout_secs`로 만료를 (재)기록하고, 0이면 남은 만료 기록을 지웁니다.
    /// - `allow`: 테이블에서 삭제합니다. 없으면 `NotBlocked`. 삭제 성공 여부와
    ///   무관하게 만료 기록은 항상 지웁니다.
    pub fn set_action(
        &mut self,
        target: &str,
        action: BlockAction,
        timeout_secs: u64,
        now: DateTime<Local>,
    ) -> Result<BlockKey, ControlError> {
        let key = BlockKey::parse(target)?;
        let result = match action {
            BlockAction::Block => self.block(key, timeout_secs, now),
            BlockAction::Allow => self.allow(key),
        };

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!(
            m::BLOCKLIST_UPDATES_TOTAL,
            m::LABEL_ACTION => action.as_str(),
            m::LABEL_RESULT => outcome
        )
        .increment(1);
        metrics::gauge!(m::EXPIRY_PENDING).set(self.expiry.len() as f64);

        result.map(|()| key)
    }

    fn block(
        &mut self,
        key: BlockKey,
        timeout_secs: u64,
        now: DateTime<Local>,
    ) -> Result<(), ControlError> {
        let expires_at = match timeout_secs {
            0 => None,
            secs => Some(expiry_after(now, secs).ok_or_else(|| {
                ControlError::InvalidInput(format!("timeout {secs} is out of range"))
            })?),
        };

        self.table.insert(key, BLOCKED_MARKER).map_err(|e| {
            warn!(cidr = %key, error = %e, "blocklist insert failed");
            ControlError::TableUpdate {
                table: self.table.name().to_owned(),
                reason: e.to_string(),
            }
        })?;

        match expires_at {
            Some(at) => {
                self.expiry.schedule(key, at);
                info!(cidr = %key, expires_at = %at, "target blocked with expiry");
            }
            None => {
                if self.expiry.cancel(&key) {
                    debug!(cidr = %key, "stale expiry record removed");
                }
                info!(cidr = %key, "target blocked");
            }
        }
        Ok(())
    }

    fn allow(&mut self, key: BlockKey) -> Result<(), ControlError> {
        let removed = self.table.remove(&key);
        self.expiry.cancel(&key);

        match removed {
            Ok(()) => {
                info!(cidr = %key, "target allowed");
                Ok(())
            }
            Err(TableError::KeyNotFound) => {
                info!(cidr = %key, "target is not blocked");
                Err(ControlError::NotBlocked {
                    target: key.to_string(),
                })
            }
            Err(e) => {
                warn!(cidr = %key, error = %e, "blocklist delete failed");
                Err(ControlError::TableUpdate {
                    table: self.table.name().to_owned(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// 만료된 차단을 해제합니다.
    ///
    /// 테이블에 이미 없는 키는 경고만 남기고 기록을 버립니다. 삭제에 실패한
    /// 키는 기록을 남겨 다음 주기에 다시 시도합니다. 해제된 키를 반환합니다.
    pub fn reap_expired(&mut self, now: DateTime<Local>) -> Vec<BlockKey> {
        let mut reaped = Vec::new();
        for key in self.expiry.due(now) {
            match self.table.remove(&key) {
                Ok(()) => {
                    info!(cidr = %key, "expired block revoked");
                    self.expiry.cancel(&key);
                    reaped.push(key);
                }
                Err(TableError::KeyNotFound) => {
                    warn!(cidr = %key, "expired target was no longer blocked, dropping record");
                    self.expiry.cancel(&key);
                }
                Err(e) => {
                    warn!(cidr = %key, error = %e, "failed to revoke expired block");
                }
            }
        }

        if !reaped.is_empty() {
            metrics::counter!(m::EXPIRY_REAPED_TOTAL).increment(reaped.len() as u64);
        }
        metrics::gauge!(m::EXPIRY_PENDING).set(self.expiry.len() as f64);
        reaped
    }

    /// 차단 중인 CIDR을 테이블에서 읽습니다 (정렬됨).
    ///
    /// 해석할 수 없는 엔트리는 건너뛰고, 순회 자체가 실패하면 에러를 반환합니다.
    pub fn blocked(&self) -> Result<Vec<BlockKey>, TableError> {
        let mut keys = self.snapshot_keys()?;
        keys.sort();
        metrics::gauge!(m::BLOCKLIST_ENTRIES).set(keys.len() as f64);
        Ok(keys)
    }

    /// 테이블의 현재 키 목록
    pub(crate) fn snapshot_keys(&self) -> Result<Vec<BlockKey>, TableError> {
        let mut keys = Vec::new();
        for item in self.table.keys() {
            match item {
                Ok(key) => {
                    if !key.is_canonical() {
                        debug!(cidr = %key, "blocklist entry has host bits set");
                    }
                    keys.push(key);
                }
                Err(TableError::Malformed(reason)) => {
                    warn!(table = self.table.name(), error = %reason, "skipping malformed blocklist entry");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(keys)
    }
}
