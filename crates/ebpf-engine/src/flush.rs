//! 일괄 삭제 — 차단 목록 / 카운터 테이블 비우기
//!
//! 키를 먼저 스냅샷한 뒤 하나씩 삭제합니다. 삭제 실패 시 나머지를 중단하고
//! `DeleteFailure`에 이미 삭제된 항목을 담아 반환합니다. 원자적이지 않습니다.

use std::net::Ipv4Addr;

use tracing::{info, warn};
use xdpwall_core::error::ControlError;
use xdpwall_core::metrics as m;

use crate::blocklist::BlocklistState;
use crate::table::{CounterTable, TableError};

impl BlocklistState {
    /// 차단 목록의 모든 키와 대응하는 만료 기록을 삭제합니다.
    ///
    /// 호스트 비트가 있는 외부 키도 저장된 그대로 삭제합니다.
    /// 삭제된 CIDR을 반환합니다.
    pub fn flush(&mut self) -> Result<Vec<String>, ControlError> {
        let table = self.table.name().to_owned();
        let keys = self
            .snapshot_keys()
            .map_err(|e| snapshot_failed(&table, e))?;

        let mut completed = Vec::with_capacity(keys.len());
        for key in keys {
            match self.table.remove(&key) {
                Ok(()) | Err(TableError::KeyNotFound) => {
                    self.expiry.cancel(&key);
                    completed.push(key.to_string());
                }
                Err(e) => {
                    let reason = e.to_string();
                    warn!(cidr = %key, error = %reason, "blocklist flush stopped");
                    record_flush(&table, "failure");
                    metrics::gauge!(m::EXPIRY_PENDING).set(self.expiry.len() as f64);
                    return Err(ControlError::DeleteFailure {
                        table,
                        target: key.to_string(),
                        reason,
                        completed,
                    });
                }
            }
        }

        info!(count = completed.len(), "blocklist flushed");
        record_flush(&table, "success");
        metrics::gauge!(m::EXPIRY_PENDING).set(self.expiry.len() as f64);
        metrics::gauge!(m::BLOCKLIST_ENTRIES).set(0.0);
        Ok(completed)
    }
}

/// 카운터 테이블의 모든 대상을 삭제합니다.
///
/// 삭제된 대상 주소를 반환합니다.
pub fn flush_counters(counters: &mut dyn CounterTable) -> Result<Vec<String>, ControlError> {
    let table = counters.name().to_owned();
    let targets: Vec<Ipv4Addr> = counters
        .entries()
        .map(|entry| entry.map(|(addr, _)| addr))
        .collect::<Result<_, _>>()
        .map_err(|e| snapshot_failed(&table, e))?;

    let mut completed = Vec::with_capacity(targets.len());
    for target in targets {
        match counters.remove(target) {
            // LRU 축출로 이미 사라진 경우 포함
            Ok(()) | Err(TableError::KeyNotFound) => completed.push(target.to_string()),
            Err(e) => {
                let reason = e.to_string();
                warn!(addr = %target, error = %reason, "counter flush stopped");
                record_flush(&table, "failure");
                return Err(ControlError::DeleteFailure {
                    table,
                    target: target.to_string(),
                    reason,
                    completed,
                });
            }
        }
    }

    info!(count = completed.len(), "counters flushed");
    record_flush(&table, "success");
    Ok(completed)
}

fn snapshot_failed(table: &str, err: TableError) -> ControlError {
    warn!(table, error = %err, "failed to read keys for flush");
    record_flush(table, "failure");
    ControlError::TableUpdate {
        table: table.to_owned(),
        reason: err.to_string(),
    }
}

fn record_flush(table: &str, result: &'static str) {
    metrics::counter!(
        m::FLUSH_TOTAL,
        m::LABEL_TABLE => table.to_owned(),
        m::LABEL_RESULT => result
    )
    .increment(1);
}
