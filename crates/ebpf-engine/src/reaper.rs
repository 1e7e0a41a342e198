//! 만료 리퍼 — 주기적으로 만료된 임시 차단을 해제하는 백그라운드 태스크

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::control::ControlPlane;

/// 리퍼 태스크를 스폰합니다.
///
/// 매 주기마다 [`ControlPlane::reap_expired`]를 호출합니다. 대화형 요청과
/// 같은 차단 목록 락을 사용하므로 동시에 들어온 block/allow와 경합하지 않습니다.
/// `shutdown_rx`로 신호를 받으면 종료합니다.
pub fn spawn_reaper(
    control: Arc<ControlPlane>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(interval_ms = interval.as_millis() as u64, "expiry reaper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reaped = control.reap_expired().await;
                    if !reaped.is_empty() {
                        info!(count = reaped.len(), targets = ?reaped, "expired blocks revoked");
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("expiry reaper shutting down");
                    break;
                }
            }
        }
    })
}
