//! 컨트롤 플레인 — 요청 핸들러가 공유하는 상태 객체
//!
//! [`ControlPlane`]은 `Arc`로 공유되며 세 개의 락을 가집니다.
//!
//! ```text
//! ControlPlane
//!   ├── links:     Mutex<LinkManager>          (load / unload / status)
//!   ├── blocklist: Mutex<BlocklistState>       (block / allow / flush / reaper / status)
//!   └── counters:  Mutex<Box<dyn CounterTable>> (flush / status)
//! ```
//!
//! 어떤 작업도 두 락을 동시에 잡지 않습니다. status는 links → blocklist →
//! counters 순서로 하나씩 잡고 놓습니다.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use xdpwall_core::api::StatusReport;
use xdpwall_core::error::ControlError;

use crate::blocklist::{BlockAction, BlocklistState};
use crate::codec::BlockKey;
use crate::expiry::{Clock, SystemClock};
use crate::flush::flush_counters;
use crate::link::{
    AttachMode, Attacher, LinkManager, LoadReport, UnloadReport, UnloadTarget,
    parse_interface_list,
};
use crate::status::{collect_blocked, collect_stats};
use crate::table::{BlocklistTable, CounterTable};

/// 컨트롤 플레인 공유 상태
pub struct ControlPlane {
    links: Mutex<LinkManager>,
    blocklist: Mutex<BlocklistState>,
    counters: Mutex<Box<dyn CounterTable>>,
    clock: Arc<dyn Clock>,
}

impl ControlPlane {
    /// 시스템 시계를 사용하는 컨트롤 플레인을 생성합니다.
    pub fn new(
        attacher: Box<dyn Attacher>,
        blocklist: Box<dyn BlocklistTable>,
        counters: Box<dyn CounterTable>,
    ) -> Self {
        Self::with_clock(attacher, blocklist, counters, Arc::new(SystemClock))
    }

    pub fn with_clock(
        attacher: Box<dyn Attacher>,
        blocklist: Box<dyn BlocklistTable>,
        counters: Box<dyn CounterTable>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            links: Mutex::new(LinkManager::new(attacher)),
            blocklist: Mutex::new(BlocklistState::new(blocklist)),
            counters: Mutex::new(counters),
            clock,
        }
    }

    /// `POST /load`: 쉼표로 구분된 인터페이스에 프로그램을 어태치합니다.
    pub async fn load(&self, interfaces: &str, mode: &str) -> Result<LoadReport, ControlError> {
        let mode: AttachMode = mode.parse()?;
        let names = parse_interface_list(interfaces);
        self.links.lock().await.load(&names, mode)
    }

    /// `POST /unload`: 인터페이스 목록 또는 `all`에서 프로그램을 디태치합니다.
    pub async fn unload(&self, interfaces: &str) -> Result<UnloadReport, ControlError> {
        let target = UnloadTarget::parse(interfaces);
        self.links.lock().await.unload(&target)
    }

    /// `POST /block`: 대상 CIDR을 차단하거나 해제합니다.
    pub async fn set_action(
        &self,
        target: &str,
        action: &str,
        timeout_secs: u64,
    ) -> Result<BlockKey, ControlError> {
        let action: BlockAction = action.parse()?;
        let now = self.clock.now();
        self.blocklist
            .lock()
            .await
            .set_action(target, action, timeout_secs, now)
    }

    /// `GET /status`: 어태치, 차단 목록, 만료, 카운터를 하나의 보고서로 합칩니다.
    pub async fn status(&self) -> StatusReport {
        let interfaces = self.links.lock().await.attached();

        let (blocked, timeout) = {
            let state = self.blocklist.lock().await;
            let now = self.clock.now();
            (collect_blocked(&state), state.expiry().report(now))
        };

        let stats = {
            let counters = self.counters.lock().await;
            collect_stats(counters.as_ref())
        };

        debug!(
            interfaces = interfaces.len(),
            blocked = blocked.len(),
            timeouts = timeout.len(),
            targets = stats.len(),
            "status report built"
        );

        StatusReport {
            interfaces,
            blocked,
            timeout,
            stats,
        }
    }

    /// `POST /flushblocked`: 차단 목록과 만료 기록을 모두 지웁니다.
    pub async fn flush_blocked(&self) -> Result<Vec<String>, ControlError> {
        self.blocklist.lock().await.flush()
    }

    /// `POST /flushstatus`: 카운터 테이블을 모두 지웁니다.
    pub async fn flush_counters(&self) -> Result<Vec<String>, ControlError> {
        let mut counters = self.counters.lock().await;
        flush_counters(counters.as_mut())
    }

    /// 만료된 차단을 해제하고 해제된 CIDR을 반환합니다.
    pub async fn reap_expired(&self) -> Vec<String> {
        let mut state = self.blocklist.lock().await;
        let now = self.clock.now();
        state
            .reap_expired(now)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// 현재 어태치된 인터페이스 (정렬됨)
    pub async fn attached(&self) -> Vec<String> {
        self.links.lock().await.attached()
    }

    /// 모든 어태치를 해제합니다 (데몬 종료 시).
    pub async fn detach_all(&self) -> Vec<String> {
        let detached = self.links.lock().await.detach_all();
        if !detached.is_empty() {
            info!(interfaces = ?detached, "detached XDP program from all interfaces");
        }
        detached
    }
}
