//! 링크 라이프사이클 — 인터페이스별 XDP 어태치/디태치
//!
//! [`LinkManager`]는 인터페이스 이름 → 어태치 핸들 테이블을 단독으로 소유합니다.
//! 인터페이스마다 핸들은 최대 하나입니다.
//!
//! 배치 요청은 첫 실패에서 멈추고, 그 전에 처리된 인터페이스는 그대로
//! 유지됩니다 (롤백 없음). 실패 에러에는 완료된 인터페이스 목록이 담깁니다.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};
use xdpwall_core::error::ControlError;
use xdpwall_core::metrics as m;

/// XDP 어태치 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    /// NIC 하드웨어 오프로드 (`hw`)
    HardwareOffload,
    /// 제네릭/소프트웨어 (`skb`)
    Generic,
    /// 네이티브 드라이버 (`nv`)
    NativeDriver,
}

impl AttachMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardwareOffload => "hw",
            Self::Generic => "skb",
            Self::NativeDriver => "nv",
        }
    }
}

impl FromStr for AttachMode {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hw" => Ok(Self::HardwareOffload),
            "skb" => Ok(Self::Generic),
            "nv" => Ok(Self::NativeDriver),
            other => Err(ControlError::InvalidMode(other.to_owned())),
        }
    }
}

impl fmt::Display for AttachMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 어태치 핸들 — 어태처가 발급한 불투명 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentHandle(u64);

impl AttachmentHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// 커널 인터페이스 이름 최대 길이 (NUL 포함)
pub const IFNAMSIZ: usize = 16;

/// 커널이 허용하는 인터페이스 이름인지 확인합니다 (`dev_valid_name` 규칙).
pub fn is_valid_interface_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() < IFNAMSIZ
        && name != "."
        && name != ".."
        && !name
            .bytes()
            .any(|b| b == b'/' || b == b':' || b == 0 || b.is_ascii_whitespace())
}

/// 인터페이스에 필터링 프로그램을 어태치하는 OS 수준 기능
pub trait Attacher: Send {
    /// 인터페이스가 존재하는지 확인합니다.
    fn resolve(&self, interface: &str) -> bool;

    /// 프로그램을 어태치합니다. 실패 시 원인 문자열을 반환합니다.
    fn attach(&mut self, interface: &str, mode: AttachMode) -> Result<AttachmentHandle, String>;

    /// 어태치를 해제합니다.
    fn detach(&mut self, handle: AttachmentHandle) -> Result<(), String>;
}

/// 쉼표로 구분된 인터페이스 목록을 파싱합니다.
///
/// 공백은 제거하고 빈 항목과 중복은 버립니다. 순서는 유지합니다.
pub fn parse_interface_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_owned());
        }
    }
    names
}

/// unload 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnloadTarget {
    All,
    Names(Vec<String>),
}

impl UnloadTarget {
    /// 목록의 첫 항목이 `all`이면 전체 대상으로 간주합니다.
    pub fn parse(raw: &str) -> Self {
        let names = parse_interface_list(raw);
        if names.first().is_some_and(|n| n == "all") {
            Self::All
        } else {
            Self::Names(names)
        }
    }
}

/// load 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// 이번 요청에서 새로 어태치된 인터페이스
    pub attached: Vec<String>,
    /// 이미 어태치되어 있어 건너뛴 인터페이스
    pub already_attached: Vec<String>,
}

/// unload 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnloadReport {
    /// 디태치된 인터페이스
    pub detached: Vec<String>,
    /// 어태치 기록이 없어 건너뛴 인터페이스
    pub not_loaded: Vec<String>,
}

/// 링크 라이프사이클 관리자
pub struct LinkManager {
    attacher: Box<dyn Attacher>,
    links: HashMap<String, AttachmentHandle>,
}

impl LinkManager {
    pub fn new(attacher: Box<dyn Attacher>) -> Self {
        Self {
            attacher,
            links: HashMap::new(),
        }
    }

    /// 인터페이스 목록에 프로그램을 어태치합니다.
    ///
    /// 이미 어태치된 인터페이스는 건너뜁니다. 존재하지 않는 인터페이스나
    /// 어태치 실패는 나머지 처리를 중단합니다.
    pub fn load(&mut self, names: &[String], mode: AttachMode) -> Result<LoadReport, ControlError> {
        if names.is_empty() {
            return Err(ControlError::InvalidInput(
                "interfaces field is required".to_owned(),
            ));
        }

        let mut report = LoadReport::default();
        for name in names {
            if self.links.contains_key(name) {
                info!(interface = %name, "XDP program already attached, skipping");
                report.already_attached.push(name.clone());
                continue;
            }

            if !self.attacher.resolve(name) {
                warn!(interface = %name, "interface does not exist");
                self.update_gauge();
                return Err(ControlError::InterfaceNotFound {
                    interface: name.clone(),
                    completed: report.attached,
                });
            }

            match self.attacher.attach(name, mode) {
                Ok(handle) => {
                    info!(interface = %name, mode = %mode, "XDP program attached");
                    metrics::counter!(m::LINK_ATTACH_TOTAL, m::LABEL_RESULT => "success")
                        .increment(1);
                    self.links.insert(name.clone(), handle);
                    report.attached.push(name.clone());
                }
                Err(reason) => {
                    warn!(interface = %name, mode = %mode, reason = %reason, "XDP attach failed");
                    metrics::counter!(m::LINK_ATTACH_TOTAL, m::LABEL_RESULT => "failure")
                        .increment(1);
                    self.update_gauge();
                    return Err(ControlError::AttachFailure {
                        interface: name.clone(),
                        reason,
                        completed: report.attached,
                    });
                }
            }
        }

        self.update_gauge();
        Ok(report)
    }

    /// 프로그램을 디태치합니다.
    ///
    /// 어태치된 인터페이스가 하나도 없으면 `NothingLoaded`를 반환합니다.
    /// 기록이 없는 이름은 에러가 아니라 `not_loaded`로 보고합니다.
    pub fn unload(&mut self, target: &UnloadTarget) -> Result<UnloadReport, ControlError> {
        if matches!(target, UnloadTarget::Names(names) if names.is_empty()) {
            return Err(ControlError::InvalidInput(
                "interfaces field is required".to_owned(),
            ));
        }
        if self.links.is_empty() {
            return Err(ControlError::NothingLoaded);
        }

        let names = match target {
            UnloadTarget::All => self.attached(),
            UnloadTarget::Names(names) => names.clone(),
        };

        let mut report = UnloadReport::default();
        for name in names {
            let Some(handle) = self.links.get(&name).copied() else {
                info!(interface = %name, "no XDP program attached, skipping");
                report.not_loaded.push(name);
                continue;
            };

            if let Err(reason) = self.attacher.detach(handle) {
                warn!(interface = %name, reason = %reason, "XDP detach failed");
                metrics::counter!(m::LINK_DETACH_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                self.update_gauge();
                return Err(ControlError::DetachFailure {
                    interface: name,
                    reason,
                    completed: report.detached,
                });
            }

            info!(interface = %name, "XDP program detached");
            metrics::counter!(m::LINK_DETACH_TOTAL, m::LABEL_RESULT => "success").increment(1);
            self.links.remove(&name);
            report.detached.push(name);
        }

        self.update_gauge();
        Ok(report)
    }

    /// 어태치된 인터페이스 이름 (정렬됨)
    pub fn attached(&self) -> Vec<String> {
        let mut names: Vec<String> = self.links.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_attached(&self, interface: &str) -> bool {
        self.links.contains_key(interface)
    }

    /// 모든 어태치를 해제합니다 (종료 시 사용).
    ///
    /// 실패는 로그만 남기고 계속 진행합니다. 디태치된 이름을 반환합니다.
    pub fn detach_all(&mut self) -> Vec<String> {
        let mut detached = Vec::new();
        for name in self.attached() {
            let Some(handle) = self.links.remove(&name) else {
                continue;
            };
            match self.attacher.detach(handle) {
                Ok(()) => {
                    info!(interface = %name, "XDP program detached");
                    detached.push(name);
                }
                Err(reason) => {
                    warn!(interface = %name, reason = %reason, "XDP detach failed during shutdown");
                }
            }
        }
        self.update_gauge();
        detached
    }

    fn update_gauge(&self) {
        metrics::gauge!(m::LINK_ATTACHED_INTERFACES).set(self.links.len() as f64);
    }
}

// =============================================================================
// 인메모리 어태처
// =============================================================================

/// 메모리 기반 어태처
///
/// 알려진 인터페이스 집합과 장애 주입 옵션을 가집니다.
#[derive(Debug, Default)]
pub struct MemoryAttacher {
    interfaces: Vec<String>,
    busy: Vec<String>,
    stuck: Vec<String>,
    active: HashMap<AttachmentHandle, String>,
    next_id: u64,
}

impl MemoryAttacher {
    /// 주어진 인터페이스가 존재하는 어태처를 생성합니다.
    pub fn new<I, S>(interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interfaces: interfaces.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// 다른 에이전트가 이미 어태치한 것처럼 attach가 실패하도록 합니다.
    pub fn busy(mut self, interface: &str) -> Self {
        self.busy.push(interface.to_owned());
        self
    }

    /// detach가 실패하도록 합니다.
    pub fn stuck(mut self, interface: &str) -> Self {
        self.stuck.push(interface.to_owned());
        self
    }
}

impl Attacher for MemoryAttacher {
    fn resolve(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    fn attach(&mut self, interface: &str, _mode: AttachMode) -> Result<AttachmentHandle, String> {
        if self.busy.iter().any(|i| i == interface) {
            return Err("device or resource busy".to_owned());
        }
        self.next_id += 1;
        let handle = AttachmentHandle::new(self.next_id);
        self.active.insert(handle, interface.to_owned());
        Ok(handle)
    }

    fn detach(&mut self, handle: AttachmentHandle) -> Result<(), String> {
        let Some(interface) = self.active.get(&handle) else {
            return Err(format!("unknown link {}", handle.id()));
        };
        if self.stuck.iter().any(|i| i == interface) {
            return Err("operation not permitted".to_owned());
        }
        self.active.remove(&handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &str) -> Vec<String> {
        parse_interface_list(list)
    }

    fn manager(attacher: MemoryAttacher) -> LinkManager {
        LinkManager::new(Box::new(attacher))
    }

    #[test]
    fn interface_names_follow_kernel_rules() {
        for name in ["eth0", "lo", "enp3s0f1", "veth-a.100", "a23456789012345"] {
            assert!(is_valid_interface_name(name), "rejected {name:?}");
        }
        for name in ["", ".", "..", "a234567890123456", "eth/0", "eth 0", "eth0:1", "\0"] {
            assert!(!is_valid_interface_name(name), "accepted {name:?}");
        }
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("hw".parse::<AttachMode>().unwrap(), AttachMode::HardwareOffload);
        assert_eq!("skb".parse::<AttachMode>().unwrap(), AttachMode::Generic);
        assert_eq!("nv".parse::<AttachMode>().unwrap(), AttachMode::NativeDriver);
        assert!(matches!(
            "drv".parse::<AttachMode>(),
            Err(ControlError::InvalidMode(m)) if m == "drv"
        ));
    }

    #[test]
    fn interface_list_is_trimmed_and_deduplicated() {
        assert_eq!(names(" eth0, eth1,,eth0 "), ["eth0", "eth1"]);
        assert!(names(" , ").is_empty());
    }

    #[test]
    fn unload_target_detects_all_by_first_item() {
        assert_eq!(UnloadTarget::parse("all"), UnloadTarget::All);
        assert_eq!(UnloadTarget::parse("all,eth0"), UnloadTarget::All);
        assert_eq!(
            UnloadTarget::parse("eth0,all"),
            UnloadTarget::Names(vec!["eth0".to_owned(), "all".to_owned()])
        );
    }

    #[test]
    fn load_twice_keeps_single_attachment() {
        let mut links = manager(MemoryAttacher::new(["eth0"]));
        let first = links.load(&names("eth0"), AttachMode::Generic).unwrap();
        assert_eq!(first.attached, ["eth0"]);

        let second = links.load(&names("eth0"), AttachMode::Generic).unwrap();
        assert!(second.attached.is_empty());
        assert_eq!(second.already_attached, ["eth0"]);
        assert_eq!(links.attached(), ["eth0"]);
    }

    #[test]
    fn unknown_interface_aborts_batch_without_rollback() {
        let mut links = manager(MemoryAttacher::new(["eth0", "eth2"]));
        let err = links
            .load(&names("eth0,eth1,eth2"), AttachMode::NativeDriver)
            .unwrap_err();
        match err {
            ControlError::InterfaceNotFound {
                interface,
                completed,
            } => {
                assert_eq!(interface, "eth1");
                assert_eq!(completed, ["eth0"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(links.attached(), ["eth0"]);
    }

    #[test]
    fn attach_failure_is_reported() {
        let mut links = manager(MemoryAttacher::new(["eth0"]).busy("eth0"));
        let err = links.load(&names("eth0"), AttachMode::Generic).unwrap_err();
        assert!(matches!(err, ControlError::AttachFailure { .. }));
        assert!(links.attached().is_empty());
    }

    #[test]
    fn load_requires_names() {
        let mut links = manager(MemoryAttacher::new(["eth0"]));
        assert!(matches!(
            links.load(&[], AttachMode::Generic),
            Err(ControlError::InvalidInput(_))
        ));
    }

    #[test]
    fn unload_all_with_nothing_loaded_fails() {
        let mut links = manager(MemoryAttacher::new(["eth0"]));
        let err = links.unload(&UnloadTarget::All).unwrap_err();
        assert!(matches!(err, ControlError::NothingLoaded));
        assert!(links.attached().is_empty());
    }

    #[test]
    fn unload_reports_untracked_names() {
        let mut links = manager(MemoryAttacher::new(["eth0", "eth1"]));
        links.load(&names("eth0"), AttachMode::Generic).unwrap();

        let report = links.unload(&UnloadTarget::parse("eth1,eth0")).unwrap();
        assert_eq!(report.detached, ["eth0"]);
        assert_eq!(report.not_loaded, ["eth1"]);
        assert!(links.attached().is_empty());
    }

    #[test]
    fn unload_all_clears_table() {
        let mut links = manager(MemoryAttacher::new(["eth0", "eth1"]));
        links.load(&names("eth1,eth0"), AttachMode::Generic).unwrap();

        let report = links.unload(&UnloadTarget::All).unwrap();
        assert_eq!(report.detached, ["eth0", "eth1"]);
        assert!(links.attached().is_empty());
    }

    #[test]
    fn detach_failure_keeps_failed_link_and_reports_completed() {
        let mut links = manager(MemoryAttacher::new(["eth0", "eth1"]).stuck("eth1"));
        links.load(&names("eth0,eth1"), AttachMode::Generic).unwrap();

        let err = links.unload(&UnloadTarget::All).unwrap_err();
        match err {
            ControlError::DetachFailure {
                interface,
                completed,
                ..
            } => {
                assert_eq!(interface, "eth1");
                assert_eq!(completed, ["eth0"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(links.attached(), ["eth1"]);
    }

    #[test]
    fn detach_all_is_best_effort() {
        let mut links = manager(MemoryAttacher::new(["eth0", "eth1"]).stuck("eth0"));
        links.load(&names("eth0,eth1"), AttachMode::Generic).unwrap();

        let detached = links.detach_all();
        assert_eq!(detached, ["eth1"]);
        assert!(links.attached().is_empty());
    }
}
