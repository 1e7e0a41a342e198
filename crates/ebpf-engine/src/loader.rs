//! aya 바인딩 — 로드된 XDP 오브젝트에 테이블/어태처 trait 구현
//!
//! [`load`]는 오브젝트 파일을 읽어 프로그램을 커널에 로드하고, 두 공유 맵을
//! 꺼내 [`AyaBlocklist`] / [`AyaCounters`]로 감싼 뒤 [`ControlPlane`]을 조립합니다.
//! 프로그램 핸들(`aya::Ebpf`)은 [`AyaAttacher`]가 소유합니다.
//!
//! # Linux 전용
//! 이 모듈은 `target_os = "linux"`에서만 컴파일됩니다.

use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::path::Path;

use aya::Ebpf;
use aya::maps::lpm_trie::{Key, LpmTrie};
use aya::maps::{MapData, MapError, PerCpuHashMap};
use aya::programs::xdp::XdpLinkId;
use aya::programs::{Xdp, XdpFlags};
use tracing::{info, warn};
use xdpwall_core::error::XdpwallError;
use xdpwall_ebpf_common::{MAP_BLOCKED_IPV4, MAP_TARGET_STATS, TargetStats};

use crate::codec::{BlockKey, counter_key_from_target, target_from_counter_key};
use crate::config::EngineConfig;
use crate::control::ControlPlane;
use crate::link::{AttachMode, AttachmentHandle, Attacher, is_valid_interface_name};
use crate::table::{BlocklistTable, CounterTable, TableError, TableIter, TargetCounters};

/// XDP 오브젝트를 로드하고 컨트롤 플레인을 조립합니다.
///
/// # 에러
/// - 오브젝트 파일을 읽거나 커널에 로드할 수 없는 경우
/// - 프로그램 또는 맵이 오브젝트에 없는 경우
pub fn load(config: &EngineConfig) -> Result<ControlPlane, XdpwallError> {
    let mut ebpf = Ebpf::load_file(&config.object_path).map_err(|e| {
        XdpwallError::Ebpf(format!(
            "failed to load {}: {e}",
            config.object_path.display()
        ))
    })?;

    if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
        warn!(error = %e, "failed to initialize eBPF logger");
    }

    xdp_program(&mut ebpf, &config.program_name)?
        .load()
        .map_err(|e| XdpwallError::Ebpf(format!("failed to load program: {e}")))?;

    let blocklist = AyaBlocklist::from_ebpf(&mut ebpf)?;
    let counters = AyaCounters::from_ebpf(&mut ebpf)?;
    let attacher = AyaAttacher::new(ebpf, config.program_name.clone());

    info!(
        object = %config.object_path.display(),
        program = %config.program_name,
        "XDP object loaded"
    );

    Ok(ControlPlane::new(
        Box::new(attacher),
        Box::new(blocklist),
        Box::new(counters),
    ))
}

fn xdp_program<'a>(ebpf: &'a mut Ebpf, name: &str) -> Result<&'a mut Xdp, XdpwallError> {
    ebpf.program_mut(name)
        .ok_or_else(|| XdpwallError::Ebpf(format!("program {name} not found in object")))?
        .try_into()
        .map_err(|e| XdpwallError::Ebpf(format!("program {name} is not XDP: {e}")))
}

/// aya MapError를 테이블 에러로 분류합니다.
fn table_error(err: MapError) -> TableError {
    match err {
        MapError::KeyNotFound => TableError::KeyNotFound,
        MapError::SyscallError(e) if e.io_error.kind() == io::ErrorKind::NotFound => {
            TableError::KeyNotFound
        }
        other => TableError::Map(other.to_string()),
    }
}

// =============================================================================
// 차단 목록 (LpmTrie)
// =============================================================================

/// `BLOCKED_IPV4` LpmTrie 맵
pub struct AyaBlocklist {
    map: LpmTrie<MapData, u32, u8>,
}

impl AyaBlocklist {
    fn from_ebpf(ebpf: &mut Ebpf) -> Result<Self, XdpwallError> {
        let map = ebpf
            .take_map(MAP_BLOCKED_IPV4)
            .ok_or_else(|| XdpwallError::Ebpf(format!("map {MAP_BLOCKED_IPV4} not found")))?;
        let map = LpmTrie::try_from(map)
            .map_err(|e| XdpwallError::Ebpf(format!("map {MAP_BLOCKED_IPV4}: {e}")))?;
        Ok(Self { map })
    }

    fn lpm_key(key: &BlockKey) -> Key<u32> {
        Key::new(u32::from(key.prefix_len()), key.to_lpm_data())
    }
}

impl BlocklistTable for AyaBlocklist {
    fn insert(&mut self, key: BlockKey, marker: u8) -> Result<(), TableError> {
        self.map
            .insert(&Self::lpm_key(&key), marker, 0)
            .map_err(table_error)
    }

    fn remove(&mut self, key: &BlockKey) -> Result<(), TableError> {
        self.map.remove(&Self::lpm_key(key)).map_err(table_error)
    }

    fn lookup(&self, key: &BlockKey) -> Result<Option<u8>, TableError> {
        match self.map.get(&Self::lpm_key(key), 0) {
            Ok(marker) => Ok(Some(marker)),
            Err(e) => match table_error(e) {
                TableError::KeyNotFound => Ok(None),
                other => Err(other),
            },
        }
    }

    fn keys(&self) -> TableIter<'_, BlockKey> {
        Box::new(self.map.keys().map(|item| {
            let key = item.map_err(table_error)?;
            BlockKey::from_lpm_data(key.prefix_len(), key.data())
                .map_err(|e| TableError::Malformed(e.to_string()))
        }))
    }

    fn name(&self) -> &str {
        MAP_BLOCKED_IPV4
    }
}

// =============================================================================
// 카운터 (LruPerCpuHashMap)
// =============================================================================

/// `TARGET_STATS` CPU별 해시 맵
pub struct AyaCounters {
    map: PerCpuHashMap<MapData, u32, TargetStats>,
}

impl AyaCounters {
    fn from_ebpf(ebpf: &mut Ebpf) -> Result<Self, XdpwallError> {
        let map = ebpf
            .take_map(MAP_TARGET_STATS)
            .ok_or_else(|| XdpwallError::Ebpf(format!("map {MAP_TARGET_STATS} not found")))?;
        let map = PerCpuHashMap::try_from(map)
            .map_err(|e| XdpwallError::Ebpf(format!("map {MAP_TARGET_STATS}: {e}")))?;
        Ok(Self { map })
    }
}

impl From<&TargetStats> for TargetCounters {
    fn from(stats: &TargetStats) -> Self {
        Self {
            src_packets: stats.src_packets,
            src_bytes: stats.src_bytes,
            dst_packets: stats.dst_packets,
            dst_bytes: stats.dst_bytes,
        }
    }
}

impl CounterTable for AyaCounters {
    fn entries(&self) -> TableIter<'_, (Ipv4Addr, Vec<TargetCounters>)> {
        Box::new(self.map.iter().map(|item| {
            let (raw, per_cpu) = item.map_err(table_error)?;
            let replicas = per_cpu.iter().map(TargetCounters::from).collect();
            Ok((target_from_counter_key(raw), replicas))
        }))
    }

    fn remove(&mut self, target: Ipv4Addr) -> Result<(), TableError> {
        self.map
            .remove(&counter_key_from_target(target))
            .map_err(table_error)
    }

    fn name(&self) -> &str {
        MAP_TARGET_STATS
    }
}

// =============================================================================
// 어태처 (Xdp 프로그램)
// =============================================================================

/// 로드된 XDP 프로그램을 인터페이스에 어태치/디태치합니다.
pub struct AyaAttacher {
    ebpf: Ebpf,
    program_name: String,
    links: HashMap<AttachmentHandle, XdpLinkId>,
    next_id: u64,
}

impl AyaAttacher {
    fn new(ebpf: Ebpf, program_name: String) -> Self {
        Self {
            ebpf,
            program_name,
            links: HashMap::new(),
            next_id: 0,
        }
    }

    fn program(&mut self) -> Result<&mut Xdp, String> {
        xdp_program(&mut self.ebpf, &self.program_name).map_err(|e| e.to_string())
    }
}

/// 이름 규칙을 만족하고 `/sys/class/net`에 등록된 인터페이스인지 확인합니다.
fn interface_exists(name: &str) -> bool {
    is_valid_interface_name(name) && Path::new("/sys/class/net").join(name).exists()
}

fn xdp_flags(mode: AttachMode) -> XdpFlags {
    match mode {
        AttachMode::HardwareOffload => XdpFlags::HW_MODE,
        AttachMode::Generic => XdpFlags::SKB_MODE,
        AttachMode::NativeDriver => XdpFlags::DRV_MODE,
    }
}

impl Attacher for AyaAttacher {
    fn resolve(&self, interface: &str) -> bool {
        interface_exists(interface)
    }

    fn attach(&mut self, interface: &str, mode: AttachMode) -> Result<AttachmentHandle, String> {
        let link_id = self
            .program()?
            .attach(interface, xdp_flags(mode))
            .map_err(|e| e.to_string())?;
        self.next_id += 1;
        let handle = AttachmentHandle::new(self.next_id);
        self.links.insert(handle, link_id);
        Ok(handle)
    }

    fn detach(&mut self, handle: AttachmentHandle) -> Result<(), String> {
        let link_id = self
            .links
            .remove(&handle)
            .ok_or_else(|| format!("unknown link {}", handle.id()))?;
        self.program()?.detach(link_id).map_err(|e| e.to_string())
    }
}
