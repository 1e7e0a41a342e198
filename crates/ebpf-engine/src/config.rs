//! 엔진 설정 — core 설정에서 컨트롤 플레인이 쓰는 부분만 추출
//!
//! [`EngineConfig`]는 core의 [`EbpfConfig`]와 [`ExpiryConfig`]를 합쳐
//! 로더와 리퍼가 바로 쓸 수 있는 형태로 변환합니다.

use std::path::PathBuf;
use std::time::Duration;

use xdpwall_core::config::{EbpfConfig, ExpiryConfig, XdpwallConfig};

/// 컨트롤 플레인 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 컴파일된 XDP 오브젝트 경로
    pub object_path: PathBuf,
    /// 어태치할 XDP 프로그램 이름
    pub program_name: String,
    /// 만료 리퍼 주기 (`None`이면 리퍼 비활성)
    pub reap_interval: Option<Duration>,
}

impl EngineConfig {
    /// core 설정에서 엔진 설정을 생성합니다.
    pub fn from_core(config: &XdpwallConfig) -> Self {
        Self::from_parts(&config.ebpf, &config.expiry)
    }

    pub fn from_parts(ebpf: &EbpfConfig, expiry: &ExpiryConfig) -> Self {
        let reap_interval = (expiry.reaper_enabled && expiry.reap_interval_secs > 0)
            .then(|| Duration::from_secs(expiry.reap_interval_secs));
        Self {
            object_path: PathBuf::from(&ebpf.object_path),
            program_name: ebpf.program_name.clone(),
            reap_interval,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_core(&XdpwallConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_one_second_reaper() {
        let config = EngineConfig::default();
        assert_eq!(config.reap_interval, Some(Duration::from_secs(1)));
        assert_eq!(config.program_name, xdpwall_ebpf_common::PROGRAM_FIREWALL);
        assert_eq!(
            config.object_path,
            PathBuf::from("/usr/lib/xdpwall/xdpwall-ebpf")
        );
    }

    #[test]
    fn disabled_reaper_has_no_interval() {
        let mut core = XdpwallConfig::default();
        core.expiry.reaper_enabled = false;
        core.expiry.reap_interval_secs = 30;
        assert_eq!(EngineConfig::from_core(&core).reap_interval, None);
    }
}
