//! 설정 관리 — xdpwall.toml 파싱 및 런타임 설정
//!
//! [`XdpwallConfig`]는 데몬 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`XDPWALL_API_PORT=8080` 형식)
//! 3. 설정 파일 (`xdpwall.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), xdpwall_core::error::XdpwallError> {
//! use xdpwall_core::config::XdpwallConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드, 마지막에 한 번 검증
//! let config = XdpwallConfig::load("xdpwall.toml").await?;
//! config.validate()?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = XdpwallConfig::parse("[api]\nport = 9000")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, XdpwallError};

/// xdpwall 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XdpwallConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// HTTP 컨트롤 API 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// XDP 오브젝트 설정
    #[serde(default)]
    pub ebpf: EbpfConfig,
    /// 임시 차단 만료 설정
    #[serde(default)]
    pub expiry: ExpiryConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl XdpwallConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 검증하지 않습니다. 호출자가 CLI 오버라이드까지 적용한 뒤
    /// [`validate`](Self::validate)를 한 번 호출해야 합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, XdpwallError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, XdpwallError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                XdpwallError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                XdpwallError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, XdpwallError> {
        toml::from_str(toml_str).map_err(|e| {
            XdpwallError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `XDPWALL_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "XDPWALL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "XDPWALL_GENERAL_LOG_FORMAT");

        // API
        override_string(&mut self.api.listen_addr, "XDPWALL_API_LISTEN_ADDR");
        override_u16(&mut self.api.port, "XDPWALL_API_PORT");

        // eBPF
        override_string(&mut self.ebpf.object_path, "XDPWALL_EBPF_OBJECT_PATH");
        override_string(&mut self.ebpf.program_name, "XDPWALL_EBPF_PROGRAM_NAME");

        // Expiry
        override_bool(
            &mut self.expiry.reaper_enabled,
            "XDPWALL_EXPIRY_REAPER_ENABLED",
        );
        override_u64(
            &mut self.expiry.reap_interval_secs,
            "XDPWALL_EXPIRY_REAP_INTERVAL_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "XDPWALL_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "XDPWALL_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "XDPWALL_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), XdpwallError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.api.listen_addr.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.listen_addr".to_owned(),
                reason: "listen address must not be empty".to_owned(),
            }
            .into());
        }

        if self.api.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.port".to_owned(),
                reason: "port must be non-zero".to_owned(),
            }
            .into());
        }

        if self.ebpf.program_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ebpf.program_name".to_owned(),
                reason: "program name must not be empty".to_owned(),
            }
            .into());
        }

        if self.expiry.reaper_enabled && self.expiry.reap_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "expiry.reap_interval_secs".to_owned(),
                reason: "must be greater than 0 when the reaper is enabled".to_owned(),
            }
            .into());
        }

        if self.metrics.enabled {
            if self.metrics.endpoint != "/metrics" {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.endpoint".to_owned(),
                    reason: "only '/metrics' is supported".to_owned(),
                }
                .into());
            }
            if self.metrics.port == self.api.port && self.metrics.listen_addr == self.api.listen_addr
            {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.port".to_owned(),
                    reason: "metrics listener collides with the control API listener".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// HTTP 컨트롤 API 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

/// XDP 오브젝트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EbpfConfig {
    /// 컴파일된 XDP 오브젝트 파일 경로
    pub object_path: String,
    /// 오브젝트 안의 XDP 프로그램 이름
    pub program_name: String,
}

impl Default for EbpfConfig {
    fn default() -> Self {
        Self {
            object_path: "/usr/lib/xdpwall/xdpwall-ebpf".to_owned(),
            program_name: "xdpwall_firewall".to_owned(),
        }
    }
}

/// 임시 차단 만료 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryConfig {
    /// 만료된 차단을 주기적으로 해제할지 여부
    pub reaper_enabled: bool,
    /// 만료 스캔 주기 (초)
    pub reap_interval_secs: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            reaper_enabled: true,
            reap_interval_secs: 1,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = XdpwallConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.api.listen_addr, "127.0.0.1");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.ebpf.program_name, "xdpwall_firewall");
        assert!(config.expiry.reaper_enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = XdpwallConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = XdpwallConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.expiry.reap_interval_secs, 1);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[api]
port = 9000
"#;
        let config = XdpwallConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.listen_addr, "127.0.0.1");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = XdpwallConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            XdpwallError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = XdpwallConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = XdpwallConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_api_port() {
        let mut config = XdpwallConfig::default();
        config.api.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.port"));
    }

    #[test]
    fn validate_rejects_zero_reap_interval_when_enabled() {
        let mut config = XdpwallConfig::default();
        config.expiry.reap_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reap_interval_secs"));
    }

    #[test]
    fn validate_accepts_zero_reap_interval_when_disabled() {
        let mut config = XdpwallConfig::default();
        config.expiry.reaper_enabled = false;
        config.expiry.reap_interval_secs = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_metrics_on_api_socket() {
        let mut config = XdpwallConfig::default();
        config.metrics.enabled = true;
        config.metrics.port = config.api.port;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.port"));
    }

    #[test]
    fn validate_rejects_unsupported_metrics_endpoint() {
        let mut config = XdpwallConfig::default();
        config.metrics.enabled = true;
        config.metrics.endpoint = "/stats".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.endpoint"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트 전용 고유 키만 조작합니다.
        unsafe { std::env::set_var("TEST_XDPWALL_STR", "overridden") };
        override_string(&mut val, "TEST_XDPWALL_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_XDPWALL_STR") };
    }

    #[test]
    fn env_override_u16_invalid_keeps_original() {
        let mut val = 8080u16;
        // SAFETY: 테스트 전용 고유 키만 조작합니다.
        unsafe { std::env::set_var("TEST_XDPWALL_U16_BAD", "99999") };
        override_u16(&mut val, "TEST_XDPWALL_U16_BAD");
        assert_eq!(val, 8080);
        unsafe { std::env::remove_var("TEST_XDPWALL_U16_BAD") };
    }

    #[test]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = true;
        // SAFETY: 테스트 전용 고유 키만 조작합니다.
        unsafe { std::env::set_var("TEST_XDPWALL_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_XDPWALL_BOOL_BAD");
        assert!(val);
        unsafe { std::env::remove_var("TEST_XDPWALL_BOOL_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 5u64;
        override_u64(&mut val, "TEST_XDPWALL_NONEXISTENT_12345");
        assert_eq!(val, 5);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = XdpwallConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = XdpwallConfig::parse(&toml_str).unwrap();
        assert_eq!(config.api.port, parsed.api.port);
        assert_eq!(config.ebpf.object_path, parsed.ebpf.object_path);
        assert_eq!(
            config.expiry.reap_interval_secs,
            parsed.expiry.reap_interval_secs
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = XdpwallConfig::from_file("/nonexistent/path/xdpwall.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            XdpwallError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
