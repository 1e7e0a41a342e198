//! 주소/키 코덱 — CIDR 텍스트와 커널 공유 키 변환
//!
//! [`BlockKey`]는 차단 목록 LpmTrie의 키이자 만료 테이블의 키입니다.
//! 텍스트 형식은 정규형만 허용합니다.
//!
//! - 접두사 길이는 필수 (`10.0.0.0`은 거부)
//! - 옥텟과 접두사 길이에 선행 0 금지 (`010.0.0.0/8`, `10.0.0.0/08`은 거부)
//! - 접두사 밖의 호스트 비트는 0이어야 함 (`10.0.0.5/24`는 거부)
//!
//! 따라서 허용된 모든 입력 `x`에 대해 `parse(x).to_string() == x`가 성립합니다.
//!
//! 커널 테이블에서 읽은 키는 다른 도구(bpftool 등)가 넣었을 수 있으므로
//! [`BlockKey::from_lpm_data`]는 호스트 비트를 거부하지 않고 저장된 그대로
//! 보존합니다. 그래야 같은 키로 정확히 삭제할 수 있습니다.
//!
//! # 커널 레이아웃
//! ```text
//! LpmTrie 키:  prefix_len (u32, host order) | addr (4 bytes, network order)
//! 카운터 키:   addr (u32, 메모리상 network order)
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;
use xdpwall_core::error::ControlError;
use xdpwall_ebpf_common::{lpm_data_from_octets, lpm_data_to_octets};

/// IPv4 최대 접두사 길이
pub const MAX_PREFIX_LEN: u8 = 32;

/// 차단 목록 키 (접두사 길이 + 네트워크 주소)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(Ipv4Network);

impl BlockKey {
    /// 네트워크 주소와 접두사 길이로 키를 생성합니다.
    ///
    /// 호스트 비트가 설정되어 있으면 `InvalidAddress`를 반환합니다.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, ControlError> {
        let input = format!("{addr}/{prefix_len}");
        let net = Ipv4Network::new(addr, prefix_len)
            .map_err(|e| invalid(&input, &e.to_string()))?;
        if net.network() != addr {
            return Err(invalid(
                &input,
                &format!("host bits set, network address is {}", net.network()),
            ));
        }
        Ok(Self(net))
    }

    /// CIDR 텍스트를 파싱합니다.
    pub fn parse(text: &str) -> Result<Self, ControlError> {
        let (addr_part, prefix_part) = text
            .split_once('/')
            .ok_or_else(|| invalid(text, "missing prefix length"))?;

        let addr = Ipv4Addr::from_str(addr_part)
            .map_err(|_| invalid(text, "not a dotted-decimal IPv4 address"))?;
        let prefix_len = parse_prefix_len(prefix_part).ok_or_else(|| {
            invalid(text, "prefix length must be a decimal number between 0 and 32")
        })?;

        Self::new(addr, prefix_len).map_err(|_| {
            invalid(text, "host bits set beyond the prefix length")
        })
    }

    /// 키에 저장된 주소 (정규형 키는 네트워크 주소와 같음)
    pub fn addr(&self) -> Ipv4Addr {
        self.0.ip()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix()
    }

    /// 주소가 이 CIDR 범위에 포함되는지 확인합니다.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.0.contains(addr)
    }

    /// LpmTrie 키의 데이터 부분 (메모리상 network order)
    pub fn to_lpm_data(&self) -> u32 {
        lpm_data_from_octets(self.addr().octets())
    }

    /// 호스트 비트가 0인지 확인합니다.
    pub fn is_canonical(&self) -> bool {
        self.0.ip() == self.0.network()
    }

    /// LpmTrie 키(접두사 길이 + 데이터)에서 키를 복원합니다.
    ///
    /// 접두사 길이만 검사하고 데이터는 저장된 그대로 보존합니다.
    pub fn from_lpm_data(prefix_len: u32, data: u32) -> Result<Self, ControlError> {
        let addr = Ipv4Addr::from(lpm_data_to_octets(data));
        let input = format!("{addr}/{prefix_len}");
        let prefix_len = u8::try_from(prefix_len)
            .ok()
            .filter(|p| *p <= MAX_PREFIX_LEN)
            .ok_or_else(|| invalid(&input, "prefix length out of range"))?;
        Ipv4Network::new(addr, prefix_len)
            .map(Self)
            .map_err(|e| invalid(&input, &e.to_string()))
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.prefix_len())
    }
}

impl FromStr for BlockKey {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// 카운터 테이블 키를 IPv4 주소로 변환합니다.
pub fn target_from_counter_key(raw: u32) -> Ipv4Addr {
    Ipv4Addr::from(raw.to_ne_bytes())
}

/// IPv4 주소를 카운터 테이블 키로 변환합니다.
pub fn counter_key_from_target(addr: Ipv4Addr) -> u32 {
    u32::from_ne_bytes(addr.octets())
}

fn parse_prefix_len(s: &str) -> Option<u8> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse::<u8>().ok().filter(|p| *p <= MAX_PREFIX_LEN)
}

fn invalid(input: &str, reason: &str) -> ControlError {
    ControlError::InvalidAddress {
        input: input.to_owned(),
        reason: reason.to_owned(),
    }
}
