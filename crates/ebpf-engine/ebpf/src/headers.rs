//! GRE 헤더 (`network-types`에 없음)

/// 옵션 없는 기본 GRE 헤더 (RFC 2784)
#[repr(C)]
pub struct GreHdr {
    pub flags: u16,
    pub protocol: u16,
}

impl GreHdr {
    pub const LEN: usize = 4;
}
