#![no_std]
#![no_main]

mod headers;

use aya_ebpf::{
    bindings::{BPF_F_NO_PREALLOC, xdp_action},
    macros::{map, xdp},
    maps::{LpmTrie, LruPerCpuHashMap, lpm_trie::Key},
    programs::XdpContext,
};
use aya_log_ebpf::debug;
use network_types::{
    eth::{EthHdr, EtherType},
    ip::{IpProto, Ipv4Hdr},
};

use headers::GreHdr;
use xdpwall_ebpf_common::{
    BLOCKED_MAX_ENTRIES, STATS_MAX_ENTRIES, TargetStats, lpm_data_from_octets,
};

#[map]
static BLOCKED_IPV4: LpmTrie<u32, u8> =
    LpmTrie::with_max_entries(BLOCKED_MAX_ENTRIES, BPF_F_NO_PREALLOC);

#[map]
static TARGET_STATS: LruPerCpuHashMap<u32, TargetStats> =
    LruPerCpuHashMap::with_max_entries(STATS_MAX_ENTRIES, 0);

/// 매칭된 방향
#[derive(Clone, Copy)]
enum Side {
    Src,
    Dst,
}

/// XDP 패킷 필터 프로그램
///
/// 출발지 또는 목적지 IPv4 주소가 차단 목록에 매칭되면 카운터를 올리고
/// 드롭합니다. GRE 패킷은 내부 IPv4 헤더도 검사합니다.
#[xdp]
pub fn xdpwall_firewall(ctx: XdpContext) -> u32 {
    match try_firewall(&ctx) {
        Ok(ret) => ret,
        Err(_) => xdp_action::XDP_ABORTED,
    }
}

#[inline(always)]
fn ptr_at<T>(ctx: &XdpContext, offset: usize) -> Result<*const T, ()> {
    let start = ctx.data();
    let end = ctx.data_end();
    if start + offset + core::mem::size_of::<T>() > end {
        return Err(());
    }
    Ok((start + offset) as *const T)
}

fn try_firewall(ctx: &XdpContext) -> Result<u32, ()> {
    let pkt_len = (ctx.data_end() - ctx.data()) as u64;

    let eth: *const EthHdr = ptr_at(ctx, 0)?;
    if !matches!(unsafe { *eth }.ether_type(), Ok(EtherType::Ipv4)) {
        return Ok(xdp_action::XDP_PASS);
    }

    let ip: *const Ipv4Hdr = ptr_at(ctx, EthHdr::LEN)?;
    let (src, dst, proto) = unsafe { ((*ip).src_addr, (*ip).dst_addr, (*ip).proto) };
    if let Some(action) = filter(ctx, src, dst, pkt_len) {
        return Ok(action);
    }

    if proto == IpProto::Gre {
        // 옵션 없는 IPv4 헤더 뒤의 GRE 헤더 + 내부 IPv4 헤더
        let inner_offset = EthHdr::LEN + Ipv4Hdr::LEN + GreHdr::LEN;
        let Ok(inner) = ptr_at::<Ipv4Hdr>(ctx, inner_offset) else {
            return Ok(xdp_action::XDP_DROP);
        };
        let (src, dst) = unsafe { ((*inner).src_addr, (*inner).dst_addr) };
        if let Some(action) = filter(ctx, src, dst, pkt_len) {
            return Ok(action);
        }
    }

    Ok(xdp_action::XDP_PASS)
}

/// 헤더 주소 바이트를 그대로 키 데이터로 사용 (네트워크 바이트 오더 유지)
#[inline(always)]
fn filter(ctx: &XdpContext, src: [u8; 4], dst: [u8; 4], pkt_len: u64) -> Option<u32> {
    let (src, dst) = (lpm_data_from_octets(src), lpm_data_from_octets(dst));
    if is_blocked(src) {
        record(src, Side::Src, pkt_len);
        debug!(ctx, "dropped by source match");
        return Some(xdp_action::XDP_DROP);
    }
    if is_blocked(dst) {
        record(dst, Side::Dst, pkt_len);
        debug!(ctx, "dropped by destination match");
        return Some(xdp_action::XDP_DROP);
    }
    None
}

#[inline(always)]
fn is_blocked(addr: u32) -> bool {
    BLOCKED_IPV4.get(&Key::new(32, addr)).is_some()
}

#[inline(always)]
fn record(addr: u32, side: Side, pkt_len: u64) {
    match TARGET_STATS.get_ptr_mut(&addr) {
        Some(stats) => unsafe {
            match side {
                Side::Src => {
                    (*stats).src_packets += 1;
                    (*stats).src_bytes += pkt_len;
                }
                Side::Dst => {
                    (*stats).dst_packets += 1;
                    (*stats).dst_bytes += pkt_len;
                }
            }
        },
        None => {
            let first = match side {
                Side::Src => TargetStats::first_src(pkt_len),
                Side::Dst => TargetStats::first_dst(pkt_len),
            };
            let _ = TARGET_STATS.insert(&addr, &first, 0);
        }
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
