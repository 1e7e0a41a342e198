#![no_main]

use libfuzzer_sys::fuzz_target;
use xdpwall_ebpf_engine::BlockKey;

fuzz_target!(|input: (u32, u32)| {
    let (prefix_len, data) = input;

    // 커널 키 바이트에서 복원한 키는 같은 바이트로 다시 인코딩되어야 한다
    if let Ok(key) = BlockKey::from_lpm_data(prefix_len, data) {
        assert_eq!(u32::from(key.prefix_len()), prefix_len);
        assert_eq!(key.to_lpm_data(), data);
        if key.is_canonical() {
            assert_eq!(BlockKey::parse(&key.to_string()).ok(), Some(key));
        }
    }
});
