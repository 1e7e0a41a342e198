#![no_main]

use libfuzzer_sys::fuzz_target;
use xdpwall_ebpf_engine::BlockKey;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // 패닉 없이 Ok 또는 Err을 반환해야 한다
    let Ok(key) = BlockKey::parse(text) else {
        return;
    };

    // 받아들인 입력은 정규 표기이므로 그대로 다시 출력되어야 한다
    assert_eq!(key.to_string(), text);
    assert!(key.contains(key.addr()));
});
