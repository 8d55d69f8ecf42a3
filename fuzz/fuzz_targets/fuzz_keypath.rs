#![no_main]

use libfuzzer_sys::fuzz_target;
use hwlink_core::{check_address_path, classify, format_path, parse_path, Network, HARDENED};

fuzz_target!(|data: &[u8]| {
    // Path strings
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(path) = parse_path(text) {
            let reparsed = parse_path(&format_path(&path)).unwrap();
            assert_eq!(path, reparsed);
        }
    }

    // Raw components, up to six of them
    let components: Vec<u32> = data
        .chunks_exact(4)
        .take(6)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    for network in [Network::Mainnet, Network::Testnet] {
        if let Ok(script_type) = classify(&components, network) {
            assert_eq!(components[0], script_type.purpose());
            assert_eq!(components[1], network.coin_type());
            assert!(components[2] & HARDENED != 0);
        }
        for purpose in [49 | HARDENED, 84 | HARDENED] {
            if check_address_path(&components, purpose, network) {
                assert_eq!(components.len(), 5);
                assert_eq!(components[0], purpose);
            }
        }
    }
});
