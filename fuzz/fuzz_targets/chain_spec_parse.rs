#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Construction validates module configuration without running setup, so
    // no grids or tables sized by untrusted fields get allocated here.
    if let Ok(spec) = fm_chain::ChainSpec::from_json_str(text) {
        let _ = spec.build();
    }
});
