#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz the applier with arbitrary bytes.
    // It must never panic, only return errors.
    let _ = bsdelta::apply_bytes(&[], data);

    // Also fuzz with a non-empty source.
    if data.len() >= 2 {
        let split = data.len() / 2;
        let (source, patch) = data.split_at(split);
        let _ = bsdelta::apply_bytes(source, patch);
    }
});
