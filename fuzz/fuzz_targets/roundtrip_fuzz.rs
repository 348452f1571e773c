#![no_main]
use libfuzzer_sys::fuzz_target;

use bsdelta::{apply_bytes, diff_with_options, DiffOptions, SearcherKind};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the configuration, the rest splits into inputs.
    let flags = data[0];
    let payload = &data[1..];
    let split = payload.len() / 2;
    let (source, target) = payload.split_at(split);

    let opts = DiffOptions {
        searcher: if flags & 1 != 0 {
            SearcherKind::Lcp
        } else {
            SearcherKind::Plain
        },
        threads: 1 + (flags >> 1) as usize % 4,
        compression: 1,
    };

    let mut patch = Vec::new();
    diff_with_options(source, target, &mut patch, &opts).unwrap();
    let restored = apply_bytes(source, &patch).unwrap();
    assert_eq!(restored, target);
});
