#![no_main]

use libfuzzer_sys::fuzz_target;

use dualval::{validate, ParseLimits};

fn fuzz_limits(input_len: usize) -> ParseLimits {
    let mut limits = ParseLimits::for_bytes(input_len.min(1 << 20));
    limits.max_depth = 64;
    limits.max_container_len = 1 << 12;
    limits
}

fuzz_target!(|data: &[u8]| {
    let _ = validate(data, fuzz_limits(data.len()));
});
