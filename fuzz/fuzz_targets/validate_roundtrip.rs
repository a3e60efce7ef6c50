#![no_main]

use libfuzzer_sys::fuzz_target;

use dualval::{Buffer, ParseLimits};

fn fuzz_limits(input_len: usize) -> ParseLimits {
    let mut limits = ParseLimits::for_bytes(input_len.min(1 << 20));
    limits.max_depth = 64;
    limits.max_container_len = 1 << 12;
    limits
}

fuzz_target!(|data: &[u8]| {
    let Ok(buf) = Buffer::<dualval::Safe>::from_bytes_with_limits(data, fuzz_limits(data.len()))
    else {
        return;
    };
    // Accepted bytes are canonical, so lifting and finalizing again must reproduce them.
    let tree = buf.lift().expect("lift after validation");
    let again = tree.finalize().expect("finalize lifted tree");
    assert_eq!(again.get_bytes().expect("aggregate root"), data);
    assert_eq!(tree, buf);
    assert_eq!(again, buf);
});
