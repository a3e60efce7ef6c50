#![no_main]

use libfuzzer_sys::fuzz_target;

use dualval::{Buffer, ParseLimits, View};

fn walk(v: &Buffer<View<'_>>, depth: usize) {
    let _ = v.kind();
    let _ = v.as_str();
    let _ = v.as_i64();
    let _ = v.as_f64();
    let _ = v.as_bool();
    if depth == 0 {
        return;
    }
    if let Ok(keys) = v.keys() {
        for k in keys.take(8) {
            let hit = v.get(k).expect("listed key must resolve");
            walk(&hit, depth - 1);
        }
    }
    if let Ok(values) = v.values() {
        for child in values.take(8) {
            walk(&child, depth - 1);
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let limits = ParseLimits::for_bytes(data.len().min(1 << 20));
    if let Ok(root) = Buffer::<View<'_>>::from_storage(data, limits) {
        walk(&root, 16);
        let _ = root.get("missing");
        let _ = root.get(0usize);
    }
});
