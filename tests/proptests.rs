// Property-based tests for finalize/validate/lift round trips.
//
// Sizes stay small so the suite runs quickly.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;

use dualval::{validate, values_equal, Buffer, Heap, ParseLimits, Safe};

fn arb_key() -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::char::range('a', 'e'), 0..6)
        .prop_map(|chars| chars.into_iter().collect())
}

fn arb_leaf() -> impl Strategy<Value = Heap> {
    prop_oneof![
        any::<i64>().prop_map(Heap::make_integer),
        any::<i32>().prop_map(|i| Heap::make_integer(i64::from(i))),
        any::<f64>().prop_map(Heap::make_decimal),
        any::<bool>().prop_map(Heap::make_boolean),
        Just(Heap::make_null()),
        ".{0,40}".prop_map(|s| Heap::make_string(&s)),
        // Crosses the short/long string boundary.
        (250usize..300).prop_map(|n| Heap::make_string(&"s".repeat(n))),
    ]
}

fn arb_value() -> impl Strategy<Value = Heap> {
    arb_leaf().prop_recursive(4, 128, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(|items| {
                let mut arr = Heap::<Safe>::make_array();
                for item in items {
                    arr.push_back(item).unwrap();
                }
                arr
            }),
            proptest::collection::vec((arb_key(), inner), 0..8).prop_map(|pairs| {
                let mut obj = Heap::<Safe>::make_object();
                for (k, v) in pairs {
                    obj.insert(k.as_str(), v).unwrap();
                }
                obj
            }),
        ]
    })
}

fn arb_root() -> impl Strategy<Value = Heap> {
    proptest::collection::vec(arb_value(), 0..6).prop_map(|items| {
        let mut arr = Heap::<Safe>::make_array();
        for item in items {
            arr.push_back(item).unwrap();
        }
        arr
    })
}

fn assert_same_key_order(buf: &Buffer, tree: &Heap) {
    if buf.is_object() {
        let keys: Vec<&str> = buf.keys().unwrap().collect();
        let expected: Vec<&str> = tree.keys().unwrap().collect();
        assert_eq!(keys, expected);
        for key in keys {
            assert!(values_equal(&buf.at(key).unwrap(), &tree.at(key).unwrap()));
        }
    }
    if buf.is_aggregate() {
        for (child, node) in buf.values().unwrap().zip(tree.values().unwrap()) {
            assert_same_key_order(&child, node);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn finalize_validate_lift(v in arb_root()) {
        let buf = v.finalize().unwrap();
        let bytes = buf.get_bytes().unwrap();
        validate(bytes, ParseLimits::default()).unwrap();

        let lifted = buf.lift().unwrap();
        prop_assert!(values_equal(&lifted, &v));
        prop_assert!(values_equal(&buf, &v));

        let again = lifted.finalize().unwrap();
        prop_assert_eq!(again.get_bytes().unwrap(), bytes);
        assert_same_key_order(&buf, &v);
    }

    #[test]
    fn validation_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = validate(&bytes, ParseLimits::default());
    }

    #[test]
    fn every_truncation_is_rejected(v in arb_root()) {
        let buf = v.finalize().unwrap();
        let bytes = buf.get_bytes().unwrap();
        for cut in 0..bytes.len() {
            prop_assert!(validate(&bytes[..cut], ParseLimits::default()).is_err());
        }
    }

    #[test]
    fn single_byte_corruption_never_panics(v in arb_root(), idx in any::<prop::sample::Index>(), byte in any::<u8>()) {
        let buf = v.finalize().unwrap();
        let mut bytes = buf.dup_bytes().unwrap();
        let i = idx.index(bytes.len());
        bytes[i] = byte;
        if let Ok(b) = Buffer::<Safe>::from_bytes(&bytes) {
            let lifted = b.lift().unwrap();
            prop_assert!(values_equal(&lifted, &b));
        }
    }
}
