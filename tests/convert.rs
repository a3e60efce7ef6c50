use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use dualval::{CastValue, ErrorCode, FromValue, Heap, Packet, Safe, Unsafe};

#[test]
fn integers_round_trip_through_every_representation() {
    let h: Heap = 42u8.cast().unwrap();
    assert_eq!(u8::from_value(&h).unwrap(), 42);
    assert_eq!(i128::from_value(&h).unwrap(), 42);

    let mut arr = Heap::<Safe>::make_array();
    arr.push_back(-3i16).unwrap();
    let buf = arr.finalize().unwrap();
    assert_eq!(i16::from_value(&buf.at(0).unwrap()).unwrap(), -3);
    assert_eq!(
        u32::from_value(&buf.at(0).unwrap()).unwrap_err().code,
        ErrorCode::IntegerOutOfRange
    );
}

#[test]
fn oversized_natives_are_rejected() {
    let err = u64::MAX.cast::<Safe>().unwrap_err();
    assert_eq!(err.code, ErrorCode::IntegerOutOfRange);
    let err = i128::MIN.cast::<Unsafe>().unwrap_err();
    assert_eq!(err.code, ErrorCode::IntegerOutOfRange);

    let mut arr = Heap::<Safe>::make_array();
    assert_eq!(arr.push_back(u128::MAX).unwrap_err().code, ErrorCode::IntegerOutOfRange);
    assert!(arr.is_empty().unwrap());
}

#[test]
fn wrong_kind_is_type_error() {
    let s = Heap::<Safe>::make_string("nope");
    assert_eq!(i64::from_value(&s).unwrap_err().code, ErrorCode::ExpectedInteger);
    assert_eq!(bool::from_value(&s).unwrap_err().code, ErrorCode::ExpectedBoolean);
    assert_eq!(f64::from_value(&s).unwrap_err().code, ErrorCode::ExpectedNumeric);
    assert_eq!(<()>::from_value(&s).unwrap_err().code, ErrorCode::ExpectedNull);
    assert_eq!(
        Vec::<i64>::from_value(&s).unwrap_err().code,
        ErrorCode::ExpectedArray
    );
    assert_eq!(
        BTreeMap::<String, i64>::from_value(&s).unwrap_err().code,
        ErrorCode::ExpectedObject
    );
}

#[test]
fn decimals_accept_integers() {
    let i = Heap::<Safe>::make_integer(4);
    assert_eq!(f64::from_value(&i).unwrap(), 4.0);
    let d: Heap = 2.5f32.cast().unwrap();
    assert_eq!(f32::from_value(&d).unwrap(), 2.5);
    assert_eq!(d, 2.5f32);
}

#[test]
fn strings_and_chars() {
    let h: Heap = 'é'.cast().unwrap();
    assert_eq!(char::from_value(&h).unwrap(), 'é');
    assert_eq!(String::from_value(&h).unwrap(), "é");
    assert_eq!(h, 'é'.to_string());

    let two: Heap = "ab".cast().unwrap();
    assert_eq!(char::from_value(&two).unwrap_err().code, ErrorCode::ExpectedString);
}

#[test]
fn options_map_to_null() {
    let none: Option<i32> = None;
    let h: Heap = none.cast().unwrap();
    assert!(h.is_null());
    assert_eq!(Option::<i32>::from_value(&h).unwrap(), None);
    assert_eq!(Option::<i32>::from_value(&Heap::<Safe>::make_integer(3)).unwrap(), Some(3));
    assert_eq!(Option::<u8>::from_missing(), Some(None));
    assert_eq!(u8::from_missing(), None);
}

#[test]
fn sequences() {
    let v = vec![1i64, 2, 3];
    let h: Heap = v.cast().unwrap();
    assert_eq!(h.size().unwrap(), 3);
    assert_eq!(Vec::<i64>::from_value(&h).unwrap(), v);
    assert_eq!(VecDeque::<i64>::from_value(&h).unwrap(), VecDeque::from(v.clone()));

    let arr: Heap<Unsafe> = ["x", "y"].cast().unwrap();
    let set = BTreeSet::<String>::from_value(&arr).unwrap();
    assert!(set.contains("x") && set.contains("y"));

    let slice: &[bool] = &[true, false];
    let h: Heap = slice.cast().unwrap();
    assert_eq!(h.at(1).unwrap(), false);
}

#[test]
fn maps() {
    let mut m = BTreeMap::new();
    m.insert("b", 2i32);
    m.insert("a", 1i32);
    let h: Heap = m.cast().unwrap();
    let keys: Vec<&str> = h.keys().unwrap().collect();
    assert_eq!(keys, ["a", "b"]);

    let buf = h.finalize().unwrap();
    let back = HashMap::<String, i32>::from_value(&buf).unwrap();
    assert_eq!(back.get("a"), Some(&1));
    assert_eq!(back.get("b"), Some(&2));
}

#[test]
fn wrappers_delegate() {
    let boxed = Box::new(7i32);
    let h: Heap = boxed.cast().unwrap();
    assert_eq!(h, 7);
    let shared = Arc::<i64>::from_value(&h).unwrap();
    assert_eq!(*shared, 7);
    let r = &&"deep";
    assert_eq!(r.cast::<Safe>().unwrap(), "deep");
}

#[test]
fn trees_share_under_the_same_policy() {
    let mut obj = Heap::<Safe>::make_object();
    obj.insert("k", 1).unwrap();
    let same: Heap<Safe> = obj.cast().unwrap();
    assert!(same.ptr_eq(&obj));

    let other: Heap<Unsafe> = obj.cast().unwrap();
    assert_eq!(other, obj);
}

#[test]
fn representations_extract_into_each_other() {
    let mut obj = Heap::<Safe>::make_object();
    obj.insert("k", vec![1, 2]).unwrap();
    let buf = obj.finalize().unwrap();

    let lifted = Heap::<Unsafe>::from_value(&buf).unwrap();
    assert_eq!(lifted, obj);
    let pkt = Packet::<Safe>::from_value(&buf).unwrap();
    assert!(!pkt.is_finalized());
    let rebuilt = dualval::Buffer::<Unsafe>::from_value(&lifted).unwrap();
    assert_eq!(rebuilt, buf);

    let as_tree: Heap = buf.cast().unwrap();
    assert_eq!(as_tree, obj);
}

#[test]
fn native_equality_is_symmetric() {
    let h = Heap::<Safe>::make_string("text");
    assert!(h == "text");
    assert!("text" == h);
    assert!(h != 1);
    let n = Heap::<Safe>::make_integer(1);
    assert!(n == 1u8);
    assert!(1i64 == n);
    assert!(n != 1.0);
    assert!(Heap::<Safe>::make_null() == ());
}
