use dualval::{ErrorCode, ErrorKind, Heap, Kind, PathElem, Safe, Unsafe};

fn sample() -> Heap {
    let mut obj = Heap::make_object();
    obj.insert("hello", "world").unwrap();
    obj.insert("int", 5).unwrap();
    obj.insert("pi", 3.14159).unwrap();
    obj.insert("bool", true).unwrap();
    obj
}

#[test]
fn object_scenario() {
    let obj = sample();
    assert_eq!(obj.kind(), Kind::Object);
    assert_eq!(obj.size().unwrap(), 4);
    assert_eq!(obj.at("hello").unwrap(), "world");
    assert_eq!(obj.at("int").unwrap(), 5);
    assert_eq!(obj.at("pi").unwrap(), 3.14159);
    assert_eq!(obj.at("bool").unwrap(), true);
    assert!(obj.get("missing").unwrap().is_null());
}

#[test]
fn array_scenario() {
    let mut arr = Heap::<Safe>::make_array();
    arr.push_back(1).unwrap();
    arr.push_back(3.14159).unwrap();
    arr.push_back(false).unwrap();
    arr.push_back("fixed").unwrap();
    arr.push_back(String::from("dynamic")).unwrap();

    assert_eq!(arr.size().unwrap(), 5);
    assert_eq!(arr.at(0).unwrap(), 1);
    assert_eq!(arr.at(1).unwrap().decimal().unwrap(), 3.14159);
    assert_eq!(arr.at(2).unwrap(), false);
    assert_eq!(arr.at(3).unwrap(), "fixed");
    assert_eq!(arr.at(4).unwrap(), "dynamic");
    assert!(arr.get(5).unwrap().is_null());
    assert_eq!(arr.at(5).unwrap_err().code, ErrorCode::IndexOutOfBounds);
}

#[test]
fn keys_keep_insertion_order() {
    let obj = sample();
    let keys: Vec<&str> = obj.keys().unwrap().collect();
    assert_eq!(keys, ["hello", "int", "pi", "bool"]);
}

#[test]
fn upsert_keeps_position() {
    let mut obj = sample();
    obj.insert("int", "five").unwrap();
    let keys: Vec<&str> = obj.keys().unwrap().collect();
    assert_eq!(keys, ["hello", "int", "pi", "bool"]);
    assert_eq!(obj.at("int").unwrap(), "five");
}

#[test]
fn erase_preserves_remaining_order() {
    let mut obj = sample();
    let removed = obj.erase("int").unwrap().unwrap();
    assert_eq!(removed, 5);
    assert!(obj.erase("int").unwrap().is_none());
    let keys: Vec<&str> = obj.keys().unwrap().collect();
    assert_eq!(keys, ["hello", "pi", "bool"]);
}

#[test]
fn at_missing_key_is_logic_error() {
    let err = sample().at("nope").unwrap_err();
    assert_eq!(err.code, ErrorCode::KeyNotFound);
    assert_eq!(err.kind(), ErrorKind::Logic);
}

#[test]
fn selector_kind_mismatch_is_type_error() {
    let obj = sample();
    let err = obj.get(0).unwrap_err();
    assert_eq!(err.code, ErrorCode::ExpectedArray);
    assert_eq!(err.kind(), ErrorKind::Type);

    let arr = Heap::<Unsafe>::make_array();
    assert_eq!(arr.get("k").unwrap_err().code, ErrorCode::ExpectedObject);
}

#[test]
fn size_of_scalars_is_type_error() {
    for v in [
        Heap::<Unsafe>::make_integer(1),
        Heap::make_decimal(1.0),
        Heap::make_boolean(true),
        Heap::make_null(),
    ] {
        assert_eq!(v.size().unwrap_err().code, ErrorCode::NotSized);
    }
    assert_eq!(Heap::<Unsafe>::make_string("abc").size().unwrap(), 3);
}

#[test]
fn typed_accessors_reject_other_kinds() {
    let v = Heap::<Unsafe>::make_string("x");
    assert_eq!(v.integer().unwrap_err().code, ErrorCode::ExpectedInteger);
    assert_eq!(v.boolean().unwrap_err().code, ErrorCode::ExpectedBoolean);
    assert_eq!(v.decimal().unwrap_err().code, ErrorCode::ExpectedDecimal);
    assert_eq!(v.numeric().unwrap_err().code, ErrorCode::ExpectedNumeric);
    assert_eq!(Heap::<Unsafe>::make_integer(7).numeric().unwrap(), 7.0);
}

#[test]
fn array_editing() {
    let mut arr = Heap::<Unsafe>::make_array();
    arr.push_back(2).unwrap();
    arr.push_front(1).unwrap();
    arr.insert(2, 3).unwrap();
    arr.set(0, "one").unwrap();
    assert_eq!(arr.size().unwrap(), 3);
    assert_eq!(arr.at(0).unwrap(), "one");

    assert_eq!(arr.insert(9, 0).unwrap_err().code, ErrorCode::IndexOutOfBounds);
    assert_eq!(arr.set(3, 0).unwrap_err().code, ErrorCode::IndexOutOfBounds);

    assert_eq!(arr.pop_back().unwrap().unwrap(), 3);
    assert_eq!(arr.pop_front().unwrap().unwrap(), "one");
    assert_eq!(arr.erase(0).unwrap().unwrap(), 2);
    assert!(arr.pop_back().unwrap().is_none());
    assert!(arr.is_empty().unwrap());
}

#[test]
fn push_on_object_fails() {
    let mut obj = Heap::<Unsafe>::make_object();
    assert_eq!(obj.push_back(1).unwrap_err().code, ErrorCode::ExpectedArray);
    assert_eq!(obj.pop_front().unwrap_err().code, ErrorCode::ExpectedArray);
}

#[test]
fn clear_empties_aggregates_only() {
    let mut obj = sample();
    obj.clear().unwrap();
    assert!(obj.is_empty().unwrap());
    let mut n = Heap::<Unsafe>::make_integer(1);
    assert_eq!(n.clear().unwrap_err().code, ErrorCode::ExpectedAggregate);
}

#[test]
fn paths() {
    let mut inner = Heap::<Safe>::make_array();
    inner.push_back("deep").unwrap();
    let mut obj = sample();
    obj.insert("list", inner).unwrap();

    let path = [PathElem::from("list"), PathElem::from(0)];
    assert_eq!(obj.at_path(&path).unwrap(), "deep");

    let missing = [PathElem::from("list"), PathElem::from(4)];
    assert!(obj.get_path(&missing).unwrap().is_null());
    assert_eq!(obj.at_path(&missing).unwrap_err().code, ErrorCode::IndexOutOfBounds);

    let wrong = [PathElem::from("hello"), PathElem::from("x")];
    assert_eq!(obj.get_path(&wrong).unwrap_err().code, ErrorCode::ExpectedObject);
}

#[test]
fn copies_share_until_written() {
    let original = sample();
    let mut copy = original.clone();
    assert!(copy.ptr_eq(&original));
    assert_eq!(original.use_count(), 2);

    copy.insert("extra", 1).unwrap();
    assert!(!copy.ptr_eq(&original));
    assert_eq!(original.use_count(), 1);
    assert!(!original.contains_key("extra").unwrap());
    assert_eq!(copy.size().unwrap(), 5);
}

#[test]
fn nested_write_does_not_leak_into_siblings() {
    let mut obj = Heap::<Unsafe>::make_object();
    obj.insert("child", Heap::<Unsafe>::make_array()).unwrap();
    let snapshot = obj.clone();

    let mut child = obj.at("child").unwrap();
    child.push_back(1).unwrap();
    obj.set("child", child).unwrap();

    assert_eq!(obj.at("child").unwrap().size().unwrap(), 1);
    assert_eq!(snapshot.at("child").unwrap().size().unwrap(), 0);
}

#[test]
fn iterators_are_double_ended() {
    let obj = sample();
    let mut entries = obj.entries().unwrap();
    assert_eq!(entries.len(), 4);
    let (k, v) = entries.next_back().unwrap();
    assert_eq!(k, "bool");
    assert_eq!(*v, true);

    let vals: Vec<_> = obj.values().unwrap().rev().collect();
    assert_eq!(*vals[0], true);
    assert_eq!(*vals[3], "world");

    assert_eq!(
        Heap::<Unsafe>::make_integer(1).keys().unwrap_err().code,
        ErrorCode::ExpectedObject
    );
}

#[test]
fn convert_changes_policy_not_content() {
    let safe = sample();
    let local: Heap<Unsafe> = safe.convert();
    assert_eq!(local, safe);
    assert_eq!(safe.use_count(), 1);
}

#[test]
fn long_strings_are_shared() {
    let long = "x".repeat(200);
    let v = Heap::<Unsafe>::make_string(&long);
    let w = v.clone();
    assert!(v.ptr_eq(&w));
    assert_eq!(w.str().unwrap(), long);
}

#[test]
fn debug_renders_json_like() {
    let mut obj = Heap::<Unsafe>::make_object();
    obj.insert("a", 1).unwrap();
    obj.insert("b", Heap::<Unsafe>::make_null()).unwrap();
    assert_eq!(format!("{obj:?}"), r#"{"a": 1, "b": null}"#);
}
