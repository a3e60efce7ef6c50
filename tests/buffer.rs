use dualval::{
    Buffer, ErrorCode, ErrorKind, Heap, Kind, ParseLimits, PathElem, Safe, Storage, Unsafe, View,
};

fn sample() -> Heap {
    let mut obj = Heap::make_object();
    obj.insert("hello", "world").unwrap();
    obj.insert("int", 5).unwrap();
    obj.insert("pi", 3.14159).unwrap();
    obj.insert("bool", true).unwrap();
    obj
}

#[test]
fn finalized_object_keeps_values() {
    let buf = sample().finalize().unwrap();
    assert_eq!(buf.kind(), Kind::Object);
    assert_eq!(buf.size().unwrap(), 4);
    assert_eq!(buf.at("hello").unwrap().str().unwrap(), "world");
    assert_eq!(buf.at("int").unwrap().integer().unwrap(), 5);
    assert_eq!(buf.at("pi").unwrap().decimal().unwrap(), 3.14159);
    assert!(buf.at("bool").unwrap().boolean().unwrap());
    assert!(buf.get("missing").unwrap().is_null());
    assert_eq!(buf.at("missing").unwrap_err().code, ErrorCode::KeyNotFound);
}

#[test]
fn finalized_array_iterates_in_order() {
    let mut arr = Heap::<Unsafe>::make_array();
    arr.push_back(1).unwrap();
    arr.push_back(3.14159).unwrap();
    arr.push_back(false).unwrap();
    arr.push_back("fixed").unwrap();
    arr.push_back(String::from("dynamic")).unwrap();
    let buf = arr.finalize().unwrap();

    let kinds: Vec<Kind> = buf.values().unwrap().map(|v| v.kind()).collect();
    assert_eq!(
        kinds,
        [Kind::Integer, Kind::Decimal, Kind::Boolean, Kind::String, Kind::String]
    );
    let vals: Vec<Buffer<Unsafe>> = buf.values().unwrap().collect();
    assert_eq!(vals[0], 1);
    assert_eq!(vals[1], 3.14159);
    assert_eq!(vals[2], false);
    assert_eq!(vals[3], "fixed");
    assert_eq!(vals[4], "dynamic");
}

#[test]
fn object_keys_keep_insertion_order() {
    let buf = sample().finalize().unwrap();
    let keys: Vec<&str> = buf.keys().unwrap().collect();
    assert_eq!(keys, ["hello", "int", "pi", "bool"]);

    let (k, v) = buf.entries().unwrap().next_back().unwrap();
    assert_eq!(k, "bool");
    assert_eq!(v, true);
}

#[test]
fn lookup_finds_every_key() {
    let mut obj = Heap::<Unsafe>::make_object();
    let keys: Vec<String> = (0..200)
        .rev()
        .map(|i| match i % 3 {
            0 => format!("k{i}"),
            1 => format!("ключ{i}"),
            _ => "é".repeat(i % 7 + 1) + &i.to_string(),
        })
        .collect();
    for (i, key) in keys.iter().enumerate() {
        obj.insert(key.as_str(), i).unwrap();
    }
    let buf = obj.finalize().unwrap();

    assert_eq!(buf.keys().unwrap().collect::<Vec<_>>(), keys);
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(buf.at(key.as_str()).unwrap(), i, "{key}");
    }
    assert!(buf.get("k").unwrap().is_null());
    assert!(buf.get("ключ").unwrap().is_null());
    assert!(buf.get("").unwrap().is_null());
}

#[test]
fn finalize_rejects_scalars() {
    let err = Heap::<Unsafe>::make_integer(1).finalize().unwrap_err();
    assert_eq!(err.code, ErrorCode::ExpectedAggregate);
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn shared_bytes_outlive_the_buffer() {
    let buf = sample().finalize().unwrap();
    let expected = buf.dup_bytes().unwrap();
    let shared = buf.share_bytes().unwrap();
    assert_eq!(buf.use_count(), 2);
    drop(buf);
    assert_eq!(shared.use_count(), 1);
    assert_eq!(&*shared, expected.as_slice());

    let again = Buffer::<Unsafe>::from_bytes(&shared).unwrap();
    assert_eq!(again.at("int").unwrap(), 5);
}

#[test]
fn nested_bytes_are_a_valid_buffer() {
    let mut inner = Heap::<Safe>::make_array();
    inner.push_back("a").unwrap();
    inner.push_back(Heap::<Safe>::make_null()).unwrap();
    let mut outer = sample();
    outer.insert("inner", inner.clone()).unwrap();

    let buf = outer.finalize().unwrap();
    let child = buf.at("inner").unwrap();
    assert_eq!(child.use_count(), buf.use_count());
    let copy = Buffer::<Unsafe>::from_bytes(child.get_bytes().unwrap()).unwrap();
    assert_eq!(copy, inner);
}

#[test]
fn adopted_storage_is_not_copied() {
    let bytes = sample().finalize().unwrap().dup_bytes().unwrap();
    let ptr = bytes.as_ptr();
    let limits = ParseLimits::default();
    let buf = Buffer::<Safe>::from_storage(Storage::from(bytes), limits).unwrap();
    assert_eq!(buf.get_bytes().unwrap().as_ptr(), ptr);
    assert_eq!(buf.share_bytes().unwrap().as_ptr(), ptr);

    let local = buf.dup_bytes().unwrap();
    let ptr = local.as_ptr();
    let buf = Buffer::<Unsafe>::from_storage(Storage::from(local), limits).unwrap();
    assert_eq!(buf.get_bytes().unwrap().as_ptr(), ptr);
    assert_eq!(buf.at("int").unwrap(), 5);
}

#[test]
fn bytes_of_scalars_are_refused() {
    let buf = sample().finalize().unwrap();
    let int = buf.at("int").unwrap();
    assert_eq!(int.get_bytes().unwrap_err().code, ErrorCode::ExpectedAggregate);
    assert_eq!(int.dup_bytes().unwrap_err().code, ErrorCode::ExpectedAggregate);
}

#[test]
fn truncated_copy_fails_validation() {
    let buf = sample().finalize().unwrap();
    let bytes = buf.get_bytes().unwrap();
    for cut in 0..bytes.len() {
        let err = Buffer::<Unsafe>::from_bytes(&bytes[..cut]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "cut at {cut}");
    }
    let err = Buffer::<Unsafe>::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
    assert_eq!(err.code, ErrorCode::AggregateLengthOverflow);
}

#[test]
fn lift_round_trips_structure() {
    let tree = sample();
    let buf = tree.finalize().unwrap();
    let lifted = buf.lift().unwrap();
    assert_eq!(lifted, tree);
    assert_eq!(buf.definalize().unwrap(), buf);

    let keys: Vec<&str> = lifted.keys().unwrap().collect();
    assert_eq!(keys, ["hello", "int", "pi", "bool"]);
}

#[test]
fn views_borrow_without_counting() {
    let buf = sample().finalize().unwrap();
    let view = buf.view();
    assert_eq!(view.use_count(), 0);
    assert_eq!(buf.use_count(), 1);
    assert_eq!(view.at("hello").unwrap(), "world");

    let bytes = buf.dup_bytes().unwrap();
    let borrowed = Buffer::<View<'_>>::from_view(&bytes).unwrap();
    assert_eq!(borrowed, buf);
    let owned: Heap<Unsafe> = borrowed.lift_into().unwrap();
    assert_eq!(owned, buf);
}

#[test]
fn transmogrify_copies_into_another_policy() {
    let buf = sample().finalize().unwrap();
    let local: Buffer<Unsafe> = buf.transmogrify().unwrap();
    assert_eq!(local, buf);
    assert_eq!(local.use_count(), 1);
    assert_eq!(buf.use_count(), 1);
}

#[test]
fn equality_identity_then_bytes_then_structure() {
    let a = sample().finalize().unwrap();
    let b = a.clone();
    assert!(a.same_as(&b));
    assert_eq!(a, b);

    let c = sample().finalize().unwrap();
    assert!(!a.same_as(&c));
    assert_eq!(a, c);

    let mut other = sample();
    other.insert("int", 6).unwrap();
    assert_ne!(a, other.finalize().unwrap());
}

#[test]
fn paths_on_buffers() {
    let mut outer = Heap::<Unsafe>::make_object();
    let mut list = Heap::<Unsafe>::make_array();
    list.push_back(sample().convert::<Unsafe>()).unwrap();
    outer.insert("list", list).unwrap();
    let buf = outer.finalize().unwrap();

    let path = [PathElem::from("list"), PathElem::from(0), PathElem::from("pi")];
    assert_eq!(buf.at_path(&path).unwrap(), 3.14159);
    let missing = [PathElem::from("list"), PathElem::from(3)];
    assert!(buf.get_path(&missing).unwrap().is_null());
    assert!(buf.contains_key("list").unwrap());
    assert_eq!(
        buf.at("list").unwrap().contains_key("x").unwrap_err().code,
        ErrorCode::ExpectedObject
    );
}

#[test]
fn large_integers_and_long_strings_survive() {
    let long = "y".repeat(1000);
    let mut obj = Heap::<Unsafe>::make_object();
    obj.insert("big", i64::MAX).unwrap();
    obj.insert("small", i64::from(i32::MIN)).unwrap();
    obj.insert("long", long.as_str()).unwrap();
    let buf = obj.finalize().unwrap();
    assert_eq!(buf.at("big").unwrap().integer().unwrap(), i64::MAX);
    assert_eq!(buf.at("small").unwrap().integer().unwrap(), i64::from(i32::MIN));
    assert_eq!(buf.at("long").unwrap().str().unwrap(), long);
}

#[cfg(feature = "sha2")]
#[test]
fn digest_depends_only_on_content() {
    let a = sample().finalize().unwrap();
    let b = sample().finalize().unwrap();
    assert_eq!(a.sha256().unwrap(), b.sha256().unwrap());
    assert_eq!(
        a.at("int").unwrap().sha256().unwrap_err().code,
        ErrorCode::ExpectedAggregate
    );
}
