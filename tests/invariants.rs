use std::thread;

use dualval::{
    Buffer, ErrorCode, ErrorKind, Heap, Kind, OwningRefCount, Packet, RcKind, RefCount, Safe,
    Unsafe, ValueError, View,
};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn safe_handles_cross_threads() {
    assert_send_sync::<Heap<Safe>>();
    assert_send_sync::<Buffer<Safe>>();
    assert_send_sync::<Packet<Safe>>();
    assert_send_sync::<dualval::SharedBytes<Safe>>();

    let mut obj = Heap::<Safe>::make_object();
    obj.insert("n", 1).unwrap();
    let buf = obj.finalize().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let b = buf.clone();
            thread::spawn(move || {
                assert_eq!(b.at("n").unwrap(), 1);
                let mut local = b.lift().unwrap();
                local.insert("thread", i).unwrap();
                local
            })
        })
        .collect();
    for h in handles {
        let tree = h.join().unwrap();
        assert_eq!(tree.size().unwrap(), 2);
    }
    assert_eq!(buf.use_count(), 1);
}

#[test]
fn policy_tags() {
    assert_eq!(Safe::KIND, RcKind::Safe);
    assert_eq!(Unsafe::KIND, RcKind::Unsafe);
    assert_eq!(<View<'static> as RefCount>::KIND, RcKind::View);
}

#[test]
fn unsafe_counts_track_handles() {
    let mut arr = Heap::<Unsafe>::make_array();
    arr.push_back(1).unwrap();
    let copies: Vec<_> = (0..3).map(|_| arr.clone()).collect();
    assert_eq!(arr.use_count(), 4);
    drop(copies);
    assert_eq!(arr.use_count(), 1);

    let buf = arr.finalize().unwrap();
    let child = buf.at(0).unwrap();
    assert_eq!(buf.use_count(), 2);
    drop(buf);
    assert_eq!(child.use_count(), 1);
    assert_eq!(child, 1);
}

#[test]
fn null_buffer_owns_nothing() {
    let b = Buffer::<Safe>::make_null();
    assert!(b.is_null());
    assert_eq!(b.use_count(), 0);
    assert_eq!(b.kind(), Kind::Null);
    assert_eq!(b.get_bytes().unwrap_err().code, ErrorCode::ExpectedAggregate);
    assert!(b.lift().unwrap().is_null());
    assert_eq!(b, Buffer::<Unsafe>::default());
}

#[test]
fn error_display_names_kind_and_offset() {
    let parse = ValueError::new(ErrorCode::UnknownTypeTag, 17);
    assert_eq!(parse.to_string(), "parse error at 17: unknown type tag");
    assert!(parse.is_parse());

    let logic = ValueError::of(ErrorCode::KeyNotFound);
    assert_eq!(logic.to_string(), "logic error: key not found");
    assert_eq!(logic.kind(), ErrorKind::Logic);

    let err: ValueError = ErrorCode::NotFinalized.into();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(ErrorCode::NullPointer.kind(), ErrorKind::Client);
    assert_eq!(ErrorCode::AllocationFailed.kind(), ErrorKind::Runtime);
    assert_eq!(ErrorCode::InvalidKeyIndex.kind(), ErrorKind::Parse);
}

#[test]
fn kind_helpers() {
    assert!(Kind::Object.is_aggregate());
    assert!(Kind::Array.is_aggregate());
    assert!(Kind::String.is_primitive());
    assert!(Kind::Decimal.is_numeric());
    assert!(!Kind::Null.is_numeric());
    assert_eq!(Kind::Boolean.to_string(), "boolean");
}

#[test]
fn cross_policy_equality() {
    let mut safe = Heap::<Safe>::make_object();
    safe.insert("k", "v").unwrap();
    let local: Heap<Unsafe> = safe.convert();
    let safe_buf = safe.finalize().unwrap();
    let local_buf = local.finalize().unwrap();

    assert_eq!(safe, local);
    assert_eq!(safe_buf, local_buf);
    assert_eq!(local_buf, safe);
    assert_eq!(Packet::from(local_buf), Packet::<Safe>::from(safe));
}

fn owning_roundtrip<R: OwningRefCount>() {
    let mut obj = Heap::<R>::make_object();
    obj.insert("x", [1, 2, 3]).unwrap();
    let buf = obj.finalize().unwrap();
    assert_eq!(buf.lift().unwrap(), obj);
}

#[test]
fn generic_over_policy() {
    owning_roundtrip::<Safe>();
    owning_roundtrip::<Unsafe>();
}
