#![cfg(feature = "abi")]

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};

use dualval::abi::*;
use dualval::{ErrorCode, ErrorKind, ValueError};

fn key(s: &str) -> (*const c_char, usize) {
    (s.as_ptr().cast(), s.len())
}

fn any<T>(h: &T) -> *const c_void {
    (h as *const T).cast()
}

fn any_mut<T>(h: &mut T) -> *mut c_void {
    (h as *mut T).cast()
}

fn last_error() -> String {
    unsafe { CStr::from_ptr(dualval_get_error()) }
        .to_string_lossy()
        .into_owned()
}

#[test]
fn build_finalize_and_inspect() {
    unsafe {
        let mut obj = DualvalHeap::uninit();
        assert_eq!(dualval_heap_init_obj(&mut obj), DualvalErr::NoError);

        let mut val = DualvalHeap::uninit();
        let (s, n) = key("world");
        assert_eq!(dualval_heap_init_str(&mut val, s, n), DualvalErr::NoError);
        let (k, kn) = key("hello");
        assert_eq!(dualval_heap_insert(&mut obj, k, kn, &val), DualvalErr::NoError);
        assert_eq!(dualval_heap_destroy(&mut val), DualvalErr::NoError);

        let mut int = DualvalHeap::uninit();
        assert_eq!(
            dualval_heap_init_int_rc(&mut int, DUALVAL_RC_UNSAFE, 5),
            DualvalErr::NoError
        );
        let (k, kn) = key("int");
        assert_eq!(dualval_heap_insert(&mut obj, k, kn, &int), DualvalErr::NoError);
        assert_eq!(dualval_destroy(any_mut(&mut int)), DualvalErr::NoError);

        let mut size = 0usize;
        assert_eq!(dualval_size(any(&obj), &mut size), DualvalErr::NoError);
        assert_eq!(size, 2);

        let mut buf = DualvalBuffer::uninit();
        assert_eq!(dualval_heap_finalize(&mut buf, &obj), DualvalErr::NoError);
        let mut ty = DualvalType::Null;
        assert_eq!(dualval_get_type(any(&buf), &mut ty), DualvalErr::NoError);
        assert_eq!(ty, DualvalType::Object);

        let mut eq: c_int = 0;
        assert_eq!(dualval_equal(any(&obj), any(&buf), &mut eq), DualvalErr::NoError);
        assert_eq!(eq, 1);

        let mut ptr: *const u8 = std::ptr::null();
        let mut len = 0usize;
        assert_eq!(dualval_buffer_get_bytes(&buf, &mut ptr, &mut len), DualvalErr::NoError);
        let bytes = std::slice::from_raw_parts(ptr, len);
        let copy = dualval::Buffer::<dualval::Safe>::from_bytes(bytes).unwrap();
        assert_eq!(copy.at("hello").unwrap(), "world");
        assert_eq!(copy.at("int").unwrap(), 5);

        let mut from_bytes = DualvalBuffer::uninit();
        assert_eq!(
            dualval_buffer_init_bytes_rc(&mut from_bytes, DUALVAL_RC_UNSAFE, ptr, len),
            DualvalErr::NoError
        );
        assert_eq!(from_bytes.rtti.rc_id, DUALVAL_RC_UNSAFE);
        assert_eq!(dualval_equal(any(&buf), any(&from_bytes), &mut eq), DualvalErr::NoError);
        assert_eq!(eq, 1);

        let mut lifted = DualvalHeap::uninit();
        assert_eq!(dualval_buffer_lift(&mut lifted, &from_bytes), DualvalErr::NoError);
        assert_eq!(lifted.rtti.rc_id, DUALVAL_RC_UNSAFE);

        for h in [
            any_mut(&mut obj),
            any_mut(&mut buf),
            any_mut(&mut from_bytes),
            any_mut(&mut lifted),
        ] {
            assert_eq!(dualval_destroy(h), DualvalErr::NoError);
        }
    }
}

#[test]
fn packets_switch_representation() {
    unsafe {
        let mut pkt = DualvalPacket::uninit();
        assert_eq!(dualval_packet_init_arr(&mut pkt), DualvalErr::NoError);
        assert_eq!(dualval_packet_finalize(&mut pkt), DualvalErr::NoError);

        let mut size = 1usize;
        assert_eq!(dualval_size(any(&pkt), &mut size), DualvalErr::NoError);
        assert_eq!(size, 0);

        let mut copy = DualvalPacket::uninit();
        assert_eq!(dualval_packet_copy(&mut copy, &pkt), DualvalErr::NoError);
        assert_eq!(dualval_packet_lift(&mut pkt), DualvalErr::NoError);

        let mut eq: c_int = 0;
        assert_eq!(dualval_equal(any(&pkt), any(&copy), &mut eq), DualvalErr::NoError);
        assert_eq!(eq, 1);

        let mut moved = DualvalPacket::uninit();
        assert_eq!(dualval_packet_move(&mut moved, &mut copy), DualvalErr::NoError);
        let mut ty = DualvalType::Object;
        assert_eq!(dualval_get_type(any(&copy), &mut ty), DualvalErr::NoError);
        assert_eq!(ty, DualvalType::Null);
        assert_eq!(dualval_get_type(any(&moved), &mut ty), DualvalErr::NoError);
        assert_eq!(ty, DualvalType::Array);

        assert_eq!(dualval_packet_destroy(&mut pkt), DualvalErr::NoError);
        assert_eq!(dualval_packet_destroy(&mut copy), DualvalErr::NoError);
        assert_eq!(dualval_packet_destroy(&mut moved), DualvalErr::NoError);
    }
}

#[test]
fn errors_map_to_codes() {
    unsafe {
        let mut int = DualvalHeap::uninit();
        assert_eq!(dualval_heap_init_int(&mut int, 3), DualvalErr::NoError);
        let mut size = 0usize;
        assert_eq!(dualval_size(any(&int), &mut size), DualvalErr::TypeError);
        assert!(!last_error().is_empty());

        let mut buf = DualvalBuffer::uninit();
        assert_eq!(dualval_heap_finalize(&mut buf, &int), DualvalErr::TypeError);

        let garbage = [0x02u8, 0, 0, 0, 99, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            dualval_buffer_init_bytes(&mut buf, garbage.as_ptr(), garbage.len()),
            DualvalErr::ParseError
        );

        let mut pkt = DualvalPacket::uninit();
        assert_eq!(dualval_packet_init_obj(&mut pkt), DualvalErr::NoError);
        let mut ptr: *const u8 = std::ptr::null();
        let mut len = 0usize;
        assert_eq!(
            dualval_buffer_get_bytes(any(&pkt).cast(), &mut ptr, &mut len),
            DualvalErr::ClientError
        );

        let mut null = DualvalHeap::uninit();
        assert_eq!(dualval_heap_init_null(&mut null), DualvalErr::NoError);
        let (k, kn) = key("k");
        assert_eq!(
            dualval_heap_insert(&mut int, k, kn, &null),
            DualvalErr::TypeError
        );
        let bad = [0xffu8];
        let mut obj = DualvalHeap::uninit();
        assert_eq!(dualval_heap_init_obj(&mut obj), DualvalErr::NoError);
        assert_eq!(
            dualval_heap_insert(&mut obj, bad.as_ptr().cast(), 1, &int),
            DualvalErr::ParseError
        );

        assert_eq!(dualval_heap_init_rc(&mut obj, 7), DualvalErr::ClientError);
        assert_eq!(dualval_size(std::ptr::null(), &mut size), DualvalErr::ClientError);

        assert_eq!(dualval_heap_destroy(&mut int), DualvalErr::NoError);
        assert_eq!(dualval_heap_destroy(&mut int), DualvalErr::ClientError);
        assert_eq!(dualval_destroy(any_mut(&mut null)), DualvalErr::NoError);
        assert_eq!(dualval_destroy(any_mut(&mut obj)), DualvalErr::NoError);
        assert_eq!(dualval_destroy(any_mut(&mut pkt)), DualvalErr::NoError);
    }
}

#[test]
fn caught_panics_report_the_unknown_code() {
    let err = ValueError::of(ErrorCode::Unknown);
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(DualvalErr::from(err.kind()), DualvalErr::UnknownError);
    assert!(err.to_string().ends_with("unexpected internal failure"));
}

#[test]
fn uninitialized_handles_are_rejected() {
    unsafe {
        let mut h = DualvalHeap::uninit();
        let mut size = 0usize;
        assert_eq!(dualval_size(any(&h), &mut size), DualvalErr::ClientError);
        assert_eq!(dualval_destroy(any_mut(&mut h)), DualvalErr::ClientError);
    }
}
