use dualval::{validate, Buffer, ErrorCode, Heap, ParseLimits, Unsafe};

fn assert_invalid(bytes: &[u8], limits: ParseLimits, code: ErrorCode) -> usize {
    let err = validate(bytes, limits).unwrap_err();
    assert_eq!(err.code, code);
    assert!(err.is_parse() || code == ErrorCode::InvalidLimits);
    assert!(Buffer::<Unsafe>::from_bytes_with_limits(bytes, limits).is_err());
    err.offset
}

fn header(tag: u8, len: usize, count: usize) -> Vec<u8> {
    let mut out = vec![tag, 0, 0, 0];
    out.extend_from_slice(&u32::try_from(len).unwrap().to_le_bytes());
    out.extend_from_slice(&u32::try_from(count).unwrap().to_le_bytes());
    out
}

fn small_str(s: &str) -> Vec<u8> {
    let mut out = vec![0x03, u8::try_from(s.len()).unwrap()];
    out.extend_from_slice(s.as_bytes());
    out
}

fn array(items: &[&[u8]]) -> Vec<u8> {
    let table = 12 + 4 * items.len();
    let total = table + items.iter().map(|i| i.len()).sum::<usize>();
    let mut out = header(0x02, total, items.len());
    let mut off = table;
    for item in items {
        out.extend_from_slice(&u32::try_from(off).unwrap().to_le_bytes());
        off += item.len();
    }
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

/// Entries in the given order, key index sorted canonically.
fn object(entries: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut index: Vec<u32> = (0..u32::try_from(entries.len()).unwrap()).collect();
    index.sort_by_key(|&i| {
        let key = entries[i as usize].0;
        (key.len(), key)
    });
    object_indexed(entries, &index)
}

fn object_indexed(entries: &[(&[u8], &[u8])], index: &[u32]) -> Vec<u8> {
    let table = 12 + 12 * entries.len();
    let total = table + entries.iter().map(|(k, v)| k.len() + v.len()).sum::<usize>();
    let mut out = header(0x01, total, entries.len());
    let mut off = table;
    for (k, v) in entries {
        out.extend_from_slice(&u32::try_from(off).unwrap().to_le_bytes());
        off += k.len();
        out.extend_from_slice(&u32::try_from(off).unwrap().to_le_bytes());
        off += v.len();
    }
    for i in index {
        out.extend_from_slice(&i.to_le_bytes());
    }
    for (k, v) in entries {
        out.extend_from_slice(k);
        out.extend_from_slice(v);
    }
    out
}

fn limits() -> ParseLimits {
    ParseLimits::default()
}

#[test]
fn valid_minimal_aggregates() {
    let empty_arr = [0x02, 0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0];
    let empty_obj = [0x01, 0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0];
    assert_eq!(array(&[]), empty_arr);
    validate(&empty_arr, limits()).unwrap();
    validate(&empty_obj, limits()).unwrap();
}

#[test]
fn hand_built_matches_finalize() {
    let bytes = object(&[(&small_str("a"), &[0x08, 0x01])]);
    assert_eq!(
        bytes,
        [
            0x01, 0, 0, 0, 29, 0, 0, 0, 1, 0, 0, 0, 24, 0, 0, 0, 27, 0, 0, 0, 0, 0, 0, 0, 0x03, 1,
            b'a', 0x08, 1
        ]
    );

    let mut tree = Heap::<Unsafe>::make_object();
    tree.insert("a", true).unwrap();
    assert_eq!(tree.finalize().unwrap().get_bytes().unwrap(), bytes.as_slice());
}

#[test]
fn every_scalar_encoding_is_accepted() {
    let mut long_int = vec![0x06];
    long_int.extend_from_slice(&i64::MAX.to_le_bytes());
    let mut short_int = vec![0x05];
    short_int.extend_from_slice(&(-7i32).to_le_bytes());
    let mut decimal = vec![0x07];
    decimal.extend_from_slice(&f64::NAN.to_bits().to_le_bytes());
    let long = "z".repeat(300);
    let mut long_str = vec![0x04];
    long_str.extend_from_slice(&300u32.to_le_bytes());
    long_str.extend_from_slice(long.as_bytes());

    let bytes = array(&[
        &long_int,
        &short_int,
        &decimal,
        &long_str,
        &small_str("héllo"),
        &[0x08, 0x00],
        &[0x09],
    ]);
    let buf = Buffer::<Unsafe>::from_bytes(&bytes).unwrap();
    assert_eq!(buf.at(0).unwrap(), i64::MAX);
    assert_eq!(buf.at(1).unwrap(), -7);
    assert!(buf.at(2).unwrap().decimal().unwrap().is_nan());
    assert_eq!(buf.at(3).unwrap().str().unwrap(), long);
    assert_eq!(buf.at(4).unwrap(), "héllo");
    assert_eq!(buf.at(5).unwrap(), false);
    assert!(buf.at(6).unwrap().is_null());
}

#[test]
fn empty_input() {
    assert_eq!(assert_invalid(&[], limits(), ErrorCode::UnexpectedEof), 0);
}

#[test]
fn root_must_be_aggregate() {
    assert_eq!(assert_invalid(&[0x09], limits(), ErrorCode::RootNotAggregate), 0);
    assert_eq!(
        assert_invalid(&[0x05, 1, 0, 0, 0], limits(), ErrorCode::RootNotAggregate),
        0
    );
}

#[test]
fn unknown_tags() {
    assert_eq!(assert_invalid(&[0x0a], limits(), ErrorCode::UnknownTypeTag), 0);
    assert_eq!(assert_invalid(&[0x00], limits(), ErrorCode::UnknownTypeTag), 0);
    let bytes = array(&[&[0x0a]]);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::UnknownTypeTag), 16);
}

#[test]
fn reserved_header_bytes_must_be_zero() {
    let mut bytes = array(&[]);
    bytes[2] = 1;
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::MalformedHeader), 1);
}

#[test]
fn table_larger_than_aggregate() {
    let bytes = header(0x02, 12, 1);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::MalformedHeader), 4);
}

#[test]
fn declared_length_past_input() {
    let bytes = header(0x01, 100, 0);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::AggregateLengthOverflow), 4);
}

#[test]
fn trailing_bytes() {
    let mut bytes = array(&[]);
    bytes.push(0x09);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::TrailingBytes), 12);
}

#[test]
fn offset_out_of_range() {
    let mut bytes = array(&[&[0x09]]);
    bytes[12] = 17;
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::OffsetOutOfRange), 12);
}

#[test]
fn offsets_must_pack_children() {
    let mut overlapping = array(&[&[0x09], &[0x09]]);
    overlapping[16] = 20;
    assert_eq!(
        assert_invalid(&overlapping, limits(), ErrorCode::NonMonotonicOffset),
        16
    );

    let mut gap = header(0x02, 18, 1);
    gap.extend_from_slice(&17u32.to_le_bytes());
    gap.extend_from_slice(&[0x00, 0x09]);
    assert_eq!(assert_invalid(&gap, limits(), ErrorCode::UnreachableBytes), 12);

    let mut tail = header(0x02, 18, 1);
    tail.extend_from_slice(&16u32.to_le_bytes());
    tail.extend_from_slice(&[0x09, 0x00]);
    assert_eq!(assert_invalid(&tail, limits(), ErrorCode::UnreachableBytes), 17);
}

#[test]
fn object_keys_must_be_strings() {
    let bytes = object(&[(&[0x09], &[0x09])]);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::ObjectKeyNotString), 24);
}

#[test]
fn object_entries_keep_insertion_order() {
    let bytes = object(&[(&small_str("bb"), &[0x09]), (&small_str("a"), &[0x08, 1])]);
    assert_eq!(&bytes[28..36], &[1, 0, 0, 0, 0, 0, 0, 0]);
    let buf = Buffer::<Unsafe>::from_bytes(&bytes).unwrap();
    assert_eq!(buf.keys().unwrap().collect::<Vec<_>>(), ["bb", "a"]);
    assert_eq!(buf.at("a").unwrap(), true);
    assert!(buf.at("bb").unwrap().is_null());
}

#[test]
fn key_index_must_be_canonical() {
    let bytes = object_indexed(
        &[(&small_str("bb"), &[0x09]), (&small_str("a"), &[0x09])],
        &[0, 1],
    );
    assert_eq!(
        assert_invalid(&bytes, limits(), ErrorCode::NonCanonicalKeyOrder),
        32
    );

    let bytes = object_indexed(
        &[(&small_str("b"), &[0x09]), (&small_str("a"), &[0x09])],
        &[0, 1],
    );
    assert_eq!(
        assert_invalid(&bytes, limits(), ErrorCode::NonCanonicalKeyOrder),
        32
    );

    let ok = object(&[(&small_str("b"), &[0x09]), (&small_str("aa"), &[0x09])]);
    validate(&ok, limits()).unwrap();
}

#[test]
fn key_index_must_stay_in_range() {
    let bytes = object_indexed(&[(&small_str("a"), &[0x09])], &[1]);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::InvalidKeyIndex), 20);
}

#[test]
fn duplicate_keys() {
    let bytes = object(&[(&small_str("a"), &[0x09]), (&small_str("a"), &[0x09])]);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::DuplicateKey), 32);

    let repeated = object_indexed(
        &[(&small_str("a"), &[0x09]), (&small_str("b"), &[0x09])],
        &[0, 0],
    );
    assert_eq!(assert_invalid(&repeated, limits(), ErrorCode::DuplicateKey), 32);
}

#[test]
fn invalid_boolean() {
    let bytes = array(&[&[0x08, 0x02]]);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::InvalidBoolean), 17);
}

#[test]
fn invalid_utf8() {
    let bytes = array(&[&[0x03, 0x01, 0xff]]);
    assert_eq!(assert_invalid(&bytes, limits(), ErrorCode::Utf8Invalid), 18);
}

#[test]
fn non_canonical_scalars() {
    let bytes = array(&[&[0x04, 3, 0, 0, 0, b'a', b'b', b'c']]);
    assert_eq!(
        assert_invalid(&bytes, limits(), ErrorCode::NonCanonicalString),
        16
    );

    let mut int = vec![0x06];
    int.extend_from_slice(&5i64.to_le_bytes());
    let bytes = array(&[&int]);
    assert_eq!(
        assert_invalid(&bytes, limits(), ErrorCode::NonCanonicalInteger),
        16
    );
}

#[test]
fn truncated_scalar_inside_aggregate() {
    let mut bytes = array(&[&[0x05, 1, 0, 0, 0]]);
    bytes.pop();
    bytes[4] -= 1;
    assert_invalid(&bytes, limits(), ErrorCode::UnexpectedEof);
}

#[test]
fn depth_limit() {
    let inner = array(&[]);
    let mid = array(&[&inner]);
    let outer = array(&[&mid]);
    let shallow = ParseLimits::new(usize::MAX, 2, usize::MAX).unwrap();
    assert_eq!(
        assert_invalid(&outer, shallow, ErrorCode::DepthLimitExceeded),
        32
    );
    let enough = ParseLimits::new(usize::MAX, 3, usize::MAX).unwrap();
    validate(&outer, enough).unwrap();
}

#[test]
fn container_len_limit() {
    let bytes = array(&[&[0x09], &[0x09]]);
    let tight = ParseLimits::new(usize::MAX, 8, 1).unwrap();
    assert_eq!(
        assert_invalid(&bytes, tight, ErrorCode::ContainerLenLimitExceeded),
        8
    );
}

#[test]
fn input_size_limit() {
    let bytes = array(&[]);
    assert_eq!(
        assert_invalid(&bytes, ParseLimits::for_bytes(11), ErrorCode::InputTooLarge),
        0
    );
    validate(&bytes, ParseLimits::for_bytes(12)).unwrap();
}

#[test]
fn zero_depth_is_invalid_limits() {
    let err = ParseLimits::new(16, 0, 16).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidLimits);
}
