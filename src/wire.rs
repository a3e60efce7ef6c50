//! Binary layout of finalized values.
//!
//! All integers are little-endian. Every value starts with a one-byte type tag (see
//! [`RawKind`]). Aggregates carry a 12-byte header (tag, three reserved zero bytes, u32 total
//! length, u32 element count) followed by an offset table and then the children packed back to
//! back. Offsets are relative to the first byte of the aggregate, so every aggregate is itself a
//! standalone buffer.
//!
//! Object entries (key offset, value offset) keep insertion order. After the entry table an
//! object carries a key index: one u32 entry number per element, listed in canonical key order,
//! which lookups binary search.

use core::cmp::Ordering;

use crate::kind::RawKind;
use crate::{utf8, ErrorCode, ValueError};

pub const AGGREGATE_HEADER_LEN: usize = 12;
pub const OBJECT_ENTRY_LEN: usize = 8;
pub const ARRAY_ENTRY_LEN: usize = 4;
pub const KEY_INDEX_LEN: usize = 4;
pub const SMALL_STRING_MAX: usize = 0xff;

/// Canonical object key order: shorter UTF-8 byte length first, then lexicographic bytes.
#[inline]
#[must_use]
pub fn cmp_keys_canonical(a: &str, b: &str) -> Ordering {
    cmp_key_bytes(a.as_bytes(), b.as_bytes())
}

/// [`cmp_keys_canonical`] over raw key payloads.
#[inline]
#[must_use]
pub fn cmp_key_bytes(a: &[u8], b: &[u8]) -> Ordering {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

/// Length of the offset table entry for one element of an aggregate.
#[inline]
pub const fn entry_len(raw: RawKind) -> usize {
    match raw {
        RawKind::Object => OBJECT_ENTRY_LEN,
        _ => ARRAY_ENTRY_LEN,
    }
}

/// Header plus every per-element table of an aggregate holding `count` elements.
#[inline]
pub const fn table_len(raw: RawKind, count: usize) -> Option<usize> {
    let per_element = match raw {
        RawKind::Object => OBJECT_ENTRY_LEN + KEY_INDEX_LEN,
        _ => ARRAY_ENTRY_LEN,
    };
    match count.checked_mul(per_element) {
        Some(n) => n.checked_add(AGGREGATE_HEADER_LEN),
        None => None,
    }
}

/// Bounds-checked cursor used while validating untrusted input.
#[derive(Clone, Copy)]
pub struct Stream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Stream<'a> {
    pub const fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, ValueError> {
        let off = self.pos;
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| ValueError::new(ErrorCode::UnexpectedEof, off))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], ValueError> {
        let off = self.pos;
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| ValueError::new(ErrorCode::LengthOverflow, off))?;
        let s = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| ValueError::new(ErrorCode::UnexpectedEof, off))?;
        self.pos = end;
        Ok(s)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ValueError> {
        let s = self.read_exact(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(s);
        Ok(out)
    }

    pub fn read_le_u32(&mut self) -> Result<u32, ValueError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_le_i32(&mut self) -> Result<i32, ValueError> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_le_i64(&mut self) -> Result<i64, ValueError> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Read a u32 length or offset field as `usize`.
    pub fn read_len(&mut self) -> Result<usize, ValueError> {
        let off = self.pos;
        let v = self.read_le_u32()?;
        usize::try_from(v).map_err(|_| ValueError::new(ErrorCode::LengthOverflow, off))
    }
}

#[inline]
fn fixed<const N: usize>(data: &[u8], pos: usize) -> [u8; N] {
    let mut out = [0u8; N];
    if let Some(s) = pos.checked_add(N).and_then(|end| data.get(pos..end)) {
        out.copy_from_slice(s);
    }
    out
}

#[inline]
fn le_u32(data: &[u8], pos: usize) -> usize {
    u32::from_le_bytes(fixed(data, pos)) as usize
}

/// A value inside storage that has already passed validation.
///
/// Reads never fail: validation guarantees every offset and length is in range, and the readers
/// degrade to empty results instead of panicking should that ever not hold.
#[derive(Debug, Clone, Copy)]
pub struct Encoded<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Encoded<'a> {
    #[inline]
    pub const fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[inline]
    pub const fn position(self) -> usize {
        self.pos
    }

    #[inline]
    pub fn raw_kind(self) -> RawKind {
        self.data
            .get(self.pos)
            .copied()
            .and_then(RawKind::from_tag)
            .unwrap_or(RawKind::Null)
    }

    /// Number of bytes this value occupies.
    pub fn encoded_len(self) -> usize {
        match self.raw_kind() {
            RawKind::Object | RawKind::Array => le_u32(self.data, self.pos + 4),
            RawKind::SmallString => 2 + usize::from(fixed::<1>(self.data, self.pos + 1)[0]),
            RawKind::String => 5 + le_u32(self.data, self.pos + 1),
            RawKind::ShortInteger => 5,
            RawKind::Integer | RawKind::Decimal => 9,
            RawKind::Boolean => 2,
            RawKind::Null => 1,
        }
    }

    /// The encoded byte range of this value.
    #[inline]
    pub fn bytes(self) -> &'a [u8] {
        let end = self.pos.saturating_add(self.encoded_len());
        self.data.get(self.pos..end).unwrap_or_default()
    }

    /// Element count of an aggregate, 0 otherwise.
    #[inline]
    pub fn count(self) -> usize {
        if self.raw_kind().is_aggregate() {
            le_u32(self.data, self.pos + 8)
        } else {
            0
        }
    }

    fn table_slot(self, idx: usize) -> usize {
        let raw = self.raw_kind();
        self.pos + AGGREGATE_HEADER_LEN + idx * entry_len(raw)
    }

    /// The `idx`-th element of an array or the `idx`-th value of an object.
    pub fn child(self, idx: usize) -> Option<Self> {
        let raw = self.raw_kind();
        if !raw.is_aggregate() || idx >= self.count() {
            return None;
        }
        let slot = match raw {
            RawKind::Object => self.table_slot(idx) + 4,
            _ => self.table_slot(idx),
        };
        Some(Self::new(self.data, self.pos + le_u32(self.data, slot)))
    }

    /// The `idx`-th key of an object.
    pub fn key(self, idx: usize) -> Option<&'a str> {
        utf8::trusted(self.key_bytes(idx)?)
    }

    pub fn key_bytes(self, idx: usize) -> Option<&'a [u8]> {
        if self.raw_kind() != RawKind::Object || idx >= self.count() {
            return None;
        }
        let key_pos = self.pos + le_u32(self.data, self.table_slot(idx));
        Self::new(self.data, key_pos).string_payload()
    }

    /// Entry number of the `rank`-th key in canonical order.
    fn key_index(self, rank: usize) -> usize {
        let count = self.count();
        le_u32(
            self.data,
            self.pos + AGGREGATE_HEADER_LEN + count * OBJECT_ENTRY_LEN + rank * KEY_INDEX_LEN,
        )
    }

    /// Binary search an object's key index.
    pub fn find(self, key: &str) -> Option<Self> {
        if self.raw_kind() != RawKind::Object {
            return None;
        }
        let needle = key.as_bytes();
        let (mut lo, mut hi) = (0usize, self.count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let idx = self.key_index(mid);
            match cmp_key_bytes(self.key_bytes(idx)?, needle) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return self.child(idx),
            }
        }
        None
    }

    fn string_payload(self) -> Option<&'a [u8]> {
        let (start, len) = match self.raw_kind() {
            RawKind::SmallString => (
                self.pos + 2,
                usize::from(fixed::<1>(self.data, self.pos + 1)[0]),
            ),
            RawKind::String => (self.pos + 5, le_u32(self.data, self.pos + 1)),
            _ => return None,
        };
        self.data.get(start..start.checked_add(len)?)
    }

    pub fn as_str(self) -> Option<&'a str> {
        utf8::trusted(self.string_payload()?)
    }

    pub fn as_i64(self) -> Option<i64> {
        match self.raw_kind() {
            RawKind::ShortInteger => Some(i64::from(i32::from_le_bytes(fixed(
                self.data,
                self.pos + 1,
            )))),
            RawKind::Integer => Some(i64::from_le_bytes(fixed(self.data, self.pos + 1))),
            _ => None,
        }
    }

    pub fn as_f64(self) -> Option<f64> {
        match self.raw_kind() {
            RawKind::Decimal => Some(f64::from_bits(u64::from_le_bytes(fixed(
                self.data,
                self.pos + 1,
            )))),
            _ => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self.raw_kind() {
            RawKind::Boolean => Some(fixed::<1>(self.data, self.pos + 1)[0] != 0),
            _ => None,
        }
    }
}

