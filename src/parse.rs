use core::cmp::Ordering;

use crate::debug::debug;
use crate::kind::RawKind;
use crate::wire::{
    cmp_key_bytes, table_len, Encoded, Stream, AGGREGATE_HEADER_LEN, SMALL_STRING_MAX,
};
use crate::{utf8, ErrorCode, ParseLimits, ValueError};

/// Validate that `bytes` hold exactly one well-formed finalized object or array.
///
/// This is the only path by which untrusted bytes become a trusted buffer. It is a single
/// allocation-free pass; every step strictly advances, and recursion is bounded by
/// `limits.max_depth`.
///
/// # Errors
///
/// Returns a parse error carrying the byte offset where the input was rejected.
pub fn validate(bytes: &[u8], limits: ParseLimits) -> Result<(), ValueError> {
    validate_root(bytes, limits).map_err(|err| {
        debug!("rejected {} byte input: {}", bytes.len(), err);
        err
    })
}

fn validate_root(bytes: &[u8], limits: ParseLimits) -> Result<(), ValueError> {
    if limits.max_depth == 0 {
        return Err(ValueError::of(ErrorCode::InvalidLimits));
    }
    if bytes.len() > limits.max_input_bytes {
        return Err(ValueError::new(ErrorCode::InputTooLarge, 0));
    }
    let tag = *bytes
        .first()
        .ok_or_else(|| ValueError::new(ErrorCode::UnexpectedEof, 0))?;
    let raw = RawKind::from_tag(tag).ok_or_else(|| ValueError::new(ErrorCode::UnknownTypeTag, 0))?;
    if !raw.is_aggregate() {
        return Err(ValueError::new(ErrorCode::RootNotAggregate, 0));
    }

    let mut walker = Walker::new(bytes, limits);
    let end = walker.value(0, bytes.len(), 1)?;
    if end != bytes.len() {
        return Err(ValueError::new(ErrorCode::TrailingBytes, end));
    }
    Ok(())
}

struct Walker<'a> {
    data: &'a [u8],
    limits: ParseLimits,
}

impl<'a> Walker<'a> {
    const fn new(data: &'a [u8], limits: ParseLimits) -> Self {
        Self { data, limits }
    }

    /// Validate the value starting at `start`, which must end at or before `bound`.
    /// Returns the end position.
    fn value(&mut self, start: usize, bound: usize, depth: usize) -> Result<usize, ValueError> {
        let bounded = self
            .data
            .get(..bound)
            .ok_or_else(|| ValueError::new(ErrorCode::UnexpectedEof, start))?;
        let mut s = Stream::new(bounded, start);
        let tag = s.read_u8()?;
        let raw =
            RawKind::from_tag(tag).ok_or_else(|| ValueError::new(ErrorCode::UnknownTypeTag, start))?;

        match raw {
            RawKind::Object | RawKind::Array => self.aggregate(raw, start, bound, depth),
            RawKind::SmallString | RawKind::String => {
                Self::string(&mut s, raw, start).map(|_| s.position())
            }
            RawKind::ShortInteger => {
                s.read_le_i32()?;
                Ok(s.position())
            }
            RawKind::Integer => {
                let v = s.read_le_i64()?;
                if i32::try_from(v).is_ok() {
                    return Err(ValueError::new(ErrorCode::NonCanonicalInteger, start));
                }
                Ok(s.position())
            }
            RawKind::Decimal => {
                s.read_exact(8)?;
                Ok(s.position())
            }
            RawKind::Boolean => match s.read_u8()? {
                0 | 1 => Ok(s.position()),
                _ => Err(ValueError::new(ErrorCode::InvalidBoolean, start + 1)),
            },
            RawKind::Null => Ok(s.position()),
        }
    }

    fn string(s: &mut Stream<'a>, raw: RawKind, start: usize) -> Result<&'a str, ValueError> {
        let len = match raw {
            RawKind::SmallString => usize::from(s.read_u8()?),
            _ => {
                let len = s.read_len()?;
                if len <= SMALL_STRING_MAX {
                    return Err(ValueError::new(ErrorCode::NonCanonicalString, start));
                }
                len
            }
        };
        let payload_off = s.position();
        let payload = s.read_exact(len)?;
        utf8::validate(payload).map_err(|()| ValueError::new(ErrorCode::Utf8Invalid, payload_off))
    }

    fn aggregate(
        &mut self,
        raw: RawKind,
        start: usize,
        bound: usize,
        depth: usize,
    ) -> Result<usize, ValueError> {
        if depth > self.limits.max_depth {
            return Err(ValueError::new(ErrorCode::DepthLimitExceeded, start));
        }

        let bounded = self
            .data
            .get(..bound)
            .ok_or_else(|| ValueError::new(ErrorCode::UnexpectedEof, start))?;
        let mut s = Stream::new(bounded, start + 1);
        if s.read_exact(3)?.iter().any(|&b| b != 0) {
            return Err(ValueError::new(ErrorCode::MalformedHeader, start + 1));
        }
        let len = s.read_len()?;
        let count = s.read_len()?;

        let end = start
            .checked_add(len)
            .ok_or_else(|| ValueError::new(ErrorCode::LengthOverflow, start + 4))?;
        if end > bound {
            return Err(ValueError::new(ErrorCode::AggregateLengthOverflow, start + 4));
        }
        if count > self.limits.max_container_len {
            return Err(ValueError::new(ErrorCode::ContainerLenLimitExceeded, start + 8));
        }
        let tables = table_len(raw, count)
            .ok_or_else(|| ValueError::new(ErrorCode::LengthOverflow, start + 8))?;
        if tables > len {
            return Err(ValueError::new(ErrorCode::MalformedHeader, start + 4));
        }

        let mut table = Stream::new(bounded, start + AGGREGATE_HEADER_LEN);
        let mut expect = tables;
        for _ in 0..count {
            if raw == RawKind::Object {
                let key_slot = table.position();
                let key_off = table.read_len()?;
                Self::check_offset(key_off, expect, len, key_slot)?;
                expect = self.key(start + key_off, end)? - start;
            }

            let slot = table.position();
            let off = table.read_len()?;
            Self::check_offset(off, expect, len, slot)?;
            let child_end = self.value(start + off, end, depth + 1)?;
            expect = child_end - start;
        }
        if raw == RawKind::Object {
            self.key_index(&mut table, start, count)?;
        }

        if expect != len {
            return Err(ValueError::new(ErrorCode::UnreachableBytes, start + expect));
        }
        Ok(end)
    }

    /// Returns the end position of the key.
    fn key(&self, key_start: usize, end: usize) -> Result<usize, ValueError> {
        let bounded = self
            .data
            .get(..end)
            .ok_or_else(|| ValueError::new(ErrorCode::UnexpectedEof, key_start))?;
        let mut s = Stream::new(bounded, key_start);
        let tag = s.read_u8()?;
        let raw = RawKind::from_tag(tag)
            .ok_or_else(|| ValueError::new(ErrorCode::UnknownTypeTag, key_start))?;
        if !matches!(raw, RawKind::SmallString | RawKind::String) {
            return Err(ValueError::new(ErrorCode::ObjectKeyNotString, key_start));
        }
        Self::string(&mut s, raw, key_start)?;
        Ok(s.position())
    }

    /// The key index must name every entry exactly once, in canonical key order. Strictly
    /// increasing keys over in-range entry numbers make it a permutation.
    fn key_index(
        &self,
        table: &mut Stream<'a>,
        start: usize,
        count: usize,
    ) -> Result<(), ValueError> {
        let obj = Encoded::new(self.data, start);
        let mut prev: Option<&'a [u8]> = None;
        for _ in 0..count {
            let slot = table.position();
            let idx = table.read_len()?;
            let key = obj
                .key_bytes(idx)
                .ok_or_else(|| ValueError::new(ErrorCode::InvalidKeyIndex, slot))?;
            if let Some(prev) = prev {
                match cmp_key_bytes(prev, key) {
                    Ordering::Less => {}
                    Ordering::Equal => return Err(ValueError::new(ErrorCode::DuplicateKey, slot)),
                    Ordering::Greater => {
                        return Err(ValueError::new(ErrorCode::NonCanonicalKeyOrder, slot))
                    }
                }
            }
            prev = Some(key);
        }
        Ok(())
    }

    /// Children are packed: each offset must land exactly where the previous child ended.
    const fn check_offset(
        off: usize,
        expect: usize,
        len: usize,
        slot: usize,
    ) -> Result<(), ValueError> {
        if off >= len {
            return Err(ValueError::new(ErrorCode::OffsetOutOfRange, slot));
        }
        if off < expect {
            return Err(ValueError::new(ErrorCode::NonMonotonicOffset, slot));
        }
        if off > expect {
            return Err(ValueError::new(ErrorCode::UnreachableBytes, slot));
        }
        Ok(())
    }
}

