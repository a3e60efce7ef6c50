use crate::alloc_util::{try_vec_with_capacity, u32_len};
use crate::debug::debug;
use crate::heap::{Array, Heap, Node, Object};
use crate::kind::RawKind;
use crate::refcount::OwningRefCount;
use crate::wire::{
    cmp_keys_canonical, table_len, ARRAY_ENTRY_LEN, KEY_INDEX_LEN, OBJECT_ENTRY_LEN,
    SMALL_STRING_MAX,
};
use crate::{ErrorCode, ValueError};

/// Serialize a tree into one contiguous allocation.
///
/// The exact size is computed first so the output is reserved once; the write pass then emits
/// each aggregate's header and tables and backpatches them as each child lands. Object children
/// keep insertion order; the key index after the entry table lists them in canonical key order.
pub fn finalize<R: OwningRefCount>(root: &Heap<R>) -> Result<Vec<u8>, ValueError> {
    if !root.is_aggregate() {
        return Err(ValueError::of(ErrorCode::ExpectedAggregate));
    }
    let size = encoded_len(root)?;
    let mut enc = Encoder {
        buf: try_vec_with_capacity(size, 0)?,
    };
    enc.value(root)?;
    debug_assert_eq!(enc.buf.len(), size);
    debug!("finalized {} byte buffer", enc.buf.len());
    Ok(enc.buf)
}

const fn string_len(len: usize) -> Option<usize> {
    if len <= SMALL_STRING_MAX {
        len.checked_add(2)
    } else {
        len.checked_add(5)
    }
}

fn add(a: usize, b: usize) -> Result<usize, ValueError> {
    a.checked_add(b)
        .ok_or_else(|| ValueError::of(ErrorCode::LengthOverflow))
}

fn encoded_len<R: OwningRefCount>(v: &Heap<R>) -> Result<usize, ValueError> {
    let overflow = || ValueError::of(ErrorCode::LengthOverflow);
    let len = match v.node() {
        Node::Null => 1,
        Node::Boolean(_) => 2,
        Node::Integer(i) if i32::try_from(*i).is_ok() => 5,
        Node::Integer(_) | Node::Decimal(_) => 9,
        Node::InlineStr(_) | Node::Str(_) => {
            string_len(v.as_str().map_or(0, str::len)).ok_or_else(overflow)?
        }
        Node::Object(o) => {
            let mut total = table_len(RawKind::Object, o.len()).ok_or_else(overflow)?;
            for (k, child) in o.iter() {
                total = add(total, string_len(k.len()).ok_or_else(overflow)?)?;
                total = add(total, encoded_len(child)?)?;
            }
            total
        }
        Node::Array(a) => {
            let mut total = table_len(RawKind::Array, a.len()).ok_or_else(overflow)?;
            for child in a.iter() {
                total = add(total, encoded_len(child)?)?;
            }
            total
        }
    };
    if v.is_aggregate() {
        u32_len(len, 0)?;
    }
    Ok(len)
}

struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn patch_u32(&mut self, at: usize, v: u32) {
        if let Some(slot) = self.buf.get_mut(at..at + 4) {
            slot.copy_from_slice(&v.to_le_bytes());
        }
    }

    fn value<R: OwningRefCount>(&mut self, v: &Heap<R>) -> Result<(), ValueError> {
        match v.node() {
            Node::Null => self.buf.push(RawKind::Null.tag()),
            Node::Boolean(b) => {
                self.buf.push(RawKind::Boolean.tag());
                self.buf.push(u8::from(*b));
            }
            Node::Integer(i) => match i32::try_from(*i) {
                Ok(small) => {
                    self.buf.push(RawKind::ShortInteger.tag());
                    self.buf.extend_from_slice(&small.to_le_bytes());
                }
                Err(_) => {
                    self.buf.push(RawKind::Integer.tag());
                    self.buf.extend_from_slice(&i.to_le_bytes());
                }
            },
            Node::Decimal(d) => {
                self.buf.push(RawKind::Decimal.tag());
                self.buf.extend_from_slice(&d.to_bits().to_le_bytes());
            }
            Node::InlineStr(_) | Node::Str(_) => self.string(v.as_str().unwrap_or_default())?,
            Node::Object(o) => self.object(o)?,
            Node::Array(a) => self.array(a)?,
        }
        Ok(())
    }

    fn string(&mut self, s: &str) -> Result<(), ValueError> {
        if s.len() <= SMALL_STRING_MAX {
            self.buf.push(RawKind::SmallString.tag());
            self.buf.push(u8::try_from(s.len()).unwrap_or(u8::MAX));
        } else {
            self.buf.push(RawKind::String.tag());
            self.buf
                .extend_from_slice(&u32_len(s.len(), self.buf.len())?.to_le_bytes());
        }
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Write the header and zeroed tables. Returns `(start, table_start)`.
    fn open_aggregate(&mut self, raw: RawKind, count: usize) -> Result<(usize, usize), ValueError> {
        let start = self.buf.len();
        let tables = table_len(raw, count)
            .ok_or_else(|| ValueError::new(ErrorCode::LengthOverflow, start))?;
        self.buf.push(raw.tag());
        self.buf.extend_from_slice(&[0, 0, 0]);
        self.buf.extend_from_slice(&[0, 0, 0, 0]);
        self.buf
            .extend_from_slice(&u32_len(count, start + 8)?.to_le_bytes());
        let table = self.buf.len();
        self.buf.resize(start + tables, 0);
        Ok((start, table))
    }

    fn close_aggregate(&mut self, start: usize) -> Result<(), ValueError> {
        let len = u32_len(self.buf.len() - start, start + 4)?;
        self.patch_u32(start + 4, len);
        Ok(())
    }

    fn relative(&self, start: usize) -> Result<u32, ValueError> {
        u32_len(self.buf.len() - start, start)
    }

    fn object<R: OwningRefCount>(&mut self, map: &Object<R>) -> Result<(), ValueError> {
        let count = map.len();
        let mut order: Vec<usize> = try_vec_with_capacity(count, self.buf.len())?;
        order.extend(0..count);
        order.sort_unstable_by(|&a, &b| {
            let key = |i| map.get_index(i).map_or("", |(k, _)| k.as_str());
            cmp_keys_canonical(key(a), key(b))
        });

        let (start, table) = self.open_aggregate(RawKind::Object, count)?;
        let index = table + count * OBJECT_ENTRY_LEN;
        for (rank, &idx) in order.iter().enumerate() {
            self.patch_u32(index + rank * KEY_INDEX_LEN, u32_len(idx, index)?);
        }
        for (i, (key, child)) in map.iter().enumerate() {
            let slot = table + i * OBJECT_ENTRY_LEN;
            let key_off = self.relative(start)?;
            self.patch_u32(slot, key_off);
            self.string(key)?;
            let val_off = self.relative(start)?;
            self.patch_u32(slot + 4, val_off);
            self.value(child)?;
        }
        self.close_aggregate(start)
    }

    fn array<R: OwningRefCount>(&mut self, items: &Array<R>) -> Result<(), ValueError> {
        let (start, table) = self.open_aggregate(RawKind::Array, items.len())?;
        for (i, child) in items.iter().enumerate() {
            let off = self.relative(start)?;
            self.patch_u32(table + i * ARRAY_ENTRY_LEN, off);
            self.value(child)?;
        }
        self.close_aggregate(start)
    }
}
