use indexmap::IndexMap;

use crate::alloc_util::{try_string_from_str, try_vec_with_capacity};
use crate::heap::Heap;
use crate::kind::RawKind;
use crate::refcount::OwningRefCount;
use crate::wire::Encoded;
use crate::{ErrorCode, ValueError};

/// Rebuild a tree from validated storage, depth first through the offset tables.
pub fn lift<R: OwningRefCount>(enc: Encoded<'_>) -> Result<Heap<R>, ValueError> {
    let corrupt = || ValueError::new(ErrorCode::OffsetOutOfRange, enc.position());
    Ok(match enc.raw_kind() {
        RawKind::Object => {
            let count = enc.count();
            let mut map = IndexMap::with_capacity(count);
            for i in 0..count {
                let key = enc.key(i).ok_or_else(corrupt)?;
                let child = enc.child(i).ok_or_else(corrupt)?;
                map.insert(try_string_from_str(key)?, lift(child)?);
            }
            Heap::from_object(map)
        }
        RawKind::Array => {
            let count = enc.count();
            let mut items = try_vec_with_capacity(count, enc.position())?;
            for i in 0..count {
                items.push(lift(enc.child(i).ok_or_else(corrupt)?)?);
            }
            Heap::from_array(items)
        }
        RawKind::SmallString | RawKind::String => {
            Heap::make_string(enc.as_str().ok_or_else(corrupt)?)
        }
        RawKind::ShortInteger | RawKind::Integer => {
            Heap::make_integer(enc.as_i64().ok_or_else(corrupt)?)
        }
        RawKind::Decimal => Heap::make_decimal(enc.as_f64().ok_or_else(corrupt)?),
        RawKind::Boolean => Heap::make_boolean(enc.as_bool().ok_or_else(corrupt)?),
        RawKind::Null => Heap::make_null(),
    })
}
