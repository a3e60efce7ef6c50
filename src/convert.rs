//! Conversions between native Rust values and trees.
//!
//! [`CastValue`] turns a native value into a [`Heap`] under any owning policy; [`FromValue`]
//! extracts a native value back out of any representation. User types opt in by implementing
//! the traits or with `#[derive(CastValue, FromValue)]`.

use core::any::Any;
use core::hash::{BuildHasher, Hash};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::alloc_util::{try_string_from_str, try_vec_with_capacity};
use crate::compare::{decimals_equal, values_equal, ValueAccess};
use crate::refcount::{OwningRefCount, RefCount, Safe};
use crate::{Buffer, ErrorCode, Heap, Kind, Packet, ValueError};

/// Conversion of a native value into a tree.
pub trait CastValue {
    /// Build a tree under policy `R`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value (or any element of it) cannot be represented.
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError>;

    /// Structural equality against any value. Defaults to casting and comparing.
    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        self.cast::<Safe>()
            .is_ok_and(|heap| values_equal(&heap, other))
    }
}

/// Extraction of a native value from any representation.
pub trait FromValue: Sized {
    /// Extract from `value`.
    ///
    /// # Errors
    ///
    /// Returns a type error when the value's shape does not match `Self`.
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError>;

    /// Value to use when an object field is absent, if absence is acceptable.
    #[must_use]
    fn from_missing() -> Option<Self> {
        None
    }
}

fn expect_kind<V: ValueAccess + ?Sized>(v: &V, kind: Kind, code: ErrorCode) -> Result<(), ValueError> {
    if v.kind() == kind {
        Ok(())
    } else {
        Err(ValueError::of(code))
    }
}

impl CastValue for () {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        Ok(Heap::make_null())
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        other.kind() == Kind::Null
    }
}

impl FromValue for () {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        expect_kind(value, Kind::Null, ErrorCode::ExpectedNull)
    }
}

impl<T: CastValue> CastValue for Option<T> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        match self {
            Some(v) => v.cast(),
            None => Ok(Heap::make_null()),
        }
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        match self {
            Some(v) => v.compare(other),
            None => other.kind() == Kind::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        if value.kind() == Kind::Null {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }

    fn from_missing() -> Option<Self> {
        Some(None)
    }
}

impl CastValue for bool {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        Ok(Heap::make_boolean(*self))
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        other.as_bool() == Some(*self)
    }
}

impl FromValue for bool {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        value
            .as_bool()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedBoolean))
    }
}

macro_rules! impl_integer {
    ($($t:ty),* $(,)?) => {
        $(
            impl CastValue for $t {
                fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
                    i64::try_from(*self)
                        .map(Heap::make_integer)
                        .map_err(|_| ValueError::of(ErrorCode::IntegerOutOfRange))
                }

                fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
                    match (i64::try_from(*self), other.as_i64()) {
                        (Ok(a), Some(b)) => a == b,
                        _ => false,
                    }
                }
            }

            impl FromValue for $t {
                fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
                    let v = value
                        .as_i64()
                        .ok_or_else(|| ValueError::of(ErrorCode::ExpectedInteger))?;
                    <$t>::try_from(v).map_err(|_| ValueError::of(ErrorCode::IntegerOutOfRange))
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl CastValue for f64 {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        Ok(Heap::make_decimal(*self))
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        other.as_f64().is_some_and(|d| decimals_equal(*self, d))
    }
}

impl CastValue for f32 {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        Ok(Heap::make_decimal(f64::from(*self)))
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        f64::from(*self).compare(other)
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        if let Some(d) = value.as_f64() {
            return Ok(d);
        }
        value
            .as_i64()
            .map(|i| i as Self)
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedNumeric))
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        f64::from_value(value).map(|d| d as Self)
    }
}

impl CastValue for str {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        Ok(Heap::make_string(self))
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        other.as_str() == Some(self)
    }
}

impl CastValue for String {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        self.as_str().cast()
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        self.as_str().compare(other)
    }
}

impl CastValue for Cow<'_, str> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        self.as_ref().cast()
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        self.as_ref().compare(other)
    }
}

impl CastValue for char {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        let mut buf = [0u8; 4];
        Ok(Heap::make_string(self.encode_utf8(&mut buf)))
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        let mut buf = [0u8; 4];
        other.as_str() == Some(self.encode_utf8(&mut buf))
    }
}

impl FromValue for String {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        let s = value
            .as_str()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedString))?;
        try_string_from_str(s)
    }
}

impl FromValue for char {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        let s = value
            .as_str()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedString))?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ValueError::of(ErrorCode::ExpectedString)),
        }
    }
}

impl FromValue for Cow<'static, str> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        String::from_value(value).map(Cow::Owned)
    }
}

macro_rules! impl_wrapper {
    ($($w:ident),*) => {
        $(
            impl<T: CastValue + ?Sized> CastValue for $w<T> {
                fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
                    (**self).cast()
                }

                fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
                    (**self).compare(other)
                }
            }

            impl<T: FromValue> FromValue for $w<T> {
                fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
                    T::from_value(value).map($w::new)
                }

                fn from_missing() -> Option<Self> {
                    T::from_missing().map($w::new)
                }
            }
        )*
    };
}

impl_wrapper!(Box, Rc, Arc);

impl<T: CastValue + ?Sized> CastValue for &T {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        (**self).cast()
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        (**self).compare(other)
    }
}

impl<T: CastValue + ?Sized> CastValue for &mut T {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        (**self).cast()
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        (**self).compare(other)
    }
}

impl<R0: OwningRefCount> CastValue for Heap<R0> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        let any: &dyn Any = self;
        if let Some(same) = any.downcast_ref::<Heap<R>>() {
            return Ok(same.clone());
        }
        Ok(self.convert::<R>())
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        values_equal(self, other)
    }
}

impl<R0: RefCount> CastValue for Buffer<R0> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        self.lift_into::<R>()
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        values_equal(self, other)
    }
}

impl<R0: OwningRefCount> CastValue for Packet<R0> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        match self {
            Self::Heap(h) => h.cast(),
            Self::Buffer(b) => b.cast(),
        }
    }

    fn compare<V: ValueAccess + ?Sized>(&self, other: &V) -> bool {
        values_equal(self, other)
    }
}

/// Deep-copy any value into a tree.
pub(crate) fn heap_from_access<R, V>(value: &V) -> Result<Heap<R>, ValueError>
where
    R: OwningRefCount,
    V: ValueAccess + ?Sized,
{
    Ok(match value.kind() {
        Kind::Object => {
            let n = value.element_count();
            let mut map = IndexMap::with_capacity(n);
            for i in 0..n {
                let (Some(key), Some(child)) = (value.key_at(i), value.child_at(i)) else {
                    return Err(ValueError::of(ErrorCode::ExpectedObject));
                };
                map.insert(try_string_from_str(key)?, heap_from_access(&child)?);
            }
            Heap::from_object(map)
        }
        Kind::Array => {
            let n = value.element_count();
            let mut items = try_vec_with_capacity(n, 0)?;
            for i in 0..n {
                let child = value
                    .child_at(i)
                    .ok_or_else(|| ValueError::of(ErrorCode::ExpectedArray))?;
                items.push(heap_from_access(&child)?);
            }
            Heap::from_array(items)
        }
        Kind::String => Heap::make_string(value.as_str().unwrap_or_default()),
        Kind::Integer => Heap::make_integer(value.as_i64().unwrap_or_default()),
        Kind::Decimal => Heap::make_decimal(value.as_f64().unwrap_or_default()),
        Kind::Boolean => Heap::make_boolean(value.as_bool().unwrap_or_default()),
        Kind::Null => Heap::make_null(),
    })
}

impl<R: OwningRefCount> FromValue for Heap<R> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        heap_from_access(value)
    }
}

impl<R: OwningRefCount> FromValue for Packet<R> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        heap_from_access(value).map(Packet::Heap)
    }
}

impl<R: OwningRefCount> FromValue for Buffer<R> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        heap_from_access::<R, V>(value)?.finalize()
    }
}

fn cast_sequence<'a, R, T, I>(len: usize, items: I) -> Result<Heap<R>, ValueError>
where
    R: OwningRefCount,
    T: CastValue + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = try_vec_with_capacity(len, 0)?;
    for item in items {
        out.push(item.cast::<R>()?);
    }
    Ok(Heap::from_array(out))
}

fn extract_sequence<T, V, C>(value: &V) -> Result<C, ValueError>
where
    T: FromValue,
    V: ValueAccess + ?Sized,
    C: FromIterator<T>,
{
    expect_kind(value, Kind::Array, ErrorCode::ExpectedArray)?;
    (0..value.element_count())
        .map(|i| {
            let child = value
                .child_at(i)
                .ok_or_else(|| ValueError::of(ErrorCode::IndexOutOfBounds))?;
            T::from_value(&child)
        })
        .collect()
}

impl<T: CastValue> CastValue for [T] {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_sequence(self.len(), self)
    }
}

impl<T: CastValue, const N: usize> CastValue for [T; N] {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_sequence(N, self)
    }
}

impl<T: CastValue> CastValue for Vec<T> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_sequence(self.len(), self)
    }
}

impl<T: CastValue> CastValue for VecDeque<T> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_sequence(self.len(), self)
    }
}

impl<T: CastValue> CastValue for BTreeSet<T> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_sequence(self.len(), self)
    }
}

impl<T: CastValue, S> CastValue for HashSet<T, S> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_sequence(self.len(), self)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        extract_sequence(value)
    }
}

impl<T: FromValue> FromValue for VecDeque<T> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        extract_sequence(value)
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        extract_sequence(value)
    }
}

impl<T: FromValue + Eq + Hash, S: BuildHasher + Default> FromValue for HashSet<T, S> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        extract_sequence(value)
    }
}

fn cast_map<'a, R, K, T, I>(len: usize, entries: I) -> Result<Heap<R>, ValueError>
where
    R: OwningRefCount,
    K: AsRef<str> + 'a,
    T: CastValue + 'a,
    I: IntoIterator<Item = (&'a K, &'a T)>,
{
    let mut map = IndexMap::with_capacity(len);
    for (k, v) in entries {
        map.insert(try_string_from_str(k.as_ref())?, v.cast::<R>()?);
    }
    Ok(Heap::from_object(map))
}

fn extract_map<K, T, V, C>(value: &V) -> Result<C, ValueError>
where
    K: From<String>,
    T: FromValue,
    V: ValueAccess + ?Sized,
    C: FromIterator<(K, T)>,
{
    expect_kind(value, Kind::Object, ErrorCode::ExpectedObject)?;
    (0..value.element_count())
        .map(|i| {
            let (Some(key), Some(child)) = (value.key_at(i), value.child_at(i)) else {
                return Err(ValueError::of(ErrorCode::KeyNotFound));
            };
            Ok((K::from(try_string_from_str(key)?), T::from_value(&child)?))
        })
        .collect()
}

impl<K: AsRef<str>, T: CastValue> CastValue for BTreeMap<K, T> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_map(self.len(), self)
    }
}

impl<K: AsRef<str>, T: CastValue, S> CastValue for HashMap<K, T, S> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_map(self.len(), self)
    }
}

impl<K: AsRef<str>, T: CastValue, S> CastValue for IndexMap<K, T, S> {
    fn cast<R: OwningRefCount>(&self) -> Result<Heap<R>, ValueError> {
        cast_map(self.len(), self)
    }
}

impl<K: From<String> + Ord, T: FromValue> FromValue for BTreeMap<K, T> {
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        extract_map(value)
    }
}

impl<K, T, S> FromValue for HashMap<K, T, S>
where
    K: From<String> + Eq + Hash,
    T: FromValue,
    S: BuildHasher + Default,
{
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        extract_map(value)
    }
}

impl<K, T, S> FromValue for IndexMap<K, T, S>
where
    K: From<String> + Eq + Hash,
    T: FromValue,
    S: BuildHasher + Default,
{
    fn from_value<V: ValueAccess + ?Sized>(value: &V) -> Result<Self, ValueError> {
        extract_map(value)
    }
}

#[doc(hidden)]
pub mod __derive {
    //! Support functions for `dualval-derive` expansions.

    pub use indexmap::IndexMap;

    use super::{CastValue, FromValue};
    use crate::compare::ValueAccess;
    use crate::refcount::OwningRefCount;
    use crate::{ErrorCode, Heap, ValueError};

    pub fn object<R: OwningRefCount>() -> Heap<R> {
        Heap::make_object()
    }

    pub fn array<R: OwningRefCount>() -> Heap<R> {
        Heap::make_array()
    }

    pub fn put<R: OwningRefCount, T: CastValue + ?Sized>(
        obj: &mut Heap<R>,
        key: &str,
        value: &T,
    ) -> Result<(), ValueError> {
        obj.insert(key, value.cast::<R>()?)
    }

    pub fn push<R: OwningRefCount, T: CastValue + ?Sized>(
        arr: &mut Heap<R>,
        value: &T,
    ) -> Result<(), ValueError> {
        arr.push_back(value.cast::<R>()?)
    }

    /// Extract `key`, falling back to `FromValue::from_missing` when absent.
    pub fn field<T: FromValue, V: ValueAccess + ?Sized>(
        value: &V,
        key: &str,
    ) -> Result<T, ValueError> {
        match value.find_key(key) {
            Some(child) => T::from_value(&child),
            None => T::from_missing().ok_or_else(|| ValueError::of(ErrorCode::KeyNotFound)),
        }
    }

    /// Extract `key`, using `Default` when absent.
    pub fn field_or_default<T: FromValue + Default, V: ValueAccess + ?Sized>(
        value: &V,
        key: &str,
    ) -> Result<T, ValueError> {
        match value.find_key(key) {
            Some(child) => T::from_value(&child),
            None => Ok(T::default()),
        }
    }

    pub fn element<T: FromValue, V: ValueAccess + ?Sized>(
        value: &V,
        idx: usize,
    ) -> Result<T, ValueError> {
        let child = value
            .child_at(idx)
            .ok_or_else(|| ValueError::of(ErrorCode::IndexOutOfBounds))?;
        T::from_value(&child)
    }

    pub fn expect_object<V: ValueAccess + ?Sized>(value: &V) -> Result<(), ValueError> {
        if value.kind() == crate::Kind::Object {
            Ok(())
        } else {
            Err(ValueError::of(ErrorCode::ExpectedObject))
        }
    }

    pub fn expect_array<V: ValueAccess + ?Sized>(
        value: &V,
        len: usize,
    ) -> Result<(), ValueError> {
        if value.kind() != crate::Kind::Array {
            return Err(ValueError::of(ErrorCode::ExpectedArray));
        }
        if value.element_count() != len {
            return Err(ValueError::of(ErrorCode::IndexOutOfBounds));
        }
        Ok(())
    }

    /// For externally tagged enums: the single `(name, payload)` entry of an object.
    pub fn variant<V: ValueAccess + ?Sized>(value: &V) -> Result<(&str, V::Child), ValueError> {
        expect_object(value)?;
        if value.element_count() != 1 {
            return Err(ValueError::of(ErrorCode::ExpectedObject));
        }
        match (value.key_at(0), value.child_at(0)) {
            (Some(k), Some(v)) => Ok((k, v)),
            _ => Err(ValueError::of(ErrorCode::ExpectedObject)),
        }
    }

    pub fn unknown_variant() -> ValueError {
        ValueError::of(ErrorCode::KeyNotFound)
    }
}
