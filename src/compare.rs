//! Structural comparison across representations and ownership policies.
//!
//! Every representation implements [`ValueAccess`], a read-only structural view. Equality between
//! any two of them (and between them and native values) is defined once, in [`values_equal`]:
//! kinds must match, then payloads; objects compare as key sets regardless of order.

use crate::convert::CastValue;
use crate::heap::{Heap, Node};
use crate::packet::Packet;
use crate::refcount::{OwningRefCount, RefCount};
use crate::{Buffer, Kind};

/// Read-only structural access to a value.
pub trait ValueAccess {
    /// Handle type of child values.
    type Child: ValueAccess;

    /// The kind of this value.
    fn kind(&self) -> Kind;

    /// Element count of an aggregate, 0 otherwise.
    fn element_count(&self) -> usize;

    /// The `idx`-th element of an array or value of an object.
    fn child_at(&self, idx: usize) -> Option<Self::Child>;

    /// The `idx`-th key of an object.
    fn key_at(&self, idx: usize) -> Option<&str>;

    /// The value stored under `key` in an object.
    fn find_key(&self, key: &str) -> Option<Self::Child>;

    /// The string payload.
    fn as_str(&self) -> Option<&str>;

    /// The integer payload.
    fn as_i64(&self) -> Option<i64>;

    /// The decimal payload.
    fn as_f64(&self) -> Option<f64>;

    /// The boolean payload.
    fn as_bool(&self) -> Option<bool>;
}

impl<T: ValueAccess + ?Sized> ValueAccess for &T {
    type Child = T::Child;

    fn kind(&self) -> Kind {
        (**self).kind()
    }

    fn element_count(&self) -> usize {
        (**self).element_count()
    }

    fn child_at(&self, idx: usize) -> Option<Self::Child> {
        (**self).child_at(idx)
    }

    fn key_at(&self, idx: usize) -> Option<&str> {
        (**self).key_at(idx)
    }

    fn find_key(&self, key: &str) -> Option<Self::Child> {
        (**self).find_key(key)
    }

    fn as_str(&self) -> Option<&str> {
        (**self).as_str()
    }

    fn as_i64(&self) -> Option<i64> {
        (**self).as_i64()
    }

    fn as_f64(&self) -> Option<f64> {
        (**self).as_f64()
    }

    fn as_bool(&self) -> Option<bool> {
        (**self).as_bool()
    }
}

impl<R: OwningRefCount> ValueAccess for Heap<R> {
    type Child = Self;

    fn kind(&self) -> Kind {
        Self::kind(self)
    }

    fn element_count(&self) -> usize {
        if self.is_aggregate() {
            self.size().unwrap_or(0)
        } else {
            0
        }
    }

    fn child_at(&self, idx: usize) -> Option<Self> {
        match self.node() {
            Node::Object(o) => o.get_index(idx).map(|(_, v)| v.clone()),
            Node::Array(a) => a.get(idx).cloned(),
            _ => None,
        }
    }

    fn key_at(&self, idx: usize) -> Option<&str> {
        match self.node() {
            Node::Object(o) => o.get_index(idx).map(|(k, _)| k.as_str()),
            _ => None,
        }
    }

    fn find_key(&self, key: &str) -> Option<Self> {
        self.lookup(key).ok().flatten().cloned()
    }

    fn as_str(&self) -> Option<&str> {
        Self::as_str(self)
    }

    fn as_i64(&self) -> Option<i64> {
        Self::as_i64(self)
    }

    fn as_f64(&self) -> Option<f64> {
        Self::as_f64(self)
    }

    fn as_bool(&self) -> Option<bool> {
        Self::as_bool(self)
    }
}

impl<R: RefCount> ValueAccess for Buffer<R> {
    type Child = Self;

    fn kind(&self) -> Kind {
        Self::kind(self)
    }

    fn element_count(&self) -> usize {
        self.encoded().map_or(0, crate::wire::Encoded::count)
    }

    fn child_at(&self, idx: usize) -> Option<Self> {
        Self::child_at(self, idx)
    }

    fn key_at(&self, idx: usize) -> Option<&str> {
        Self::key_at(self, idx)
    }

    fn find_key(&self, key: &str) -> Option<Self> {
        self.find(key)
    }

    fn as_str(&self) -> Option<&str> {
        Self::as_str(self)
    }

    fn as_i64(&self) -> Option<i64> {
        Self::as_i64(self)
    }

    fn as_f64(&self) -> Option<f64> {
        Self::as_f64(self)
    }

    fn as_bool(&self) -> Option<bool> {
        Self::as_bool(self)
    }
}

impl<R: OwningRefCount> ValueAccess for Packet<R> {
    type Child = Self;

    fn kind(&self) -> Kind {
        Self::kind(self)
    }

    fn element_count(&self) -> usize {
        match self {
            Self::Heap(h) => h.element_count(),
            Self::Buffer(b) => b.element_count(),
        }
    }

    fn child_at(&self, idx: usize) -> Option<Self> {
        match self {
            Self::Heap(h) => h.child_at(idx).map(Self::Heap),
            Self::Buffer(b) => ValueAccess::child_at(b, idx).map(Self::Buffer),
        }
    }

    fn key_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Heap(h) => ValueAccess::key_at(h, idx),
            Self::Buffer(b) => ValueAccess::key_at(b, idx),
        }
    }

    fn find_key(&self, key: &str) -> Option<Self> {
        match self {
            Self::Heap(h) => h.find_key(key).map(Self::Heap),
            Self::Buffer(b) => b.find_key(key).map(Self::Buffer),
        }
    }

    fn as_str(&self) -> Option<&str> {
        Self::as_str(self)
    }

    fn as_i64(&self) -> Option<i64> {
        Self::as_i64(self)
    }

    fn as_f64(&self) -> Option<f64> {
        Self::as_f64(self)
    }

    fn as_bool(&self) -> Option<bool> {
        Self::as_bool(self)
    }
}

/// Deep structural equality between any two values.
///
/// Decimals compare by value, and additionally equal themselves bit for bit (so NaN payloads
/// are reflexive).
pub fn values_equal<A, B>(a: &A, b: &B) -> bool
where
    A: ValueAccess + ?Sized,
    B: ValueAccess + ?Sized,
{
    let kind = a.kind();
    if kind != b.kind() {
        return false;
    }
    match kind {
        Kind::Object => {
            let n = a.element_count();
            n == b.element_count()
                && (0..n).all(|i| match (b.key_at(i), b.child_at(i)) {
                    (Some(key), Some(bv)) => {
                        a.find_key(key).is_some_and(|av| values_equal(&av, &bv))
                    }
                    _ => false,
                })
        }
        Kind::Array => {
            let n = a.element_count();
            n == b.element_count()
                && (0..n).all(|i| match (a.child_at(i), b.child_at(i)) {
                    (Some(av), Some(bv)) => values_equal(&av, &bv),
                    _ => false,
                })
        }
        Kind::String => a.as_str() == b.as_str(),
        Kind::Integer => a.as_i64() == b.as_i64(),
        Kind::Decimal => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => decimals_equal(x, y),
            _ => false,
        },
        Kind::Boolean => a.as_bool() == b.as_bool(),
        Kind::Null => true,
    }
}

#[inline]
#[allow(clippy::float_cmp)]
pub(crate) fn decimals_equal(x: f64, y: f64) -> bool {
    x == y || x.to_bits() == y.to_bits()
}

/// Identity, then kind, then encoded bytes, then structure.
fn buffers_equal<R1: RefCount, R2: RefCount>(a: &Buffer<R1>, b: &Buffer<R2>) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    let (x, y) = (a.value_bytes(), b.value_bytes());
    if core::ptr::eq(x, y) || x == y {
        return true;
    }
    values_equal(a, b)
}

fn packets_equal<R1: OwningRefCount, R2: OwningRefCount>(a: &Packet<R1>, b: &Packet<R2>) -> bool {
    match (a, b) {
        (Packet::Buffer(x), Packet::Buffer(y)) => buffers_equal(x, y),
        _ => values_equal(a, b),
    }
}

impl<R1: OwningRefCount, R2: OwningRefCount> PartialEq<Heap<R2>> for Heap<R1> {
    fn eq(&self, other: &Heap<R2>) -> bool {
        values_equal(self, other)
    }
}

impl<R: OwningRefCount> Eq for Heap<R> {}

impl<R1: RefCount, R2: RefCount> PartialEq<Buffer<R2>> for Buffer<R1> {
    fn eq(&self, other: &Buffer<R2>) -> bool {
        buffers_equal(self, other)
    }
}

impl<R: RefCount> Eq for Buffer<R> {}

impl<R1: OwningRefCount, R2: OwningRefCount> PartialEq<Packet<R2>> for Packet<R1> {
    fn eq(&self, other: &Packet<R2>) -> bool {
        packets_equal(self, other)
    }
}

impl<R: OwningRefCount> Eq for Packet<R> {}

macro_rules! impl_cross_eq {
    ($lhs:ident<$l:ident: $lb:ident>, $rhs:ident<$r:ident: $rb:ident>) => {
        impl<$l: $lb, $r: $rb> PartialEq<$rhs<$r>> for $lhs<$l> {
            fn eq(&self, other: &$rhs<$r>) -> bool {
                values_equal(self, other)
            }
        }

        impl<$l: $lb, $r: $rb> PartialEq<$lhs<$l>> for $rhs<$r> {
            fn eq(&self, other: &$lhs<$l>) -> bool {
                values_equal(self, other)
            }
        }
    };
}

impl_cross_eq!(Heap<R1: OwningRefCount>, Buffer<R2: RefCount>);
impl_cross_eq!(Heap<R1: OwningRefCount>, Packet<R2: OwningRefCount>);
impl_cross_eq!(Buffer<R1: RefCount>, Packet<R2: OwningRefCount>);

macro_rules! impl_native_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl_native_eq!(@one Heap<R: OwningRefCount>, $t);
            impl_native_eq!(@one Buffer<R: RefCount>, $t);
            impl_native_eq!(@one Packet<R: OwningRefCount>, $t);
        )*
    };
    (@one $v:ident<$r:ident: $rb:ident>, $t:ty) => {
        impl<$r: $rb> PartialEq<$t> for $v<$r> {
            fn eq(&self, other: &$t) -> bool {
                CastValue::compare(other, self)
            }
        }

        impl<$r: $rb> PartialEq<$v<$r>> for $t {
            fn eq(&self, other: &$v<$r>) -> bool {
                CastValue::compare(self, other)
            }
        }
    };
}

impl_native_eq!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String, &str, (),
);

macro_rules! impl_str_eq {
    ($($v:ident<$r:ident: $rb:ident>),*) => {
        $(
            impl<$r: $rb> PartialEq<str> for $v<$r> {
                fn eq(&self, other: &str) -> bool {
                    CastValue::compare(other, self)
                }
            }

            impl<$r: $rb> PartialEq<$v<$r>> for str {
                fn eq(&self, other: &$v<$r>) -> bool {
                    CastValue::compare(self, other)
                }
            }
        )*
    };
}

impl_str_eq!(Heap<R: OwningRefCount>, Buffer<R: RefCount>, Packet<R: OwningRefCount>);
