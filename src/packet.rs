//! A value that is either a tree or a buffer, switching on demand.

use core::fmt;

use crate::buffer::SharedBytes;
use crate::convert::CastValue;
use crate::debug::trace;
use crate::iter::{PacketEntries, PacketKeys, PacketValues};
use crate::refcount::{OwningRefCount, Safe};
use crate::{Buffer, ErrorCode, Heap, Kind, PathElem, ValueError};

/// A value backed by either a [`Heap`] or a [`Buffer`].
///
/// Reads go to whichever representation is active and give the same answers in both states.
/// Mutations lift a buffer-backed packet into a tree first; [`Packet::finalize`] goes the other
/// way. Children returned by lookups and iterators are packets in the parent's current state.
pub enum Packet<R: OwningRefCount = Safe> {
    /// Tree-backed.
    Heap(Heap<R>),
    /// Buffer-backed.
    Buffer(Buffer<R>),
}

impl<R: OwningRefCount> Clone for Packet<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Heap(h) => Self::Heap(h.clone()),
            Self::Buffer(b) => Self::Buffer(b.clone()),
        }
    }
}

impl<R: OwningRefCount> Default for Packet<R> {
    fn default() -> Self {
        Self::Heap(Heap::make_null())
    }
}

impl<R: OwningRefCount> From<Heap<R>> for Packet<R> {
    fn from(h: Heap<R>) -> Self {
        Self::Heap(h)
    }
}

impl<R: OwningRefCount> From<Buffer<R>> for Packet<R> {
    fn from(b: Buffer<R>) -> Self {
        Self::Buffer(b)
    }
}

macro_rules! dispatch {
    ($self:expr, $v:ident => $e:expr) => {
        match $self {
            Packet::Heap($v) => $e,
            Packet::Buffer($v) => $e,
        }
    };
}

macro_rules! dispatch_wrap {
    ($self:expr, $v:ident => $e:expr) => {
        match $self {
            Packet::Heap($v) => $e.map(Packet::Heap),
            Packet::Buffer($v) => $e.map(Packet::Buffer),
        }
    };
}

impl<R: OwningRefCount> Packet<R> {
    /// An empty tree-backed object.
    #[must_use]
    pub fn make_object() -> Self {
        Self::Heap(Heap::make_object())
    }

    /// An empty tree-backed array.
    #[must_use]
    pub fn make_array() -> Self {
        Self::Heap(Heap::make_array())
    }

    /// A string.
    #[must_use]
    pub fn make_string(s: &str) -> Self {
        Self::Heap(Heap::make_string(s))
    }

    /// An integer.
    #[must_use]
    pub const fn make_integer(v: i64) -> Self {
        Self::Heap(Heap::make_integer(v))
    }

    /// A decimal.
    #[must_use]
    pub const fn make_decimal(v: f64) -> Self {
        Self::Heap(Heap::make_decimal(v))
    }

    /// A boolean.
    #[must_use]
    pub const fn make_boolean(v: bool) -> Self {
        Self::Heap(Heap::make_boolean(v))
    }

    /// Null.
    #[must_use]
    pub const fn make_null() -> Self {
        Self::Heap(Heap::make_null())
    }

    /// Returns true iff the packet is currently buffer-backed.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }

    /// Switch to the buffer representation. No-op if already buffer-backed.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for scalar trees, or any finalize error. The packet is left
    /// unchanged on error.
    pub fn finalize(&mut self) -> Result<(), ValueError> {
        if let Self::Heap(h) = self {
            let b = h.finalize()?;
            trace!("packet lowered to {} byte buffer", b.value_bytes().len());
            *self = Self::Buffer(b);
        }
        Ok(())
    }

    /// Alias of [`Packet::finalize`].
    ///
    /// # Errors
    ///
    /// See [`Packet::finalize`].
    pub fn lower(&mut self) -> Result<(), ValueError> {
        self.finalize()
    }

    /// Switch to the tree representation. No-op if already tree-backed.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the tree cannot be allocated.
    pub fn lift(&mut self) -> Result<(), ValueError> {
        if let Self::Buffer(b) = self {
            let h = b.lift()?;
            trace!("packet lifted from {} byte buffer", b.value_bytes().len());
            *self = Self::Heap(h);
        }
        Ok(())
    }

    /// Alias of [`Packet::lift`].
    ///
    /// # Errors
    ///
    /// See [`Packet::lift`].
    pub fn definalize(&mut self) -> Result<(), ValueError> {
        self.lift()
    }

    /// Consume the packet and return it as a tree.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if a buffer-backed packet cannot be lifted.
    pub fn into_heap(self) -> Result<Heap<R>, ValueError> {
        match self {
            Self::Heap(h) => Ok(h),
            Self::Buffer(b) => b.lift(),
        }
    }

    /// Consume the packet and return it as a buffer.
    ///
    /// # Errors
    ///
    /// See [`Packet::finalize`].
    pub fn into_buffer(self) -> Result<Buffer<R>, ValueError> {
        match self {
            Self::Heap(h) => h.finalize(),
            Self::Buffer(b) => Ok(b),
        }
    }

    /// The tree, if tree-backed.
    #[must_use]
    pub const fn as_heap(&self) -> Option<&Heap<R>> {
        match self {
            Self::Heap(h) => Some(h),
            Self::Buffer(_) => None,
        }
    }

    /// The buffer, if buffer-backed.
    #[must_use]
    pub const fn as_buffer(&self) -> Option<&Buffer<R>> {
        match self {
            Self::Buffer(b) => Some(b),
            Self::Heap(_) => None,
        }
    }

    fn heap_mut(&mut self) -> Result<&mut Heap<R>, ValueError> {
        self.lift()?;
        match self {
            Self::Heap(h) => Ok(h),
            Self::Buffer(_) => Err(ValueError::of(ErrorCode::NotFinalized)),
        }
    }

    fn buffer(&self) -> Result<&Buffer<R>, ValueError> {
        self.as_buffer()
            .ok_or_else(|| ValueError::of(ErrorCode::NotFinalized))
    }

    /// The kind of this value.
    #[must_use]
    pub fn kind(&self) -> Kind {
        dispatch!(self, v => v.kind())
    }

    /// Returns true iff this is an object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.kind() == Kind::Object
    }

    /// Returns true iff this is an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.kind() == Kind::Array
    }

    /// Returns true iff this is an object or array.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.kind().is_aggregate()
    }

    /// Returns true iff this is a string.
    #[must_use]
    pub fn is_str(&self) -> bool {
        self.kind() == Kind::String
    }

    /// Returns true iff this is an integer.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.kind() == Kind::Integer
    }

    /// Returns true iff this is a decimal.
    #[must_use]
    pub fn is_decimal(&self) -> bool {
        self.kind() == Kind::Decimal
    }

    /// Returns true iff this is an integer or decimal.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Returns true iff this is a boolean.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.kind() == Kind::Boolean
    }

    /// Returns true iff this is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind() == Kind::Null
    }

    /// Element count of an aggregate, or byte length of a string.
    ///
    /// # Errors
    ///
    /// Returns `NotSized` for numbers, booleans and null.
    pub fn size(&self) -> Result<usize, ValueError> {
        dispatch!(self, v => v.size())
    }

    /// Returns `size() == 0`.
    ///
    /// # Errors
    ///
    /// Returns `NotSized` for numbers, booleans and null.
    pub fn is_empty(&self) -> Result<bool, ValueError> {
        self.size().map(|n| n == 0)
    }

    /// The child selected by `sel`, or null when absent.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject`/`ExpectedArray` when the selector does not fit this value's kind.
    pub fn get<'p>(&self, sel: impl Into<PathElem<'p>>) -> Result<Self, ValueError> {
        let sel = sel.into();
        dispatch_wrap!(self, v => v.get(sel))
    }

    /// The child selected by `sel`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound`/`IndexOutOfBounds` when absent, and a type error when the selector
    /// does not fit this value's kind.
    pub fn at<'p>(&self, sel: impl Into<PathElem<'p>>) -> Result<Self, ValueError> {
        let sel = sel.into();
        dispatch_wrap!(self, v => v.at(sel))
    }

    /// Follow `path`; null as soon as a step is absent.
    ///
    /// # Errors
    ///
    /// Returns a type error when a step does not fit the kind of the value it is applied to.
    pub fn get_path(&self, path: &[PathElem<'_>]) -> Result<Self, ValueError> {
        dispatch_wrap!(self, v => v.get_path(path))
    }

    /// Follow `path`, failing on the first absent step.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound`/`IndexOutOfBounds` for absent steps and type errors for mismatched
    /// ones.
    pub fn at_path(&self, path: &[PathElem<'_>]) -> Result<Self, ValueError> {
        dispatch_wrap!(self, v => v.at_path(path))
    }

    /// Returns true iff this object holds `key`.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn contains_key(&self, key: &str) -> Result<bool, ValueError> {
        dispatch!(self, v => v.contains_key(key))
    }

    /// Borrow the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        dispatch!(self, v => v.as_str())
    }

    /// The integer payload.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        dispatch!(self, v => v.as_i64())
    }

    /// The decimal payload.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        dispatch!(self, v => v.as_f64())
    }

    /// The boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        dispatch!(self, v => v.as_bool())
    }

    /// The string payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedString` for other kinds.
    pub fn str(&self) -> Result<&str, ValueError> {
        dispatch!(self, v => v.str())
    }

    /// The integer payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedInteger` for other kinds.
    pub fn integer(&self) -> Result<i64, ValueError> {
        dispatch!(self, v => v.integer())
    }

    /// The decimal payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedDecimal` for other kinds.
    pub fn decimal(&self) -> Result<f64, ValueError> {
        dispatch!(self, v => v.decimal())
    }

    /// Integer or decimal payload as `f64`.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedNumeric` for other kinds.
    pub fn numeric(&self) -> Result<f64, ValueError> {
        dispatch!(self, v => v.numeric())
    }

    /// The boolean payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedBoolean` for other kinds.
    pub fn boolean(&self) -> Result<bool, ValueError> {
        dispatch!(self, v => v.boolean())
    }

    /// Iterate the values of an object or the elements of an array.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates.
    pub fn values(&self) -> Result<PacketValues<'_, R>, ValueError> {
        Ok(match self {
            Self::Heap(h) => PacketValues::Heap(h.values()?),
            Self::Buffer(b) => PacketValues::Buffer(b.values()?),
        })
    }

    /// Iterate the keys of an object.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn keys(&self) -> Result<PacketKeys<'_, R>, ValueError> {
        Ok(match self {
            Self::Heap(h) => PacketKeys::Heap(h.keys()?),
            Self::Buffer(b) => PacketKeys::Buffer(b.keys()?),
        })
    }

    /// Iterate the `(key, value)` pairs of an object.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn entries(&self) -> Result<PacketEntries<'_, R>, ValueError> {
        Ok(match self {
            Self::Heap(h) => PacketEntries::Heap(h.entries()?),
            Self::Buffer(b) => PacketEntries::Buffer(b.entries()?),
        })
    }

    /// Insert into an object or array, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::insert`].
    pub fn insert<'p, V: CastValue>(
        &mut self,
        sel: impl Into<PathElem<'p>>,
        value: V,
    ) -> Result<(), ValueError> {
        self.heap_mut()?.insert(sel, value)
    }

    /// Upsert into an object or replace an array element, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::set`].
    pub fn set<'p, V: CastValue>(
        &mut self,
        sel: impl Into<PathElem<'p>>,
        value: V,
    ) -> Result<(), ValueError> {
        self.heap_mut()?.set(sel, value)
    }

    /// Remove a key or element, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::erase`].
    pub fn erase<'p>(&mut self, sel: impl Into<PathElem<'p>>) -> Result<Option<Self>, ValueError> {
        Ok(self.heap_mut()?.erase(sel)?.map(Self::Heap))
    }

    /// Append to an array, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::push_back`].
    pub fn push_back<V: CastValue>(&mut self, value: V) -> Result<(), ValueError> {
        self.heap_mut()?.push_back(value)
    }

    /// Prepend to an array, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::push_front`].
    pub fn push_front<V: CastValue>(&mut self, value: V) -> Result<(), ValueError> {
        self.heap_mut()?.push_front(value)
    }

    /// Remove the last array element, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::pop_back`].
    pub fn pop_back(&mut self) -> Result<Option<Self>, ValueError> {
        Ok(self.heap_mut()?.pop_back()?.map(Self::Heap))
    }

    /// Remove the first array element, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::pop_front`].
    pub fn pop_front(&mut self) -> Result<Option<Self>, ValueError> {
        Ok(self.heap_mut()?.pop_front()?.map(Self::Heap))
    }

    /// Remove every element of an aggregate, lifting first.
    ///
    /// # Errors
    ///
    /// See [`Heap::clear`].
    pub fn clear(&mut self) -> Result<(), ValueError> {
        self.heap_mut()?.clear()
    }

    /// Borrow the encoded bytes of a buffer-backed aggregate.
    ///
    /// # Errors
    ///
    /// Returns `NotFinalized` for tree-backed packets and `ExpectedAggregate` for scalars.
    pub fn get_bytes(&self) -> Result<&[u8], ValueError> {
        self.buffer()?.get_bytes()
    }

    /// Another owning handle to the encoded bytes of a buffer-backed aggregate.
    ///
    /// # Errors
    ///
    /// Returns `NotFinalized` for tree-backed packets and `ExpectedAggregate` for scalars.
    pub fn share_bytes(&self) -> Result<SharedBytes<R>, ValueError> {
        self.buffer()?.share_bytes()
    }

    /// Copy the encoded bytes of a buffer-backed aggregate.
    ///
    /// # Errors
    ///
    /// Returns `NotFinalized` for tree-backed packets and `ExpectedAggregate` for scalars.
    pub fn dup_bytes(&self) -> Result<Vec<u8>, ValueError> {
        self.buffer()?.dup_bytes()
    }

    /// Reference count of the active representation's storage.
    #[must_use]
    pub fn use_count(&self) -> usize {
        dispatch!(self, v => v.use_count())
    }
}

impl<R: OwningRefCount> fmt::Debug for Packet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, v => fmt::Debug::fmt(v, f))
    }
}
