use core::fmt;
use core::ops::Deref;

use crate::alloc_util::try_vec_from_slice;
use crate::debug::trace;
use crate::iter::{BufferEntries, BufferKeys, BufferValues};
use crate::kind::RawKind;
use crate::parse::validate;
use crate::refcount::{OwningRefCount, RefCount, Safe, View};
use crate::wire::Encoded;
use crate::{ErrorCode, Heap, Kind, ParseLimits, PathElem, ValueError};

/// An immutable, validated, contiguous encoding of a value.
///
/// A `Buffer` is a handle to shared storage plus the offset of the value it denotes. Looking up
/// a child returns another handle to the same storage; nothing is copied. Buffers only come into
/// existence through [`Heap::finalize`] or by validating foreign bytes.
pub struct Buffer<R: RefCount = Safe> {
    storage: Option<R::Bytes>,
    offset: usize,
}

impl<R: RefCount> Clone for Buffer<R> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            offset: self.offset,
        }
    }
}

impl<R: RefCount> Default for Buffer<R> {
    fn default() -> Self {
        Self::make_null()
    }
}

impl<R: OwningRefCount> Buffer<R> {
    /// Validate `bytes` and copy them into storage owned by this policy.
    ///
    /// # Errors
    ///
    /// Returns a parse error if validation fails, or `AllocationFailed`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError> {
        Self::from_bytes_with_limits(bytes, ParseLimits::default())
    }

    /// Validate `bytes` under explicit limits and copy them into owned storage.
    ///
    /// # Errors
    ///
    /// Returns a parse error if validation fails, or `AllocationFailed`.
    pub fn from_bytes_with_limits(bytes: &[u8], limits: ParseLimits) -> Result<Self, ValueError> {
        validate(bytes, limits)?;
        let owned = try_vec_from_slice(bytes, 0)?;
        Ok(Self::from_trusted(R::allocate_bytes(owned)))
    }

    /// Rebuild a tree from this buffer under the same policy.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the tree cannot be allocated.
    pub fn lift(&self) -> Result<Heap<R>, ValueError> {
        self.lift_into::<R>()
    }

    /// Alias of [`Buffer::lift`].
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the tree cannot be allocated.
    pub fn definalize(&self) -> Result<Heap<R>, ValueError> {
        self.lift()
    }
}

impl<'a> Buffer<View<'a>> {
    /// Validate `bytes` and borrow them without copying.
    ///
    /// # Errors
    ///
    /// Returns a parse error if validation fails.
    pub fn from_view(bytes: &'a [u8]) -> Result<Self, ValueError> {
        Self::from_storage(bytes, ParseLimits::default())
    }
}

impl<R: RefCount> Buffer<R> {
    pub(crate) const fn from_trusted(storage: R::Bytes) -> Self {
        Self {
            storage: Some(storage),
            offset: 0,
        }
    }

    /// Validate and adopt existing storage without copying.
    ///
    /// # Errors
    ///
    /// Returns a parse error if validation fails.
    pub fn from_storage(storage: R::Bytes, limits: ParseLimits) -> Result<Self, ValueError> {
        validate(&storage, limits)?;
        Ok(Self::from_trusted(storage))
    }

    /// The null buffer. It owns no storage.
    #[must_use]
    pub const fn make_null() -> Self {
        Self {
            storage: None,
            offset: 0,
        }
    }

    pub(crate) fn encoded(&self) -> Option<Encoded<'_>> {
        self.storage
            .as_deref()
            .map(|data| Encoded::new(data, self.offset))
    }

    fn with_offset(&self, enc: Encoded<'_>) -> Self {
        Self {
            storage: self.storage.clone(),
            offset: enc.position(),
        }
    }

    pub(crate) fn raw_kind(&self) -> RawKind {
        self.encoded().map_or(RawKind::Null, Encoded::raw_kind)
    }

    /// The kind of this value.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.raw_kind().simplify()
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
        let enc = self
            .encoded()
            .ok_or_else(|| ValueError::of(ErrorCode::NotSized))?;
        match enc.raw_kind().simplify() {
            Kind::Object | Kind::Array => Ok(enc.count()),
            Kind::String => Ok(enc.as_str().map_or(0, str::len)),
            _ => Err(ValueError::of(ErrorCode::NotSized)),
        }
    }

    /// Returns `size() == 0`.
    ///
    /// # Errors
    ///
    /// Returns `NotSized` for numbers, booleans and null.
    pub fn is_empty(&self) -> Result<bool, ValueError> {
        self.size().map(|n| n == 0)
    }

    pub(crate) fn child_at(&self, idx: usize) -> Option<Self> {
        let child = self.encoded()?.child(idx)?;
        Some(self.with_offset(child))
    }

    pub(crate) fn key_at(&self, idx: usize) -> Option<&str> {
        self.encoded()?.key(idx)
    }

    pub(crate) fn find(&self, key: &str) -> Option<Self> {
        let child = self.encoded()?.find(key)?;
        Some(self.with_offset(child))
    }

    fn lookup(&self, sel: PathElem<'_>) -> Result<Option<Self>, ValueError> {
        match (sel, self.kind()) {
            (PathElem::Key(k), Kind::Object) => Ok(self.find(k)),
            (PathElem::Index(i), Kind::Array) => Ok(self.child_at(i)),
            (PathElem::Key(_), _) => Err(ValueError::of(ErrorCode::ExpectedObject)),
            (PathElem::Index(_), _) => Err(ValueError::of(ErrorCode::ExpectedArray)),
        }
    }

    /// The child selected by `sel`, or null when the key or index is absent.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject`/`ExpectedArray` when the selector does not fit this value's kind.
    pub fn get<'p>(&self, sel: impl Into<PathElem<'p>>) -> Result<Self, ValueError> {
        Ok(self.lookup(sel.into())?.unwrap_or_default())
    }

    /// The child selected by `sel`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound`/`IndexOutOfBounds` when absent, and a type error when the selector
    /// does not fit this value's kind.
    pub fn at<'p>(&self, sel: impl Into<PathElem<'p>>) -> Result<Self, ValueError> {
        let sel = sel.into();
        self.lookup(sel)?.ok_or_else(|| missing(sel))
    }

    /// Follow `path`; null as soon as a step is absent.
    ///
    /// # Errors
    ///
    /// Returns a type error when a step does not fit the kind of the value it is applied to.
    pub fn get_path(&self, path: &[PathElem<'_>]) -> Result<Self, ValueError> {
        let mut cur = self.clone();
        for &step in path {
            match cur.lookup(step)? {
                Some(next) => cur = next,
                None => return Ok(Self::make_null()),
            }
        }
        Ok(cur)
    }

    /// Follow `path`, failing on the first absent step.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound`/`IndexOutOfBounds` for absent steps and type errors for mismatched
    /// ones.
    pub fn at_path(&self, path: &[PathElem<'_>]) -> Result<Self, ValueError> {
        let mut cur = self.clone();
        for &step in path {
            cur = cur.lookup(step)?.ok_or_else(|| missing(step))?;
        }
        Ok(cur)
    }

    /// Returns true iff this object holds `key`.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn contains_key(&self, key: &str) -> Result<bool, ValueError> {
        self.lookup(PathElem::Key(key)).map(|v| v.is_some())
    }

    /// Borrow the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.encoded()?.as_str()
    }

    /// The integer payload.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.encoded()?.as_i64()
    }

    /// The decimal payload.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.encoded()?.as_f64()
    }

    /// The boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.encoded()?.as_bool()
    }

    /// The string payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedString` for other kinds.
    pub fn str(&self) -> Result<&str, ValueError> {
        self.as_str()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedString))
    }

    /// The integer payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedInteger` for other kinds.
    pub fn integer(&self) -> Result<i64, ValueError> {
        self.as_i64()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedInteger))
    }

    /// The decimal payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedDecimal` for other kinds.
    pub fn decimal(&self) -> Result<f64, ValueError> {
        self.as_f64()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedDecimal))
    }

    /// Integer or decimal payload as `f64`.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedNumeric` for other kinds.
    #[allow(clippy::cast_precision_loss)]
    pub fn numeric(&self) -> Result<f64, ValueError> {
        if let Some(i) = self.as_i64() {
            return Ok(i as f64);
        }
        self.as_f64()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedNumeric))
    }

    /// The boolean payload.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedBoolean` for other kinds.
    pub fn boolean(&self) -> Result<bool, ValueError> {
        self.as_bool()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedBoolean))
    }

    /// Iterate the values of an object (insertion order) or the elements of an array.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates.
    pub fn values(&self) -> Result<BufferValues<'_, R>, ValueError> {
        if !self.is_aggregate() {
            return Err(ValueError::of(ErrorCode::ExpectedAggregate));
        }
        Ok(BufferValues::new(self))
    }

    /// Iterate the keys of an object in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn keys(&self) -> Result<BufferKeys<'_>, ValueError> {
        if !self.is_object() {
            return Err(ValueError::of(ErrorCode::ExpectedObject));
        }
        Ok(BufferKeys::new(self.encoded()))
    }

    /// Iterate the `(key, value)` pairs of an object in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn entries(&self) -> Result<BufferEntries<'_, R>, ValueError> {
        if !self.is_object() {
            return Err(ValueError::of(ErrorCode::ExpectedObject));
        }
        Ok(BufferEntries::new(self))
    }

    fn aggregate_range(&self) -> Result<(usize, usize), ValueError> {
        match self.encoded() {
            Some(enc) if enc.raw_kind().is_aggregate() => {
                Ok((self.offset, self.offset + enc.encoded_len()))
            }
            _ => Err(ValueError::of(ErrorCode::ExpectedAggregate)),
        }
    }

    /// Borrow the encoded bytes of this aggregate. The range is itself a valid buffer.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates.
    pub fn get_bytes(&self) -> Result<&[u8], ValueError> {
        let (start, end) = self.aggregate_range()?;
        self.storage
            .as_deref()
            .and_then(|data| data.get(start..end))
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedAggregate))
    }

    /// Another owning handle to the encoded bytes of this aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates.
    pub fn share_bytes(&self) -> Result<SharedBytes<R>, ValueError> {
        let (start, end) = self.aggregate_range()?;
        let storage = self
            .storage
            .clone()
            .ok_or_else(|| ValueError::of(ErrorCode::ExpectedAggregate))?;
        Ok(SharedBytes {
            storage,
            start,
            end,
        })
    }

    /// Copy the encoded bytes of this aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates, or `AllocationFailed`.
    pub fn dup_bytes(&self) -> Result<Vec<u8>, ValueError> {
        try_vec_from_slice(self.get_bytes()?, 0)
    }

    /// Rebuild a tree under any owning policy.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the tree cannot be allocated.
    pub fn lift_into<R2: OwningRefCount>(&self) -> Result<Heap<R2>, ValueError> {
        match self.encoded() {
            Some(enc) => crate::decode::lift(enc),
            None => Ok(Heap::make_null()),
        }
    }

    /// Copy the encoded bytes of this aggregate into storage owned by another policy.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates, or `AllocationFailed`.
    pub fn transmogrify<R2: OwningRefCount>(&self) -> Result<Buffer<R2>, ValueError> {
        let bytes = self.dup_bytes()?;
        trace!("transmogrify {} bytes to {:?}", bytes.len(), R2::KIND);
        Ok(Buffer::from_trusted(R2::allocate_bytes(bytes)))
    }

    /// Borrow this buffer without touching the reference count.
    #[must_use]
    pub fn view(&self) -> Buffer<View<'_>> {
        Buffer {
            storage: self.storage.as_deref(),
            offset: self.offset,
        }
    }

    /// Number of owning handles to the storage; 0 for views and for null.
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.storage.as_ref().map_or(0, R::use_count)
    }

    /// Returns true iff both handles denote the same value in the same storage.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (&self.storage, &other.storage) {
            (Some(a), Some(b)) => R::same_storage(a, b) && self.offset == other.offset,
            (None, None) => true,
            _ => false,
        }
    }

    /// Encoded bytes of any value, including scalars. Empty for null.
    pub(crate) fn value_bytes(&self) -> &[u8] {
        self.encoded().map(Encoded::bytes).unwrap_or_default()
    }

    /// SHA-256 digest of the encoded bytes of this aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates.
    #[cfg(feature = "sha2")]
    #[cfg_attr(docsrs, doc(cfg(feature = "sha2")))]
    pub fn sha256(&self) -> Result<[u8; 32], ValueError> {
        use sha2::{Digest, Sha256};
        let mut h = Sha256::new();
        h.update(self.get_bytes()?);
        let out = h.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(out.as_slice());
        Ok(digest)
    }
}

fn missing(sel: PathElem<'_>) -> ValueError {
    match sel {
        PathElem::Key(_) => ValueError::of(ErrorCode::KeyNotFound),
        PathElem::Index(_) => ValueError::of(ErrorCode::IndexOutOfBounds),
    }
}

impl<R: RefCount> fmt::Debug for Buffer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Kind::Object => f.debug_map().entries(BufferEntries::new(self)).finish(),
            Kind::Array => f.debug_list().entries(BufferValues::new(self)).finish(),
            Kind::String => write!(f, "{:?}", self.as_str().unwrap_or_default()),
            Kind::Integer => write!(f, "{}", self.as_i64().unwrap_or_default()),
            Kind::Decimal => write!(f, "{:?}", self.as_f64().unwrap_or_default()),
            Kind::Boolean => write!(f, "{}", self.as_bool().unwrap_or_default()),
            Kind::Null => f.write_str("null"),
        }
    }
}

/// An owning handle to the encoded bytes of a buffer aggregate.
///
/// Holding it keeps the storage alive after every `Buffer` sharing it is dropped.
pub struct SharedBytes<R: RefCount = Safe> {
    storage: R::Bytes,
    start: usize,
    end: usize,
}

impl<R: RefCount> SharedBytes<R> {
    /// Number of owning handles to the underlying storage.
    #[must_use]
    pub fn use_count(&self) -> usize {
        R::use_count(&self.storage)
    }
}

impl<R: RefCount> Clone for SharedBytes<R> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

impl<R: RefCount> Deref for SharedBytes<R> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.storage.get(self.start..self.end).unwrap_or_default()
    }
}

impl<R: RefCount> AsRef<[u8]> for SharedBytes<R> {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl<R: RefCount> fmt::Debug for SharedBytes<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBytes")
            .field("len", &self.len())
            .field("use_count", &self.use_count())
            .finish()
    }
}
