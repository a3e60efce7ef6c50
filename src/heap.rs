use core::fmt;

use indexmap::IndexMap;

use crate::convert::CastValue;
use crate::iter::{Entries, Keys, Values};
use crate::refcount::{OwningRefCount, Safe};
use crate::{utf8, Buffer, ErrorCode, Kind, PathElem, ValueError};

pub(crate) type Object<R> = IndexMap<String, Heap<R>>;
pub(crate) type Array<R> = Vec<Heap<R>>;

const INLINE_CAP: usize = 22;

#[derive(Clone, Copy)]
pub(crate) struct InlineStr {
    len: u8,
    buf: [u8; INLINE_CAP],
}

impl InlineStr {
    fn new(s: &str) -> Option<Self> {
        if s.len() > INLINE_CAP {
            return None;
        }
        let mut buf = [0u8; INLINE_CAP];
        buf[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            len: u8::try_from(s.len()).ok()?,
            buf,
        })
    }

    fn as_str(&self) -> &str {
        utf8::trusted(&self.buf[..usize::from(self.len)]).unwrap_or_default()
    }
}

pub(crate) enum Node<R: OwningRefCount> {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    InlineStr(InlineStr),
    Str(R::Ptr<str>),
    Object(R::Ptr<Object<R>>),
    Array(R::Ptr<Array<R>>),
}

impl<R: OwningRefCount> Clone for Node<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Boolean(b) => Self::Boolean(*b),
            Self::Integer(i) => Self::Integer(*i),
            Self::Decimal(d) => Self::Decimal(*d),
            Self::InlineStr(s) => Self::InlineStr(*s),
            Self::Str(s) => Self::Str(R::share(s)),
            Self::Object(o) => Self::Object(R::share(o)),
            Self::Array(a) => Self::Array(R::share(a)),
        }
    }
}

/// A mutable, reference-counted value tree.
///
/// Copying a `Heap` is O(1): aggregates and long strings are shared through the ownership
/// policy `R`. Mutation copies only the node being touched, so other handles sharing the same
/// subtree never observe the change.
///
/// Objects iterate in insertion order; inserting an existing key replaces its value in place.
pub struct Heap<R: OwningRefCount = Safe> {
    node: Node<R>,
}

impl<R: OwningRefCount> Clone for Heap<R> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<R: OwningRefCount> Default for Heap<R> {
    fn default() -> Self {
        Self::make_null()
    }
}

impl<R: OwningRefCount> Heap<R> {
    pub(crate) const fn from_node(node: Node<R>) -> Self {
        Self { node }
    }

    pub(crate) const fn node(&self) -> &Node<R> {
        &self.node
    }

    pub(crate) fn from_object(map: Object<R>) -> Self {
        Self::from_node(Node::Object(R::allocate(map)))
    }

    pub(crate) fn from_array(items: Array<R>) -> Self {
        Self::from_node(Node::Array(R::allocate(items)))
    }

    /// An empty object.
    #[must_use]
    pub fn make_object() -> Self {
        Self::from_object(IndexMap::new())
    }

    /// An empty array.
    #[must_use]
    pub fn make_array() -> Self {
        Self::from_array(Vec::new())
    }

    /// A string.
    #[must_use]
    pub fn make_string(s: &str) -> Self {
        match InlineStr::new(s) {
            Some(inline) => Self::from_node(Node::InlineStr(inline)),
            None => Self::from_node(Node::Str(R::allocate_str(s))),
        }
    }

    /// An integer.
    #[must_use]
    pub const fn make_integer(v: i64) -> Self {
        Self::from_node(Node::Integer(v))
    }

    /// A decimal.
    #[must_use]
    pub const fn make_decimal(v: f64) -> Self {
        Self::from_node(Node::Decimal(v))
    }

    /// A boolean.
    #[must_use]
    pub const fn make_boolean(v: bool) -> Self {
        Self::from_node(Node::Boolean(v))
    }

    /// Null.
    #[must_use]
    pub const fn make_null() -> Self {
        Self::from_node(Node::Null)
    }

    /// The kind of this value.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self.node {
            Node::Null => Kind::Null,
            Node::Boolean(_) => Kind::Boolean,
            Node::Integer(_) => Kind::Integer,
            Node::Decimal(_) => Kind::Decimal,
            Node::InlineStr(_) | Node::Str(_) => Kind::String,
            Node::Object(_) => Kind::Object,
            Node::Array(_) => Kind::Array,
        }
    }

    /// Returns true iff this is an object.
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self.kind(), Kind::Object)
    }

    /// Returns true iff this is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self.kind(), Kind::Array)
    }

    /// Returns true iff this is an object or array.
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        self.kind().is_aggregate()
    }

    /// Returns true iff this is a string.
    #[must_use]
    pub const fn is_str(&self) -> bool {
        matches!(self.kind(), Kind::String)
    }

    /// Returns true iff this is an integer.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self.kind(), Kind::Integer)
    }

    /// Returns true iff this is a decimal.
    #[must_use]
    pub const fn is_decimal(&self) -> bool {
        matches!(self.kind(), Kind::Decimal)
    }

    /// Returns true iff this is an integer or decimal.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Returns true iff this is a boolean.
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(self.kind(), Kind::Boolean)
    }

    /// Returns true iff this is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.kind(), Kind::Null)
    }

    /// Element count of an aggregate, or byte length of a string.
    ///
    /// # Errors
    ///
    /// Returns `NotSized` for numbers, booleans and null.
    pub fn size(&self) -> Result<usize, ValueError> {
        match &self.node {
            Node::Object(o) => Ok(o.len()),
            Node::Array(a) => Ok(a.len()),
            Node::InlineStr(s) => Ok(s.as_str().len()),
            Node::Str(s) => Ok(s.len()),
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

    /// Borrow the child selected by `sel`, `None` when the key or index is absent.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject`/`ExpectedArray` when the selector does not fit this value's kind.
    pub fn lookup<'p>(&self, sel: impl Into<PathElem<'p>>) -> Result<Option<&Self>, ValueError> {
        match (sel.into(), &self.node) {
            (PathElem::Key(k), Node::Object(o)) => Ok(o.get(k)),
            (PathElem::Index(i), Node::Array(a)) => Ok(a.get(i)),
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
        Ok(self.lookup(sel)?.cloned().unwrap_or_default())
    }

    /// The child selected by `sel`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound`/`IndexOutOfBounds` when absent, and a type error when the selector
    /// does not fit this value's kind.
    pub fn at<'p>(&self, sel: impl Into<PathElem<'p>>) -> Result<Self, ValueError> {
        let sel = sel.into();
        self.lookup(sel)?.cloned().ok_or_else(|| missing(sel))
    }

    /// Follow `path`; null as soon as a step is absent.
    ///
    /// # Errors
    ///
    /// Returns a type error when a step does not fit the kind of the value it is applied to.
    pub fn get_path(&self, path: &[PathElem<'_>]) -> Result<Self, ValueError> {
        let mut cur = self;
        for &step in path {
            match cur.lookup(step)? {
                Some(next) => cur = next,
                None => return Ok(Self::make_null()),
            }
        }
        Ok(cur.clone())
    }

    /// Follow `path`, failing on the first absent step.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound`/`IndexOutOfBounds` for absent steps and type errors for mismatched
    /// ones.
    pub fn at_path(&self, path: &[PathElem<'_>]) -> Result<Self, ValueError> {
        let mut cur = self;
        for &step in path {
            cur = cur.lookup(step)?.ok_or_else(|| missing(step))?;
        }
        Ok(cur.clone())
    }

    /// Returns true iff this object holds `key`.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn contains_key(&self, key: &str) -> Result<bool, ValueError> {
        self.lookup(key).map(|v| v.is_some())
    }

    pub(crate) fn object_mut(&mut self) -> Result<&mut Object<R>, ValueError> {
        match &mut self.node {
            Node::Object(o) => Ok(R::make_mut(o)),
            _ => Err(ValueError::of(ErrorCode::ExpectedObject)),
        }
    }

    pub(crate) fn array_mut(&mut self) -> Result<&mut Array<R>, ValueError> {
        match &mut self.node {
            Node::Array(a) => Ok(R::make_mut(a)),
            _ => Err(ValueError::of(ErrorCode::ExpectedArray)),
        }
    }

    /// Insert into an object (upsert, keeping an existing key's position) or into an array at
    /// the given index, shifting later elements.
    ///
    /// # Errors
    ///
    /// Returns a type error for a mismatched selector, `IndexOutOfBounds` for an index past the
    /// end, or any error from converting `value`.
    pub fn insert<'p, V>(&mut self, sel: impl Into<PathElem<'p>>, value: V) -> Result<(), ValueError>
    where
        V: CastValue,
    {
        let sel = sel.into();
        let value = value.cast::<R>()?;
        match sel {
            PathElem::Key(k) => {
                let obj = self.object_mut()?;
                if let Some(slot) = obj.get_mut(k) {
                    *slot = value;
                } else {
                    obj.insert(crate::alloc_util::try_string_from_str(k)?, value);
                }
            }
            PathElem::Index(i) => {
                let arr = self.array_mut()?;
                if i > arr.len() {
                    return Err(ValueError::of(ErrorCode::IndexOutOfBounds));
                }
                arr.insert(i, value);
            }
        }
        Ok(())
    }

    /// Upsert into an object or replace an existing array element.
    ///
    /// # Errors
    ///
    /// Returns a type error for a mismatched selector, `IndexOutOfBounds` for a missing element,
    /// or any error from converting `value`.
    pub fn set<'p, V>(&mut self, sel: impl Into<PathElem<'p>>, value: V) -> Result<(), ValueError>
    where
        V: CastValue,
    {
        match sel.into() {
            PathElem::Key(k) => self.insert(k, value),
            PathElem::Index(i) => {
                let value = value.cast::<R>()?;
                let arr = self.array_mut()?;
                let slot = arr
                    .get_mut(i)
                    .ok_or_else(|| ValueError::of(ErrorCode::IndexOutOfBounds))?;
                *slot = value;
                Ok(())
            }
        }
    }

    /// Remove a key or element, returning it if it was present.
    ///
    /// Object removal preserves the order of the remaining keys.
    ///
    /// # Errors
    ///
    /// Returns a type error for a mismatched selector.
    pub fn erase<'p>(&mut self, sel: impl Into<PathElem<'p>>) -> Result<Option<Self>, ValueError> {
        match sel.into() {
            PathElem::Key(k) => {
                if !self.contains_key(k)? {
                    return Ok(None);
                }
                Ok(self.object_mut()?.shift_remove(k))
            }
            PathElem::Index(i) => {
                if !self.is_array() {
                    return Err(ValueError::of(ErrorCode::ExpectedArray));
                }
                if i >= self.size()? {
                    return Ok(None);
                }
                Ok(Some(self.array_mut()?.remove(i)))
            }
        }
    }

    /// Append to an array.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedArray` for non-arrays, or any error from converting `value`.
    pub fn push_back<V: CastValue>(&mut self, value: V) -> Result<(), ValueError> {
        let value = value.cast::<R>()?;
        self.array_mut()?.push(value);
        Ok(())
    }

    /// Prepend to an array.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedArray` for non-arrays, or any error from converting `value`.
    pub fn push_front<V: CastValue>(&mut self, value: V) -> Result<(), ValueError> {
        let value = value.cast::<R>()?;
        self.array_mut()?.insert(0, value);
        Ok(())
    }

    /// Remove the last array element.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedArray` for non-arrays.
    pub fn pop_back(&mut self) -> Result<Option<Self>, ValueError> {
        if !self.is_array() {
            return Err(ValueError::of(ErrorCode::ExpectedArray));
        }
        if self.size()? == 0 {
            return Ok(None);
        }
        Ok(self.array_mut()?.pop())
    }

    /// Remove the first array element.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedArray` for non-arrays.
    pub fn pop_front(&mut self) -> Result<Option<Self>, ValueError> {
        if !self.is_array() {
            return Err(ValueError::of(ErrorCode::ExpectedArray));
        }
        if self.size()? == 0 {
            return Ok(None);
        }
        Ok(Some(self.array_mut()?.remove(0)))
    }

    /// Remove every element of an aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` for non-aggregates.
    pub fn clear(&mut self) -> Result<(), ValueError> {
        match &mut self.node {
            Node::Object(o) => *o = R::allocate(IndexMap::new()),
            Node::Array(a) => *a = R::allocate(Vec::new()),
            _ => return Err(ValueError::of(ErrorCode::ExpectedAggregate)),
        }
        Ok(())
    }

    /// Borrow the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.node {
            Node::InlineStr(s) => Some(s.as_str()),
            Node::Str(s) => Some(&**s),
            _ => None,
        }
    }

    /// The integer payload.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self.node {
            Node::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// The decimal payload.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self.node {
            Node::Decimal(d) => Some(d),
            _ => None,
        }
    }

    /// The boolean payload.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self.node {
            Node::Boolean(b) => Some(b),
            _ => None,
        }
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
        match self.node {
            Node::Integer(i) => Ok(i as f64),
            Node::Decimal(d) => Ok(d),
            _ => Err(ValueError::of(ErrorCode::ExpectedNumeric)),
        }
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
    pub fn values(&self) -> Result<Values<'_, R>, ValueError> {
        match &self.node {
            Node::Object(o) => Ok(Values::object(o.values())),
            Node::Array(a) => Ok(Values::array(a.iter())),
            _ => Err(ValueError::of(ErrorCode::ExpectedAggregate)),
        }
    }

    /// Iterate the keys of an object in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn keys(&self) -> Result<Keys<'_, R>, ValueError> {
        match &self.node {
            Node::Object(o) => Ok(Keys::new(o.keys())),
            _ => Err(ValueError::of(ErrorCode::ExpectedObject)),
        }
    }

    /// Iterate the `(key, value)` pairs of an object in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedObject` for non-objects.
    pub fn entries(&self) -> Result<Entries<'_, R>, ValueError> {
        match &self.node {
            Node::Object(o) => Ok(Entries::new(o.iter())),
            _ => Err(ValueError::of(ErrorCode::ExpectedObject)),
        }
    }

    /// Serialize into an immutable buffer under the same policy.
    ///
    /// # Errors
    ///
    /// Returns `ExpectedAggregate` if this is not an object or array, `LengthOverflow` if the
    /// encoding exceeds the format's 32-bit limits, or `AllocationFailed`.
    pub fn finalize(&self) -> Result<Buffer<R>, ValueError> {
        let bytes = crate::encode::finalize(self)?;
        Ok(Buffer::from_trusted(R::allocate_bytes(bytes)))
    }

    /// Deep copy under another ownership policy.
    #[must_use]
    pub fn convert<R2: OwningRefCount>(&self) -> Heap<R2> {
        match &self.node {
            Node::Null => Heap::make_null(),
            Node::Boolean(b) => Heap::make_boolean(*b),
            Node::Integer(i) => Heap::make_integer(*i),
            Node::Decimal(d) => Heap::make_decimal(*d),
            Node::InlineStr(s) => Heap::from_node(Node::InlineStr(*s)),
            Node::Str(s) => Heap::from_node(Node::Str(R2::allocate_str(s))),
            Node::Object(o) => Heap::from_object(
                o.iter()
                    .map(|(k, v)| (k.clone(), v.convert::<R2>()))
                    .collect(),
            ),
            Node::Array(a) => Heap::from_array(a.iter().map(Self::convert::<R2>).collect()),
        }
    }

    /// Number of handles sharing this node's storage; 1 for unshared scalars.
    #[must_use]
    pub fn use_count(&self) -> usize {
        match &self.node {
            Node::Str(s) => R::ptr_use_count(s),
            Node::Object(o) => R::ptr_use_count(o),
            Node::Array(a) => R::ptr_use_count(a),
            _ => 1,
        }
    }

    /// Returns true iff both handles share the same aggregate or string storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.node, &other.node) {
            (Node::Str(a), Node::Str(b)) => R::ptr_eq(a, b),
            (Node::Object(a), Node::Object(b)) => R::ptr_eq(a, b),
            (Node::Array(a), Node::Array(b)) => R::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn missing(sel: PathElem<'_>) -> ValueError {
    match sel {
        PathElem::Key(_) => ValueError::of(ErrorCode::KeyNotFound),
        PathElem::Index(_) => ValueError::of(ErrorCode::IndexOutOfBounds),
    }
}

impl<R: OwningRefCount> fmt::Debug for Heap<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Null => f.write_str("null"),
            Node::Boolean(b) => write!(f, "{b}"),
            Node::Integer(i) => write!(f, "{i}"),
            Node::Decimal(d) => write!(f, "{d:?}"),
            Node::InlineStr(s) => write!(f, "{:?}", s.as_str()),
            Node::Str(s) => write!(f, "{:?}", &**s),
            Node::Object(o) => f.debug_map().entries(o.iter()).finish(),
            Node::Array(a) => f.debug_list().entries(a.iter()).finish(),
        }
    }
}
