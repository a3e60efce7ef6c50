use core::fmt;

/// The closed taxonomy of failure classes.
///
/// Every [`ErrorCode`] belongs to exactly one kind. The C ABI maps kinds one-to-one onto its
/// integer error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation is invalid for the kind of the value (e.g. `size()` on an integer).
    Type,
    /// The operation is invalid for the current representation (e.g. `get_bytes()` on a tree).
    State,
    /// The API contract was misused (missing key in `at()`, index out of range, bad limits).
    Logic,
    /// A byte range failed buffer validation.
    Parse,
    /// Allocation or another environment failure.
    Runtime,
    /// ABI-boundary misuse: null pointers, unrecognized type tags.
    Client,
    /// Anything uncategorized.
    Unknown,
}

impl ErrorKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Type => "type error",
            Self::State => "state error",
            Self::Logic => "logic error",
            Self::Parse => "parse error",
            Self::Runtime => "runtime error",
            Self::Client => "client error",
            Self::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A structured error code identifying why an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Expected an object.
    ExpectedObject,
    /// Expected an array.
    ExpectedArray,
    /// Expected an object or an array.
    ExpectedAggregate,
    /// Expected a string.
    ExpectedString,
    /// Expected an integer.
    ExpectedInteger,
    /// Expected a decimal.
    ExpectedDecimal,
    /// Expected an integer or a decimal.
    ExpectedNumeric,
    /// Expected a boolean.
    ExpectedBoolean,
    /// Expected null.
    ExpectedNull,
    /// `size()`/`is_empty()` called on a value without a size.
    NotSized,
    /// A native integer does not fit the requested width.
    IntegerOutOfRange,

    /// The packet is not backed by a buffer.
    NotFinalized,

    /// `at()` on a missing object key.
    KeyNotFound,
    /// Index past the end of an array.
    IndexOutOfBounds,
    /// Invalid configured limits.
    InvalidLimits,

    /// Input ended before the value did.
    UnexpectedEof,
    /// Bytes remain after the root value.
    TrailingBytes,
    /// Input exceeds `max_input_bytes`.
    InputTooLarge,
    /// The root value is not an object or array.
    RootNotAggregate,
    /// The byte does not name a known type tag.
    UnknownTypeTag,
    /// Aggregate header is malformed (non-zero reserved bytes, length smaller than its table).
    MalformedHeader,
    /// Declared aggregate length exceeds the enclosing range.
    AggregateLengthOverflow,
    /// Aggregate element count exceeds `max_container_len`.
    ContainerLenLimitExceeded,
    /// A table offset points outside its aggregate.
    OffsetOutOfRange,
    /// A table offset does not increase past the previous child.
    NonMonotonicOffset,
    /// Bytes between two children are not covered by any child.
    UnreachableBytes,
    /// An object key is not a string.
    ObjectKeyNotString,
    /// An object's key index is not in canonical key order.
    NonCanonicalKeyOrder,
    /// The same object key appears twice.
    DuplicateKey,
    /// An object's key index names an entry past its element count.
    InvalidKeyIndex,
    /// A string payload is not UTF-8.
    Utf8Invalid,
    /// A boolean payload is neither 0 nor 1.
    InvalidBoolean,
    /// A long string encodes a payload that fits the short form.
    NonCanonicalString,
    /// A long integer encodes a value that fits the short form.
    NonCanonicalInteger,
    /// Nesting depth exceeds `max_depth`.
    DepthLimitExceeded,

    /// Memory allocation failed.
    AllocationFailed,
    /// A length or offset does not fit the format's 32-bit fields.
    LengthOverflow,

    /// A required pointer argument was null.
    NullPointer,
    /// An ABI handle carries an unrecognized representation or ownership tag.
    UnknownTypeId,
    /// An ABI handle carries a tag for a different representation than the call expects.
    RepresentationMismatch,

    /// An uncategorized failure (e.g. a caught panic).
    Unknown,
}

impl ErrorCode {
    /// The taxonomy class of this code.
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::ExpectedObject
            | Self::ExpectedArray
            | Self::ExpectedAggregate
            | Self::ExpectedString
            | Self::ExpectedInteger
            | Self::ExpectedDecimal
            | Self::ExpectedNumeric
            | Self::ExpectedBoolean
            | Self::ExpectedNull
            | Self::NotSized
            | Self::IntegerOutOfRange => ErrorKind::Type,

            Self::NotFinalized => ErrorKind::State,

            Self::KeyNotFound | Self::IndexOutOfBounds | Self::InvalidLimits => ErrorKind::Logic,

            Self::UnexpectedEof
            | Self::TrailingBytes
            | Self::InputTooLarge
            | Self::RootNotAggregate
            | Self::UnknownTypeTag
            | Self::MalformedHeader
            | Self::AggregateLengthOverflow
            | Self::ContainerLenLimitExceeded
            | Self::OffsetOutOfRange
            | Self::NonMonotonicOffset
            | Self::UnreachableBytes
            | Self::ObjectKeyNotString
            | Self::NonCanonicalKeyOrder
            | Self::DuplicateKey
            | Self::InvalidKeyIndex
            | Self::Utf8Invalid
            | Self::InvalidBoolean
            | Self::NonCanonicalString
            | Self::NonCanonicalInteger
            | Self::DepthLimitExceeded => ErrorKind::Parse,

            Self::AllocationFailed | Self::LengthOverflow => ErrorKind::Runtime,

            Self::NullPointer | Self::UnknownTypeId | Self::RepresentationMismatch => {
                ErrorKind::Client
            }

            Self::Unknown => ErrorKind::Unknown,
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::ExpectedObject => "expected an object",
            Self::ExpectedArray => "expected an array",
            Self::ExpectedAggregate => "expected an object or array",
            Self::ExpectedString => "expected a string",
            Self::ExpectedInteger => "expected an integer",
            Self::ExpectedDecimal => "expected a decimal",
            Self::ExpectedNumeric => "expected an integer or decimal",
            Self::ExpectedBoolean => "expected a boolean",
            Self::ExpectedNull => "expected null",
            Self::NotSized => "value has no size",
            Self::IntegerOutOfRange => "integer out of range for target type",

            Self::NotFinalized => "packet is not finalized",

            Self::KeyNotFound => "key not found",
            Self::IndexOutOfBounds => "index out of bounds",
            Self::InvalidLimits => "invalid parse limits",

            Self::UnexpectedEof => "unexpected end of input",
            Self::TrailingBytes => "trailing bytes after root value",
            Self::InputTooLarge => "input exceeds size limit",
            Self::RootNotAggregate => "root value must be an object or array",
            Self::UnknownTypeTag => "unknown type tag",
            Self::MalformedHeader => "malformed aggregate header",
            Self::AggregateLengthOverflow => "aggregate length exceeds enclosing range",
            Self::ContainerLenLimitExceeded => "aggregate element count exceeds limit",
            Self::OffsetOutOfRange => "offset outside aggregate",
            Self::NonMonotonicOffset => "offsets must be strictly increasing",
            Self::UnreachableBytes => "bytes not covered by any child",
            Self::ObjectKeyNotString => "object keys must be strings",
            Self::NonCanonicalKeyOrder => "object keys out of canonical order",
            Self::DuplicateKey => "duplicate object key",
            Self::InvalidKeyIndex => "key index out of range",
            Self::Utf8Invalid => "string is not valid UTF-8",
            Self::InvalidBoolean => "boolean must be 0 or 1",
            Self::NonCanonicalString => "long string form used for a short string",
            Self::NonCanonicalInteger => "long integer form used for a short integer",
            Self::DepthLimitExceeded => "nesting depth limit exceeded",

            Self::AllocationFailed => "allocation failed",
            Self::LengthOverflow => "length exceeds format limits",

            Self::NullPointer => "null pointer argument",
            Self::UnknownTypeId => "unrecognized type id",
            Self::RepresentationMismatch => "handle has a different representation",

            Self::Unknown => "unexpected internal failure",
        }
    }
}

/// An error with a stable code and, for parse errors, the byte offset where it was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset into the validated input (0 outside of parsing).
    pub offset: usize,
}

impl ValueError {
    /// Construct an error at `offset`.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self { code, offset }
    }

    /// Construct an error that has no meaningful offset.
    #[inline]
    #[must_use]
    pub const fn of(code: ErrorCode) -> Self {
        Self::new(code, 0)
    }

    /// The taxonomy class of this error.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        self.code.kind()
    }

    /// Returns true iff this error came from buffer validation.
    #[inline]
    #[must_use]
    pub const fn is_parse(self) -> bool {
        matches!(self.code.kind(), ErrorKind::Parse)
    }
}

impl From<ErrorCode> for ValueError {
    fn from(code: ErrorCode) -> Self {
        Self::of(code)
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        let msg = self.code.message();
        match kind {
            ErrorKind::Parse => write!(f, "{kind} at {}: {msg}", self.offset),
            _ => write!(f, "{kind}: {msg}"),
        }
    }
}

impl std::error::Error for ValueError {}
