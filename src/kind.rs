use core::fmt;

/// Public kind of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// String-keyed map of values.
    Object,
    /// Ordered sequence of values.
    Array,
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Decimal,
    /// Boolean.
    Boolean,
    /// Null.
    Null,
}

impl Kind {
    /// Returns true for objects and arrays.
    #[inline]
    #[must_use]
    pub const fn is_aggregate(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }

    /// Returns true for every kind that is not an aggregate.
    #[inline]
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !self.is_aggregate()
    }

    /// Returns true for integers and decimals.
    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }

    /// Lowercase name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal kind, including the encoding sub-tags that collapse to one public [`Kind`].
///
/// The discriminants are the type tags of the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum RawKind {
    Object = 0x01,
    Array = 0x02,
    SmallString = 0x03,
    String = 0x04,
    ShortInteger = 0x05,
    Integer = 0x06,
    Decimal = 0x07,
    Boolean = 0x08,
    Null = 0x09,
}

impl RawKind {
    #[inline]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x01 => Self::Object,
            0x02 => Self::Array,
            0x03 => Self::SmallString,
            0x04 => Self::String,
            0x05 => Self::ShortInteger,
            0x06 => Self::Integer,
            0x07 => Self::Decimal,
            0x08 => Self::Boolean,
            0x09 => Self::Null,
            _ => return None,
        })
    }

    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Collapse encoding sub-tags into the public kind.
    #[inline]
    pub const fn simplify(self) -> Kind {
        match self {
            Self::Object => Kind::Object,
            Self::Array => Kind::Array,
            Self::SmallString | Self::String => Kind::String,
            Self::ShortInteger | Self::Integer => Kind::Integer,
            Self::Decimal => Kind::Decimal,
            Self::Boolean => Kind::Boolean,
            Self::Null => Kind::Null,
        }
    }

    #[inline]
    pub const fn is_aggregate(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }
}

