/// A step into an aggregate: an object key or an array index.
///
/// Lookups accept anything convertible into a `PathElem`, so `value.get("key")` and
/// `value.get(3)` both work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathElem<'p> {
    /// Select a key from an object.
    Key(&'p str),
    /// Select an index from an array.
    Index(usize),
}

impl<'p> From<&'p str> for PathElem<'p> {
    fn from(key: &'p str) -> Self {
        Self::Key(key)
    }
}

impl<'p> From<&'p String> for PathElem<'p> {
    fn from(key: &'p String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathElem<'_> {
    fn from(idx: usize) -> Self {
        Self::Index(idx)
    }
}

/// Construct a path slice for `get_path`/`at_path`.
///
/// ```
/// use dualval::{path, PathElem};
///
/// let p: &[PathElem<'_>] = path!["users", 0, "name"];
/// assert_eq!(p[1], PathElem::Index(0));
/// ```
#[macro_export]
macro_rules! path {
    ($($seg:expr),* $(,)?) => {
        &[$($crate::__path_elem!($seg)),*]
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __path_elem {
    ($seg:expr) => {
        $crate::PathElem::from($seg)
    };
}
