//! Tree construction macro.
//!
//! Map key rules follow `serde_json::json!`:
//! - `{ a: 1 }` uses the literal key `"a"` (identifier stringized)
//! - `{ "a": 1 }` uses the literal string key `"a"`
//! - `{ (k): 1 }` uses the expression `k` as the key (anything `AsRef<str>`)

/// Build a [`crate::Heap`] with JSON-like literal syntax.
///
/// Returns `Result<Heap<R>, ValueError>`; the policy `R` is inferred from the binding.
///
/// Supported forms:
/// - `value!(null)`, `value!(true)`, `value!(false)`
/// - `value!([ ... ])`
/// - `value!({ key: value, "key": value, (expr_key): value, ... })`
/// - `value!(expr)` where `expr` implements [`crate::CastValue`]
///
/// ```
/// use dualval::{value, Heap, ValueError};
///
/// # fn main() -> Result<(), ValueError> {
/// let user_key = "dynamic";
/// let v: Heap = value!({
///     a: 1,
///     (user_key): [true, null, 1.5],
/// })?;
/// assert_eq!(v.at("a")?, 1);
/// # Ok(()) }
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::__value_macro::ok($crate::Heap::make_null())
    };
    (true) => {
        $crate::__value_macro::ok($crate::Heap::make_boolean(true))
    };
    (false) => {
        $crate::__value_macro::ok($crate::Heap::make_boolean(false))
    };

    ([ $($elem:tt),* $(,)? ]) => {{
        (|| {
            #[allow(unused_mut)]
            let mut arr = $crate::Heap::make_array();
            $(
                let child = $crate::value!($elem)?;
                $crate::__value_macro::push(&mut arr, child)?;
            )*
            $crate::__value_macro::ok(arr)
        })()
    }};

    ({ $($key:tt : $value:tt),* $(,)? }) => {{
        (|| {
            #[allow(unused_mut)]
            let mut obj = $crate::Heap::make_object();
            $(
                let child = $crate::value!($value)?;
                $crate::__value_macro::put(&mut obj, $crate::__value_key!($key), child)?;
            )*
            $crate::__value_macro::ok(obj)
        })()
    }};

    ($other:expr) => {{
        $crate::__value_macro::cast(&$other)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __value_key {
    ($key:ident) => {
        ::core::stringify!($key)
    };
    (($key:expr)) => {
        ::core::convert::AsRef::<str>::as_ref(&$key)
    };
    ($key:literal) => {
        $key
    };
}

#[doc(hidden)]
pub mod __value_macro {
    use crate::{CastValue, Heap, OwningRefCount, ValueError};

    #[inline]
    pub const fn ok<R: OwningRefCount>(v: Heap<R>) -> Result<Heap<R>, ValueError> {
        Ok(v)
    }

    #[inline]
    pub fn cast<R: OwningRefCount, T: CastValue + ?Sized>(v: &T) -> Result<Heap<R>, ValueError> {
        v.cast::<R>()
    }

    #[inline]
    pub fn push<R: OwningRefCount>(arr: &mut Heap<R>, child: Heap<R>) -> Result<(), ValueError> {
        arr.push_back(child)
    }

    #[inline]
    pub fn put<R: OwningRefCount>(
        obj: &mut Heap<R>,
        key: &str,
        child: Heap<R>,
    ) -> Result<(), ValueError> {
        obj.insert(key, child)
    }
}
