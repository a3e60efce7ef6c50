#[cfg(feature = "simdutf8")]
use simdutf8::basic as simd_utf8;

/// Validates UTF-8 bytes and returns a borrowed `&str` on success.
#[inline]
pub fn validate(bytes: &[u8]) -> Result<&str, ()> {
    #[cfg(feature = "simdutf8")]
    {
        simd_utf8::from_utf8(bytes).map_err(|_| ())
    }

    #[cfg(not(feature = "simdutf8"))]
    {
        core::str::from_utf8(bytes).map_err(|_| ())
    }
}

/// Returns a `&str` from bytes that already passed buffer validation or came from a `&str`.
///
/// With `unsafe-utf8` this skips the check and relies on that invariant.
#[cfg(feature = "unsafe-utf8")]
#[inline]
#[allow(unsafe_code)]
#[allow(clippy::unnecessary_wraps)]
pub fn trusted(bytes: &[u8]) -> Option<&str> {
    // Safety: callers only pass validated storage or bytes copied out of a `&str`.
    Some(unsafe { core::str::from_utf8_unchecked(bytes) })
}

/// Returns a `&str` from bytes that already passed buffer validation or came from a `&str`.
///
/// A failed re-check means the storage was mutated behind the buffer's back and is reported as
/// `None`.
#[cfg(not(feature = "unsafe-utf8"))]
#[inline]
pub fn trusted(bytes: &[u8]) -> Option<&str> {
    validate(bytes).ok()
}
