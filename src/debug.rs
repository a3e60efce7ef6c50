//! Crate-internal logging macros.
//!
//! With the `log` feature these forward to the `log` facade; without it they expand to nothing
//! and their arguments are not evaluated.

#[cfg(feature = "log")]
macro_rules! trace {
    ($($tt:tt)*) => {
        ::log::trace!(target: "dualval", $($tt)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($tt:tt)*) => {
        ::log::debug!(target: "dualval", $($tt)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($tt:tt)*) => {};
}

pub(crate) use debug;
pub(crate) use trace;
