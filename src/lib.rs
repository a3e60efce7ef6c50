//! # dualval
//!
//! Dynamically typed, JSON-like values with two interchangeable representations:
//!
//! - [`Heap`]: a mutable, reference-counted tree for building and editing values.
//! - [`Buffer`]: an immutable, contiguous, validated binary encoding for zero-copy reads and
//!   transmission.
//!
//! [`Packet`] holds either one and switches between them on demand. Every representation is
//! generic over an ownership policy: [`Safe`] (atomic, thread-shareable), [`Unsafe`]
//! (single-threaded) or, for buffers, [`View`] (a borrow of someone else's storage).
//!
//! ## Design principles
//!
//! - **Validation is the only way in.**
//!   Foreign bytes become a [`Buffer`] only after [`validate`] accepts them; every accessor after
//!   that point trusts the layout.
//! - **Copies are cheap.**
//!   Copying a tree shares its nodes; mutation copies only the node being touched. Buffer
//!   lookups return handles into the same storage.
//! - **Equality is structural.**
//!   Trees, buffers and packets compare equal across representations and policies whenever they
//!   hold the same data, and compare directly against native values (`heap == 5`).
//!
//! ## Binary format
//!
//! All integers are little-endian and every value starts with a one-byte tag. Aggregates carry a
//! 12-byte header (tag, three reserved zero bytes, `u32` total length, `u32` count) followed by
//! an offset table and the children, packed back to back. Offsets are relative to the
//! aggregate's first byte, so every nested aggregate is itself a valid buffer. Object entries keep
//! insertion order; a key index after the entry table lists them by key length, then key bytes,
//! which makes lookup a binary search.
//!
//! ## Feature flags
//!
//! - `sha2` *(default)*: SHA-256 digests of encoded bytes.
//! - `abi` *(default)*: the `dualval_*` C ABI (see `include/dualval.h`).
//! - `serde`: `Serialize` for every representation, `Deserialize` for trees and packets.
//! - `simdutf8`: SIMD-accelerated UTF-8 validation.
//! - `unsafe-utf8`: skip re-checking UTF-8 when reading strings out of validated storage.
//! - `log`: route internal trace/debug events to the `log` facade.
//!
//! ## Safety
//!
//! The crate denies `unsafe` code everywhere except the C ABI module, which needs it to read and
//! write caller-owned handles, and the `unsafe-utf8` string reader, which relies on bytes having
//! passed validation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod alloc_util;
mod buffer;
mod compare;
mod convert;
mod debug;
mod decode;
mod encode;
mod error;
mod heap;
mod iter;
mod kind;
mod limits;
mod macros;
mod packet;
mod parse;
mod path;
mod refcount;
#[cfg(feature = "serde")]
mod serde_impl;
pub(crate) mod utf8;
mod wire;

#[cfg(feature = "abi")]
#[cfg_attr(docsrs, doc(cfg(feature = "abi")))]
#[allow(unsafe_code)]
pub mod abi;

pub use crate::buffer::{Buffer, SharedBytes};
pub use crate::compare::{values_equal, ValueAccess};
pub use crate::convert::{CastValue, FromValue};
pub use crate::error::{ErrorCode, ErrorKind, ValueError};
pub use crate::heap::Heap;
pub use crate::iter::{
    BufferEntries, BufferKeys, BufferValues, Entries, Keys, PacketEntries, PacketKeys,
    PacketValues, Values,
};
pub use crate::kind::Kind;
pub use crate::limits::{ParseLimits, DEFAULT_MAX_CONTAINER_LEN, DEFAULT_MAX_DEPTH};
pub use crate::packet::Packet;
pub use crate::parse::validate;
pub use crate::path::PathElem;
pub use crate::refcount::{OwningRefCount, RcKind, RefCount, Safe, Storage, Unsafe, View};

#[doc(hidden)]
pub use crate::convert::__derive;
#[doc(hidden)]
pub use crate::macros::__value_macro;

pub use dualval_derive::{CastValue, FromValue};
