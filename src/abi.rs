//! C ABI.
//!
//! Every representation is exposed through a fixed-size, caller-allocated handle whose first
//! field is a [`DualvalTypeId`] naming the representation and the ownership policy of the value
//! stored in the rest of the handle. All functions return a [`DualvalErr`]; on failure the
//! message is available from [`dualval_get_error`] until the next failing call on the same
//! thread.
//!
//! Handles must be initialized by one of the `init`/`copy`/`move` functions before use and
//! released with the matching `destroy` (or [`dualval_destroy`]). Destroying a handle poisons its
//! tag, so a second destroy reports a client error instead of freeing twice.

use core::ffi::c_void;
use core::mem::{align_of, size_of, MaybeUninit};
use core::ptr;
use std::cell::RefCell;
use std::ffi::{c_char, c_int, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::debug::debug;
use crate::refcount::{OwningRefCount, RcKind, Safe, Unsafe};
use crate::{
    values_equal, Buffer, ErrorCode, ErrorKind, Heap, Kind, Packet, ParseLimits, ValueError,
};

/// Bytes of value storage in a heap handle.
pub const DUALVAL_HEAP_MAX_SIZE: usize = 1 << 6;
/// Bytes of value storage in a buffer handle.
pub const DUALVAL_BUFFER_MAX_SIZE: usize = 1 << 5;
/// Bytes of value storage in a packet handle.
pub const DUALVAL_PACKET_MAX_SIZE: usize = DUALVAL_HEAP_MAX_SIZE;

/// Representation tag of a heap handle.
pub const DUALVAL_HEAP: u32 = 0;
/// Representation tag of a buffer handle.
pub const DUALVAL_BUFFER: u32 = 1;
/// Representation tag of a packet handle.
pub const DUALVAL_PACKET: u32 = 2;
const POISONED: u32 = u32::MAX;

/// Atomically reference counted values.
pub const DUALVAL_RC_SAFE: u32 = 0;
/// Non-atomically reference counted values.
pub const DUALVAL_RC_UNSAFE: u32 = 1;

const WORD: usize = size_of::<u64>();

const _: () = {
    assert!(size_of::<Heap<Safe>>() <= DUALVAL_HEAP_MAX_SIZE);
    assert!(size_of::<Heap<Unsafe>>() <= DUALVAL_HEAP_MAX_SIZE);
    assert!(size_of::<Buffer<Safe>>() <= DUALVAL_BUFFER_MAX_SIZE);
    assert!(size_of::<Buffer<Unsafe>>() <= DUALVAL_BUFFER_MAX_SIZE);
    assert!(size_of::<Packet<Safe>>() <= DUALVAL_PACKET_MAX_SIZE);
    assert!(size_of::<Packet<Unsafe>>() <= DUALVAL_PACKET_MAX_SIZE);
    assert!(align_of::<Heap<Safe>>() <= WORD);
    assert!(align_of::<Buffer<Safe>>() <= WORD);
    assert!(align_of::<Packet<Safe>>() <= WORD);
    assert!(align_of::<Packet<Unsafe>>() <= WORD);
};

/// Result code of every ABI call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualvalErr {
    /// Success.
    NoError = 0,
    /// A value had the wrong kind.
    TypeError,
    /// A key or index was missing, or arguments were inconsistent.
    LogicError,
    /// The operation is not valid in the value's current state.
    StateError,
    /// Foreign bytes failed validation.
    ParseError,
    /// Allocation failed or a format limit was exceeded.
    RuntimeError,
    /// The caller passed a null or uninitialized handle.
    ClientError,
    /// An unexpected failure.
    UnknownError,
}

impl From<ErrorKind> for DualvalErr {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Type => Self::TypeError,
            ErrorKind::State => Self::StateError,
            ErrorKind::Logic => Self::LogicError,
            ErrorKind::Parse => Self::ParseError,
            ErrorKind::Runtime => Self::RuntimeError,
            ErrorKind::Client => Self::ClientError,
            ErrorKind::Unknown => Self::UnknownError,
        }
    }
}

/// Public kind of a value, as reported by [`dualval_get_type`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualvalType {
    /// Object.
    Object = 0,
    /// Array.
    Array,
    /// String.
    String,
    /// Integer.
    Integer,
    /// Decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Null.
    Null,
}

impl From<Kind> for DualvalType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Object => Self::Object,
            Kind::Array => Self::Array,
            Kind::String => Self::String,
            Kind::Integer => Self::Integer,
            Kind::Decimal => Self::Decimal,
            Kind::Boolean => Self::Boolean,
            Kind::Null => Self::Null,
        }
    }
}

/// Tag stored at offset 0 of every handle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualvalTypeId {
    /// One of `DUALVAL_HEAP`, `DUALVAL_BUFFER`, `DUALVAL_PACKET`.
    pub p_id: u32,
    /// One of `DUALVAL_RC_SAFE`, `DUALVAL_RC_UNSAFE`.
    pub rc_id: u32,
}

/// Caller-allocated storage for a tree.
#[repr(C)]
pub struct DualvalHeap {
    /// Representation and policy tag.
    pub rtti: DualvalTypeId,
    bytes: [MaybeUninit<u64>; DUALVAL_HEAP_MAX_SIZE / WORD],
}

/// Caller-allocated storage for a buffer.
#[repr(C)]
pub struct DualvalBuffer {
    /// Representation and policy tag.
    pub rtti: DualvalTypeId,
    bytes: [MaybeUninit<u64>; DUALVAL_BUFFER_MAX_SIZE / WORD],
}

/// Caller-allocated storage for a packet.
#[repr(C)]
pub struct DualvalPacket {
    /// Representation and policy tag.
    pub rtti: DualvalTypeId,
    bytes: [MaybeUninit<u64>; DUALVAL_PACKET_MAX_SIZE / WORD],
}

impl DualvalHeap {
    /// An uninitialized handle, ready to be passed to an `init` function.
    #[must_use]
    pub const fn uninit() -> Self {
        Self {
            rtti: DualvalTypeId {
                p_id: POISONED,
                rc_id: POISONED,
            },
            bytes: [MaybeUninit::uninit(); DUALVAL_HEAP_MAX_SIZE / WORD],
        }
    }
}

impl DualvalBuffer {
    /// An uninitialized handle, ready to be passed to an `init` function.
    #[must_use]
    pub const fn uninit() -> Self {
        Self {
            rtti: DualvalTypeId {
                p_id: POISONED,
                rc_id: POISONED,
            },
            bytes: [MaybeUninit::uninit(); DUALVAL_BUFFER_MAX_SIZE / WORD],
        }
    }
}

impl DualvalPacket {
    /// An uninitialized handle, ready to be passed to an `init` function.
    #[must_use]
    pub const fn uninit() -> Self {
        Self {
            rtti: DualvalTypeId {
                p_id: POISONED,
                rc_id: POISONED,
            },
            bytes: [MaybeUninit::uninit(); DUALVAL_PACKET_MAX_SIZE / WORD],
        }
    }
}

/// A handle layout holding one representation under either owning policy.
trait Handle {
    const REPR: u32;
    type Of<R: OwningRefCount>: Clone + Default + 'static;

    fn rtti(&self) -> DualvalTypeId;
    fn set_rtti(&mut self, id: DualvalTypeId);
    fn slot(&self) -> *const u8;
    fn slot_mut(&mut self) -> *mut u8;
}

macro_rules! impl_handle {
    ($h:ty, $repr:expr, $of:ident) => {
        impl Handle for $h {
            const REPR: u32 = $repr;
            type Of<R: OwningRefCount> = $of<R>;

            fn rtti(&self) -> DualvalTypeId {
                self.rtti
            }

            fn set_rtti(&mut self, id: DualvalTypeId) {
                self.rtti = id;
            }

            fn slot(&self) -> *const u8 {
                self.bytes.as_ptr().cast()
            }

            fn slot_mut(&mut self) -> *mut u8 {
                self.bytes.as_mut_ptr().cast()
            }
        }
    };
}

impl_handle!(DualvalHeap, DUALVAL_HEAP, Heap);
impl_handle!(DualvalBuffer, DUALVAL_BUFFER, Buffer);
impl_handle!(DualvalPacket, DUALVAL_PACKET, Packet);

/// A borrowed value whose policy is known only at runtime.
enum Tagged<'a, H: Handle> {
    Safe(&'a H::Of<Safe>),
    Unsafe(&'a H::Of<Unsafe>),
}

enum TaggedMut<'a, H: Handle> {
    Safe(&'a mut H::Of<Safe>),
    Unsafe(&'a mut H::Of<Unsafe>),
}

macro_rules! on_rc {
    ($tagged:expr, $v:ident => $e:expr) => {
        match $tagged {
            Tagged::Safe($v) => $e,
            Tagged::Unsafe($v) => $e,
        }
    };
}

macro_rules! with_rc {
    ($rc:expr, $r:ident => $e:expr) => {
        match $rc {
            RcKind::Safe => {
                type $r = Safe;
                $e
            }
            RcKind::Unsafe => {
                type $r = Unsafe;
                $e
            }
            RcKind::View => Err(ValueError::of(ErrorCode::UnknownTypeId)),
        }
    };
}

fn rc_kind(rc_id: u32) -> Result<RcKind, ValueError> {
    match rc_id {
        DUALVAL_RC_SAFE => Ok(RcKind::Safe),
        DUALVAL_RC_UNSAFE => Ok(RcKind::Unsafe),
        _ => Err(ValueError::of(ErrorCode::UnknownTypeId)),
    }
}

const fn rc_id(kind: RcKind) -> u32 {
    match kind {
        RcKind::Safe | RcKind::View => DUALVAL_RC_SAFE,
        RcKind::Unsafe => DUALVAL_RC_UNSAFE,
    }
}

fn null() -> ValueError {
    ValueError::of(ErrorCode::NullPointer)
}

/// Write `value` into the uninitialized handle `h`.
///
/// # Safety
///
/// `h` must be null or valid for writes of `H`. Any value already in `h` is leaked.
unsafe fn emplace<H: Handle, R: OwningRefCount>(
    h: *mut H,
    value: H::Of<R>,
) -> Result<(), ValueError> {
    let h = h.as_mut().ok_or_else(null)?;
    h.slot_mut().cast::<H::Of<R>>().write(value);
    h.set_rtti(DualvalTypeId {
        p_id: H::REPR,
        rc_id: rc_id(R::KIND),
    });
    Ok(())
}

/// # Safety
///
/// `h` must be null or point to a handle of type `H` that is either initialized or tagged with
/// something other than `H::REPR`.
unsafe fn borrow<'a, H: Handle>(h: *const H) -> Result<Tagged<'a, H>, ValueError> {
    let h = h.as_ref().ok_or_else(null)?;
    let id = h.rtti();
    if id.p_id != H::REPR {
        return Err(ValueError::of(ErrorCode::RepresentationMismatch));
    }
    Ok(match rc_kind(id.rc_id)? {
        RcKind::Unsafe => Tagged::Unsafe(&*h.slot().cast::<H::Of<Unsafe>>()),
        _ => Tagged::Safe(&*h.slot().cast::<H::Of<Safe>>()),
    })
}

/// # Safety
///
/// As [`borrow`], and `h` must be valid for writes.
unsafe fn borrow_mut<'a, H: Handle>(h: *mut H) -> Result<TaggedMut<'a, H>, ValueError> {
    let h = h.as_mut().ok_or_else(null)?;
    let id = h.rtti();
    if id.p_id != H::REPR {
        return Err(ValueError::of(ErrorCode::RepresentationMismatch));
    }
    Ok(match rc_kind(id.rc_id)? {
        RcKind::Unsafe => TaggedMut::Unsafe(&mut *h.slot_mut().cast::<H::Of<Unsafe>>()),
        _ => TaggedMut::Safe(&mut *h.slot_mut().cast::<H::Of<Safe>>()),
    })
}

/// Drop the value in `h` and poison its tag.
///
/// # Safety
///
/// As [`borrow_mut`].
unsafe fn release<H: Handle>(h: *mut H) -> Result<(), ValueError> {
    match borrow_mut(h)? {
        TaggedMut::Safe(v) => ptr::drop_in_place(v),
        TaggedMut::Unsafe(v) => ptr::drop_in_place(v),
    }
    if let Some(h) = h.as_mut() {
        h.set_rtti(DualvalTypeId {
            p_id: POISONED,
            rc_id: POISONED,
        });
    }
    Ok(())
}

unsafe fn copy_into<H: Handle>(dst: *mut H, src: *const H) -> Result<(), ValueError> {
    if dst.is_null() {
        return Err(null());
    }
    match borrow(src)? {
        Tagged::Safe(v) => emplace::<H, Safe>(dst, v.clone()),
        Tagged::Unsafe(v) => emplace::<H, Unsafe>(dst, v.clone()),
    }
}

unsafe fn move_into<H: Handle>(dst: *mut H, src: *mut H) -> Result<(), ValueError> {
    if dst.is_null() {
        return Err(null());
    }
    match borrow_mut(src)? {
        TaggedMut::Safe(v) => emplace::<H, Safe>(dst, core::mem::take(v)),
        TaggedMut::Unsafe(v) => emplace::<H, Unsafe>(dst, core::mem::take(v)),
    }
}

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

fn set_error(msg: &str) {
    let msg = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = msg);
}

/// Run `f`, mapping errors and panics onto result codes.
fn guard<F>(f: F) -> DualvalErr
where
    F: FnOnce() -> Result<(), ValueError>,
{
    let result = catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(ValueError::of(ErrorCode::Unknown)));
    match result {
        Ok(()) => DualvalErr::NoError,
        Err(err) => {
            debug!("abi call failed: {}", err);
            set_error(&err.to_string());
            err.kind().into()
        }
    }
}

unsafe fn str_arg<'a>(s: *const c_char, len: usize) -> Result<&'a str, ValueError> {
    if s.is_null() {
        return Err(null());
    }
    let bytes = core::slice::from_raw_parts(s.cast::<u8>(), len);
    crate::utf8::validate(bytes).map_err(|()| ValueError::of(ErrorCode::Utf8Invalid))
}

macro_rules! lifecycle {
    (
        $h:ty, $name:literal,
        $init:ident, $init_rc:ident, $copy:ident, $mv:ident, $destroy:ident
    ) => {
        #[doc = concat!("Initialize a null ", $name, " under the safe policy.")]
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $init(pkt: *mut $h) -> DualvalErr {
            guard(|| emplace::<$h, Safe>(pkt, Default::default()))
        }

        #[doc = concat!("Initialize a null ", $name, " under the given policy.")]
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $init_rc(pkt: *mut $h, rc: u32) -> DualvalErr {
            guard(|| with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, Default::default())))
        }

        #[doc = concat!("Initialize `dst` with a shallow copy of the ", $name, " in `src`.")]
        ///
        /// # Safety
        ///
        /// `dst` must be null or valid for writes and must not hold a live value. `src` must be
        /// null or a handle previously initialized by this library.
        #[no_mangle]
        pub unsafe extern "C" fn $copy(dst: *mut $h, src: *const $h) -> DualvalErr {
            guard(|| copy_into(dst, src))
        }

        #[doc = concat!("Initialize `dst` with the ", $name, " in `src`, leaving null behind.")]
        ///
        /// # Safety
        ///
        /// As the copy function; `src` must also be valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $mv(dst: *mut $h, src: *mut $h) -> DualvalErr {
            guard(|| move_into(dst, src))
        }

        #[doc = concat!("Release the ", $name, " in `pkt`.")]
        ///
        /// # Safety
        ///
        /// `pkt` must be null or a handle previously initialized by this library.
        #[no_mangle]
        pub unsafe extern "C" fn $destroy(pkt: *mut $h) -> DualvalErr {
            guard(|| release(pkt))
        }
    };
}

lifecycle!(
    DualvalHeap,
    "heap",
    dualval_heap_init,
    dualval_heap_init_rc,
    dualval_heap_copy,
    dualval_heap_move,
    dualval_heap_destroy
);
lifecycle!(
    DualvalBuffer,
    "buffer",
    dualval_buffer_init,
    dualval_buffer_init_rc,
    dualval_buffer_copy,
    dualval_buffer_move,
    dualval_buffer_destroy
);
lifecycle!(
    DualvalPacket,
    "packet",
    dualval_packet_init,
    dualval_packet_init_rc,
    dualval_packet_copy,
    dualval_packet_move,
    dualval_packet_destroy
);

macro_rules! typed_init {
    (
        $h:ty, $of:ident,
        $obj:ident, $obj_rc:ident, $arr:ident, $arr_rc:ident,
        $str:ident, $str_rc:ident, $int:ident, $int_rc:ident,
        $dcm:ident, $dcm_rc:ident, $bool:ident, $bool_rc:ident,
        $null:ident, $null_rc:ident
    ) => {
        /// Initialize an empty object.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $obj(pkt: *mut $h) -> DualvalErr {
            $obj_rc(pkt, DUALVAL_RC_SAFE)
        }

        /// Initialize an empty object under the given policy.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $obj_rc(pkt: *mut $h, rc: u32) -> DualvalErr {
            guard(|| with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, $of::make_object())))
        }

        /// Initialize an empty array.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $arr(pkt: *mut $h) -> DualvalErr {
            $arr_rc(pkt, DUALVAL_RC_SAFE)
        }

        /// Initialize an empty array under the given policy.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $arr_rc(pkt: *mut $h, rc: u32) -> DualvalErr {
            guard(|| with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, $of::make_array())))
        }

        /// Initialize a string from `len` UTF-8 bytes at `s`.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. `s` must be null or valid for `len` reads.
        #[no_mangle]
        pub unsafe extern "C" fn $str(pkt: *mut $h, s: *const c_char, len: usize) -> DualvalErr {
            $str_rc(pkt, DUALVAL_RC_SAFE, s, len)
        }

        /// Initialize a string under the given policy.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. `s` must be null or valid for `len` reads.
        #[no_mangle]
        pub unsafe extern "C" fn $str_rc(
            pkt: *mut $h,
            rc: u32,
            s: *const c_char,
            len: usize,
        ) -> DualvalErr {
            guard(|| {
                let s = str_arg(s, len)?;
                with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, $of::make_string(s)))
            })
        }

        /// Initialize an integer.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $int(pkt: *mut $h, val: i64) -> DualvalErr {
            $int_rc(pkt, DUALVAL_RC_SAFE, val)
        }

        /// Initialize an integer under the given policy.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $int_rc(pkt: *mut $h, rc: u32, val: i64) -> DualvalErr {
            guard(|| with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, $of::make_integer(val))))
        }

        /// Initialize a decimal.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $dcm(pkt: *mut $h, val: f64) -> DualvalErr {
            $dcm_rc(pkt, DUALVAL_RC_SAFE, val)
        }

        /// Initialize a decimal under the given policy.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $dcm_rc(pkt: *mut $h, rc: u32, val: f64) -> DualvalErr {
            guard(|| with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, $of::make_decimal(val))))
        }

        /// Initialize a boolean; any non-zero `val` is true.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $bool(pkt: *mut $h, val: c_int) -> DualvalErr {
            $bool_rc(pkt, DUALVAL_RC_SAFE, val)
        }

        /// Initialize a boolean under the given policy.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $bool_rc(pkt: *mut $h, rc: u32, val: c_int) -> DualvalErr {
            guard(|| {
                with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, $of::make_boolean(val != 0)))
            })
        }

        /// Initialize null.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $null(pkt: *mut $h) -> DualvalErr {
            $null_rc(pkt, DUALVAL_RC_SAFE)
        }

        /// Initialize null under the given policy.
        ///
        /// # Safety
        ///
        /// `pkt` must be null or valid for writes. It must not hold a live value.
        #[no_mangle]
        pub unsafe extern "C" fn $null_rc(pkt: *mut $h, rc: u32) -> DualvalErr {
            guard(|| with_rc!(rc_kind(rc)?, R => emplace::<$h, R>(pkt, $of::make_null())))
        }
    };
}

typed_init!(
    DualvalHeap,
    Heap,
    dualval_heap_init_obj,
    dualval_heap_init_obj_rc,
    dualval_heap_init_arr,
    dualval_heap_init_arr_rc,
    dualval_heap_init_str,
    dualval_heap_init_str_rc,
    dualval_heap_init_int,
    dualval_heap_init_int_rc,
    dualval_heap_init_dcm,
    dualval_heap_init_dcm_rc,
    dualval_heap_init_bool,
    dualval_heap_init_bool_rc,
    dualval_heap_init_null,
    dualval_heap_init_null_rc
);

typed_init!(
    DualvalPacket,
    Packet,
    dualval_packet_init_obj,
    dualval_packet_init_obj_rc,
    dualval_packet_init_arr,
    dualval_packet_init_arr_rc,
    dualval_packet_init_str,
    dualval_packet_init_str_rc,
    dualval_packet_init_int,
    dualval_packet_init_int_rc,
    dualval_packet_init_dcm,
    dualval_packet_init_dcm_rc,
    dualval_packet_init_bool,
    dualval_packet_init_bool_rc,
    dualval_packet_init_null,
    dualval_packet_init_null_rc
);

/// Validate `len` bytes at `bytes` and initialize a buffer holding a copy of them.
///
/// # Safety
///
/// `pkt` must be null or valid for writes and must not hold a live value. `bytes` must be null or
/// valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn dualval_buffer_init_bytes(
    pkt: *mut DualvalBuffer,
    bytes: *const u8,
    len: usize,
) -> DualvalErr {
    dualval_buffer_init_bytes_rc(pkt, DUALVAL_RC_SAFE, bytes, len)
}

/// Validate foreign bytes into a buffer under the given policy.
///
/// # Safety
///
/// As [`dualval_buffer_init_bytes`].
#[no_mangle]
pub unsafe extern "C" fn dualval_buffer_init_bytes_rc(
    pkt: *mut DualvalBuffer,
    rc: u32,
    bytes: *const u8,
    len: usize,
) -> DualvalErr {
    guard(|| {
        if bytes.is_null() {
            return Err(null());
        }
        let data = core::slice::from_raw_parts(bytes, len);
        let limits = ParseLimits::default();
        with_rc!(rc_kind(rc)?, R => {
            emplace::<DualvalBuffer, R>(pkt, Buffer::<R>::from_bytes_with_limits(data, limits)?)
        })
    })
}

/// Finalize the tree in `src` into a new buffer in `dst` under the same policy.
///
/// # Safety
///
/// `dst` must be null or valid for writes and must not hold a live value. `src` must be null or
/// an initialized heap handle.
#[no_mangle]
pub unsafe extern "C" fn dualval_heap_finalize(
    dst: *mut DualvalBuffer,
    src: *const DualvalHeap,
) -> DualvalErr {
    guard(|| match borrow(src)? {
        Tagged::Safe(h) => emplace::<DualvalBuffer, Safe>(dst, h.finalize()?),
        Tagged::Unsafe(h) => emplace::<DualvalBuffer, Unsafe>(dst, h.finalize()?),
    })
}

/// Lift the buffer in `src` into a new tree in `dst` under the same policy.
///
/// # Safety
///
/// `dst` must be null or valid for writes and must not hold a live value. `src` must be null or
/// an initialized buffer handle.
#[no_mangle]
pub unsafe extern "C" fn dualval_buffer_lift(
    dst: *mut DualvalHeap,
    src: *const DualvalBuffer,
) -> DualvalErr {
    guard(|| match borrow(src)? {
        Tagged::Safe(b) => emplace::<DualvalHeap, Safe>(dst, b.lift()?),
        Tagged::Unsafe(b) => emplace::<DualvalHeap, Unsafe>(dst, b.lift()?),
    })
}

/// Switch the packet in `pkt` to its buffer representation.
///
/// # Safety
///
/// `pkt` must be null or an initialized packet handle.
#[no_mangle]
pub unsafe extern "C" fn dualval_packet_finalize(pkt: *mut DualvalPacket) -> DualvalErr {
    guard(|| match borrow_mut(pkt)? {
        TaggedMut::Safe(p) => p.finalize(),
        TaggedMut::Unsafe(p) => p.finalize(),
    })
}

/// Switch the packet in `pkt` to its tree representation.
///
/// # Safety
///
/// `pkt` must be null or an initialized packet handle.
#[no_mangle]
pub unsafe extern "C" fn dualval_packet_lift(pkt: *mut DualvalPacket) -> DualvalErr {
    guard(|| match borrow_mut(pkt)? {
        TaggedMut::Safe(p) => p.lift(),
        TaggedMut::Unsafe(p) => p.lift(),
    })
}

/// Upsert a copy of the tree in `val` under `key` in the object in `pkt`.
///
/// The value is re-homed if its policy differs from the destination's.
///
/// # Safety
///
/// `pkt` and `val` must be null or initialized heap handles. `key` must be null or valid for
/// `len` reads.
#[no_mangle]
pub unsafe extern "C" fn dualval_heap_insert(
    pkt: *mut DualvalHeap,
    key: *const c_char,
    len: usize,
    val: *const DualvalHeap,
) -> DualvalErr {
    guard(|| {
        let key = str_arg(key, len)?;
        let val = match borrow(val)? {
            Tagged::Safe(v) => v.clone(),
            Tagged::Unsafe(v) => v.convert::<Safe>(),
        };
        match borrow_mut(pkt)? {
            TaggedMut::Safe(h) => h.insert(key, val),
            TaggedMut::Unsafe(h) => h.insert(key, val),
        }
    })
}

/// Borrow the encoded bytes of the buffer in `pkt`.
///
/// The bytes stay valid until the handle is destroyed.
///
/// # Safety
///
/// `pkt` must be null or an initialized buffer handle. `out` and `out_len` must be null or valid
/// for writes.
#[no_mangle]
pub unsafe extern "C" fn dualval_buffer_get_bytes(
    pkt: *const DualvalBuffer,
    out: *mut *const u8,
    out_len: *mut usize,
) -> DualvalErr {
    guard(|| {
        let out = out.as_mut().ok_or_else(null)?;
        let out_len = out_len.as_mut().ok_or_else(null)?;
        let bytes: &[u8] = on_rc!(borrow(pkt)?, b => b.get_bytes()?);
        *out = bytes.as_ptr();
        *out_len = bytes.len();
        Ok(())
    })
}

/// Any handle, dispatched on its tag.
enum AnyRef<'a> {
    Heap(Tagged<'a, DualvalHeap>),
    Buffer(Tagged<'a, DualvalBuffer>),
    Packet(Tagged<'a, DualvalPacket>),
}

macro_rules! on_any {
    ($any:expr, $v:ident => $e:expr) => {
        match $any {
            AnyRef::Heap(t) => on_rc!(t, $v => $e),
            AnyRef::Buffer(t) => on_rc!(t, $v => $e),
            AnyRef::Packet(t) => on_rc!(t, $v => $e),
        }
    };
}

unsafe fn any_ref<'a>(pkt: *const c_void) -> Result<AnyRef<'a>, ValueError> {
    let id = pkt.cast::<DualvalTypeId>().as_ref().ok_or_else(null)?;
    Ok(match id.p_id {
        DUALVAL_HEAP => AnyRef::Heap(borrow(pkt.cast())?),
        DUALVAL_BUFFER => AnyRef::Buffer(borrow(pkt.cast())?),
        DUALVAL_PACKET => AnyRef::Packet(borrow(pkt.cast())?),
        _ => return Err(ValueError::of(ErrorCode::UnknownTypeId)),
    })
}

/// Element count of an aggregate, or byte length of a string, in any handle.
///
/// # Safety
///
/// `pkt` must be null or an initialized handle of any representation. `out` must be null or
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn dualval_size(pkt: *const c_void, out: *mut usize) -> DualvalErr {
    guard(|| {
        let out = out.as_mut().ok_or_else(null)?;
        *out = on_any!(any_ref(pkt)?, v => v.size()?);
        Ok(())
    })
}

/// Kind of the value in any handle.
///
/// # Safety
///
/// `pkt` must be null or an initialized handle of any representation. `out` must be null or
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn dualval_get_type(
    pkt: *const c_void,
    out: *mut DualvalType,
) -> DualvalErr {
    guard(|| {
        let out = out.as_mut().ok_or_else(null)?;
        *out = on_any!(any_ref(pkt)?, v => v.kind()).into();
        Ok(())
    })
}

/// Structural equality of the values in any two handles.
///
/// # Safety
///
/// `lhs` and `rhs` must be null or initialized handles of any representation. `out` must be null
/// or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn dualval_equal(
    lhs: *const c_void,
    rhs: *const c_void,
    out: *mut c_int,
) -> DualvalErr {
    guard(|| {
        let out = out.as_mut().ok_or_else(null)?;
        let (a, b) = (any_ref(lhs)?, any_ref(rhs)?);
        let eq = on_any!(a, x => on_any!(b, y => values_equal(x, y)));
        *out = c_int::from(eq);
        Ok(())
    })
}

/// Release any handle, dispatched on its tag.
///
/// # Safety
///
/// `pkt` must be null or a handle previously initialized by this library.
#[no_mangle]
pub unsafe extern "C" fn dualval_destroy(pkt: *mut c_void) -> DualvalErr {
    guard(|| {
        let id = pkt.cast::<DualvalTypeId>().as_ref().ok_or_else(null)?;
        match id.p_id {
            DUALVAL_HEAP => release::<DualvalHeap>(pkt.cast()),
            DUALVAL_BUFFER => release::<DualvalBuffer>(pkt.cast()),
            DUALVAL_PACKET => release::<DualvalPacket>(pkt.cast()),
            _ => Err(ValueError::of(ErrorCode::UnknownTypeId)),
        }
    })
}

/// Message of the last failed call on this thread, or an empty string.
///
/// The pointer stays valid until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn dualval_get_error() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ptr())
}
