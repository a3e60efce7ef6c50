//! Ownership policies.
//!
//! Every representation is generic over a policy that decides how its storage is shared:
//!
//! - [`Safe`]: atomically reference counted ([`Arc`]); handles may be shared across threads.
//! - [`Unsafe`]: non-atomically reference counted ([`Rc`]); handles stay on one thread.
//! - [`View`]: a borrow of storage owned by some other handle. Views never allocate and report a
//!   use count of zero.
//!
//! Owning operations live on [`OwningRefCount`], which [`View`] does not implement, so a view can
//! never be asked to become the sole owner of anything.
//!
//! Owning policies keep buffer bytes in a [`Storage`]: the encoded `Vec<u8>` moves behind the
//! count as is, so finalizing or adopting bytes never copies them a second time.

use core::marker::PhantomData;
use core::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

mod sealed {
    pub trait Sealed {}
}

/// Runtime tag of an ownership policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RcKind {
    /// Atomic reference counting.
    Safe,
    /// Non-atomic reference counting.
    Unsafe,
    /// Non-owning borrow.
    View,
}

/// Behavior shared by all ownership policies.
pub trait RefCount: sealed::Sealed + Sized {
    /// Runtime tag of this policy.
    const KIND: RcKind;

    /// Handle to the contiguous storage behind a buffer.
    type Bytes: Clone + Deref<Target = [u8]>;

    /// Number of owning handles to `bytes`. Views report 0.
    fn use_count(bytes: &Self::Bytes) -> usize;

    /// Returns true iff both handles refer to the same allocation.
    fn same_storage(a: &Self::Bytes, b: &Self::Bytes) -> bool {
        core::ptr::eq(a.as_ptr(), b.as_ptr()) && a.len() == b.len()
    }
}

/// Policies that own their storage and can allocate.
pub trait OwningRefCount: RefCount + 'static {
    /// Shared pointer to a tree node.
    type Ptr<T: ?Sized + 'static>: Clone + Deref<Target = T>;

    /// Move `value` into a new shared allocation.
    fn allocate<T: 'static>(value: T) -> Self::Ptr<T>;

    /// Copy `s` into a new shared string allocation.
    fn allocate_str(s: &str) -> Self::Ptr<str>;

    /// Move encoded bytes into shared buffer storage without copying them.
    fn allocate_bytes(bytes: Vec<u8>) -> Self::Bytes;

    /// Another handle to the allocation behind `ptr`.
    #[inline]
    fn share<T: ?Sized + 'static>(ptr: &Self::Ptr<T>) -> Self::Ptr<T> {
        ptr.clone()
    }

    /// Number of handles sharing `ptr`.
    fn ptr_use_count<T: ?Sized + 'static>(ptr: &Self::Ptr<T>) -> usize;

    /// Mutable access to the pointee, cloning it first if it is shared.
    fn make_mut<T: Clone + 'static>(ptr: &mut Self::Ptr<T>) -> &mut T;

    /// Returns true iff both pointers refer to the same allocation.
    fn ptr_eq<T: ?Sized + 'static>(a: &Self::Ptr<T>, b: &Self::Ptr<T>) -> bool;
}

/// Shared buffer storage of an owning policy.
///
/// `P` is `Arc<Vec<u8>>` for [`Safe`] and `Rc<Vec<u8>>` for [`Unsafe`].
///
/// ```
/// use dualval::{Buffer, Heap, ParseLimits, Safe, Storage};
///
/// # fn main() -> Result<(), dualval::ValueError> {
/// let bytes = Heap::<Safe>::make_array().finalize()?.dup_bytes()?;
/// let buf = Buffer::<Safe>::from_storage(Storage::from(bytes), ParseLimits::default())?;
/// assert_eq!(buf.size()?, 0);
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage<P>(P);

impl<P: Deref<Target = Vec<u8>>> Deref for Storage<P> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl<P: From<Vec<u8>>> From<Vec<u8>> for Storage<P> {
    fn from(bytes: Vec<u8>) -> Self {
        Self(P::from(bytes))
    }
}

/// Thread-safe owning policy backed by [`Arc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Safe {}

/// Single-threaded owning policy backed by [`Rc`].
///
/// Handles using this policy are neither `Send` nor `Sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unsafe {}

/// Non-owning policy borrowing storage for `'a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct View<'a>(PhantomData<&'a [u8]>);

impl sealed::Sealed for Safe {}
impl sealed::Sealed for Unsafe {}
impl sealed::Sealed for View<'_> {}

impl RefCount for Safe {
    const KIND: RcKind = RcKind::Safe;
    type Bytes = Storage<Arc<Vec<u8>>>;

    fn use_count(bytes: &Self::Bytes) -> usize {
        Arc::strong_count(&bytes.0)
    }

    fn same_storage(a: &Self::Bytes, b: &Self::Bytes) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl OwningRefCount for Safe {
    type Ptr<T: ?Sized + 'static> = Arc<T>;

    fn allocate<T: 'static>(value: T) -> Arc<T> {
        Arc::new(value)
    }

    fn allocate_str(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    fn allocate_bytes(bytes: Vec<u8>) -> Self::Bytes {
        Storage(Arc::new(bytes))
    }

    fn ptr_use_count<T: ?Sized + 'static>(ptr: &Arc<T>) -> usize {
        Arc::strong_count(ptr)
    }

    fn make_mut<T: Clone + 'static>(ptr: &mut Arc<T>) -> &mut T {
        Arc::make_mut(ptr)
    }

    fn ptr_eq<T: ?Sized + 'static>(a: &Arc<T>, b: &Arc<T>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl RefCount for Unsafe {
    const KIND: RcKind = RcKind::Unsafe;
    type Bytes = Storage<Rc<Vec<u8>>>;

    fn use_count(bytes: &Self::Bytes) -> usize {
        Rc::strong_count(&bytes.0)
    }

    fn same_storage(a: &Self::Bytes, b: &Self::Bytes) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl OwningRefCount for Unsafe {
    type Ptr<T: ?Sized + 'static> = Rc<T>;

    fn allocate<T: 'static>(value: T) -> Rc<T> {
        Rc::new(value)
    }

    fn allocate_str(s: &str) -> Rc<str> {
        Rc::from(s)
    }

    fn allocate_bytes(bytes: Vec<u8>) -> Self::Bytes {
        Storage(Rc::new(bytes))
    }

    fn ptr_use_count<T: ?Sized + 'static>(ptr: &Rc<T>) -> usize {
        Rc::strong_count(ptr)
    }

    fn make_mut<T: Clone + 'static>(ptr: &mut Rc<T>) -> &mut T {
        Rc::make_mut(ptr)
    }

    fn ptr_eq<T: ?Sized + 'static>(a: &Rc<T>, b: &Rc<T>) -> bool {
        Rc::ptr_eq(a, b)
    }
}

impl<'a> RefCount for View<'a> {
    const KIND: RcKind = RcKind::View;
    type Bytes = &'a [u8];

    fn use_count(_bytes: &Self::Bytes) -> usize {
        0
    }
}

