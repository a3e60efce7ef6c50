//! Iterators over aggregates.
//!
//! Every iterator is double-ended and knows its exact length, so reverse iteration is just
//! `.rev()`.

use core::iter::FusedIterator;

use crate::heap::Heap;
use crate::refcount::{OwningRefCount, RefCount};
use crate::wire::Encoded;
use crate::{Buffer, Packet};

#[derive(Debug)]
enum ValuesInner<'a, R: OwningRefCount> {
    Object(indexmap::map::Values<'a, String, Heap<R>>),
    Array(core::slice::Iter<'a, Heap<R>>),
}

/// Values of a tree object or elements of a tree array.
#[derive(Debug)]
pub struct Values<'a, R: OwningRefCount> {
    inner: ValuesInner<'a, R>,
}

impl<'a, R: OwningRefCount> Values<'a, R> {
    pub(crate) const fn object(inner: indexmap::map::Values<'a, String, Heap<R>>) -> Self {
        Self {
            inner: ValuesInner::Object(inner),
        }
    }

    pub(crate) const fn array(inner: core::slice::Iter<'a, Heap<R>>) -> Self {
        Self {
            inner: ValuesInner::Array(inner),
        }
    }
}

impl<'a, R: OwningRefCount> Iterator for Values<'a, R> {
    type Item = &'a Heap<R>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ValuesInner::Object(it) => it.next(),
            ValuesInner::Array(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            ValuesInner::Object(it) => it.size_hint(),
            ValuesInner::Array(it) => it.size_hint(),
        }
    }
}

impl<R: OwningRefCount> DoubleEndedIterator for Values<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ValuesInner::Object(it) => it.next_back(),
            ValuesInner::Array(it) => it.next_back(),
        }
    }
}

impl<R: OwningRefCount> ExactSizeIterator for Values<'_, R> {}
impl<R: OwningRefCount> FusedIterator for Values<'_, R> {}

/// Keys of a tree object in insertion order.
#[derive(Debug)]
pub struct Keys<'a, R: OwningRefCount> {
    inner: indexmap::map::Keys<'a, String, Heap<R>>,
}

impl<'a, R: OwningRefCount> Keys<'a, R> {
    pub(crate) const fn new(inner: indexmap::map::Keys<'a, String, Heap<R>>) -> Self {
        Self { inner }
    }
}

impl<'a, R: OwningRefCount> Iterator for Keys<'a, R> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(String::as_str)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<R: OwningRefCount> DoubleEndedIterator for Keys<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(String::as_str)
    }
}

impl<R: OwningRefCount> ExactSizeIterator for Keys<'_, R> {}
impl<R: OwningRefCount> FusedIterator for Keys<'_, R> {}

/// `(key, value)` pairs of a tree object in insertion order.
#[derive(Debug)]
pub struct Entries<'a, R: OwningRefCount> {
    inner: indexmap::map::Iter<'a, String, Heap<R>>,
}

impl<'a, R: OwningRefCount> Entries<'a, R> {
    pub(crate) const fn new(inner: indexmap::map::Iter<'a, String, Heap<R>>) -> Self {
        Self { inner }
    }
}

impl<'a, R: OwningRefCount> Iterator for Entries<'a, R> {
    type Item = (&'a str, &'a Heap<R>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<R: OwningRefCount> DoubleEndedIterator for Entries<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k.as_str(), v))
    }
}

impl<R: OwningRefCount> ExactSizeIterator for Entries<'_, R> {}
impl<R: OwningRefCount> FusedIterator for Entries<'_, R> {}

/// Children of a buffer aggregate, in table order (insertion order for objects).
///
/// Each item shares the parent's storage.
#[derive(Debug)]
pub struct BufferValues<'a, R: RefCount> {
    parent: &'a Buffer<R>,
    front: usize,
    back: usize,
}

impl<'a, R: RefCount> BufferValues<'a, R> {
    pub(crate) fn new(parent: &'a Buffer<R>) -> Self {
        let back = parent.encoded().map_or(0, Encoded::count);
        Self {
            parent,
            front: 0,
            back,
        }
    }
}

impl<R: RefCount> Iterator for BufferValues<'_, R> {
    type Item = Buffer<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let idx = self.front;
        self.front += 1;
        self.parent.child_at(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<R: RefCount> DoubleEndedIterator for BufferValues<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.parent.child_at(self.back)
    }
}

impl<R: RefCount> ExactSizeIterator for BufferValues<'_, R> {}
impl<R: RefCount> FusedIterator for BufferValues<'_, R> {}

/// Keys of a buffer object in insertion order, borrowed from its storage.
#[derive(Debug)]
pub struct BufferKeys<'a> {
    obj: Option<Encoded<'a>>,
    front: usize,
    back: usize,
}

impl<'a> BufferKeys<'a> {
    pub(crate) fn new(obj: Option<Encoded<'a>>) -> Self {
        let back = obj.map_or(0, Encoded::count);
        Self {
            obj,
            front: 0,
            back,
        }
    }
}

impl<'a> Iterator for BufferKeys<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let idx = self.front;
        self.front += 1;
        self.obj?.key(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for BufferKeys<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.obj?.key(self.back)
    }
}

impl ExactSizeIterator for BufferKeys<'_> {}
impl FusedIterator for BufferKeys<'_> {}

/// `(key, value)` pairs of a buffer object in insertion order.
#[derive(Debug)]
pub struct BufferEntries<'a, R: RefCount> {
    keys: BufferKeys<'a>,
    values: BufferValues<'a, R>,
}

impl<'a, R: RefCount> BufferEntries<'a, R> {
    pub(crate) fn new(parent: &'a Buffer<R>) -> Self {
        Self {
            keys: BufferKeys::new(parent.encoded()),
            values: BufferValues::new(parent),
        }
    }
}

impl<'a, R: RefCount> Iterator for BufferEntries<'a, R> {
    type Item = (&'a str, Buffer<R>);

    fn next(&mut self) -> Option<Self::Item> {
        Some((self.keys.next()?, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<R: RefCount> DoubleEndedIterator for BufferEntries<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        Some((self.keys.next_back()?, self.values.next_back()?))
    }
}

impl<R: RefCount> ExactSizeIterator for BufferEntries<'_, R> {}
impl<R: RefCount> FusedIterator for BufferEntries<'_, R> {}

/// Children of a packet aggregate, each wrapped in the packet's current representation.
#[derive(Debug)]
pub enum PacketValues<'a, R: OwningRefCount> {
    /// Tree-backed children.
    Heap(Values<'a, R>),
    /// Buffer-backed children.
    Buffer(BufferValues<'a, R>),
}

impl<R: OwningRefCount> Iterator for PacketValues<'_, R> {
    type Item = Packet<R>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Heap(it) => it.next().cloned().map(Packet::Heap),
            Self::Buffer(it) => it.next().map(Packet::Buffer),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Heap(it) => it.size_hint(),
            Self::Buffer(it) => it.size_hint(),
        }
    }
}

impl<R: OwningRefCount> DoubleEndedIterator for PacketValues<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Self::Heap(it) => it.next_back().cloned().map(Packet::Heap),
            Self::Buffer(it) => it.next_back().map(Packet::Buffer),
        }
    }
}

impl<R: OwningRefCount> ExactSizeIterator for PacketValues<'_, R> {}
impl<R: OwningRefCount> FusedIterator for PacketValues<'_, R> {}

/// Keys of a packet object, in insertion order in either representation.
#[derive(Debug)]
pub enum PacketKeys<'a, R: OwningRefCount> {
    /// Tree-backed keys.
    Heap(Keys<'a, R>),
    /// Buffer-backed keys.
    Buffer(BufferKeys<'a>),
}

impl<'a, R: OwningRefCount> Iterator for PacketKeys<'a, R> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Heap(it) => it.next(),
            Self::Buffer(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Heap(it) => it.size_hint(),
            Self::Buffer(it) => it.size_hint(),
        }
    }
}

impl<R: OwningRefCount> DoubleEndedIterator for PacketKeys<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Self::Heap(it) => it.next_back(),
            Self::Buffer(it) => it.next_back(),
        }
    }
}

impl<R: OwningRefCount> ExactSizeIterator for PacketKeys<'_, R> {}
impl<R: OwningRefCount> FusedIterator for PacketKeys<'_, R> {}

/// `(key, value)` pairs of a packet object.
#[derive(Debug)]
pub enum PacketEntries<'a, R: OwningRefCount> {
    /// Tree-backed pairs.
    Heap(Entries<'a, R>),
    /// Buffer-backed pairs.
    Buffer(BufferEntries<'a, R>),
}

impl<'a, R: OwningRefCount> Iterator for PacketEntries<'a, R> {
    type Item = (&'a str, Packet<R>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Heap(it) => it.next().map(|(k, v)| (k, Packet::Heap(v.clone()))),
            Self::Buffer(it) => it.next().map(|(k, v)| (k, Packet::Buffer(v))),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Heap(it) => it.size_hint(),
            Self::Buffer(it) => it.size_hint(),
        }
    }
}

impl<R: OwningRefCount> DoubleEndedIterator for PacketEntries<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Self::Heap(it) => it.next_back().map(|(k, v)| (k, Packet::Heap(v.clone()))),
            Self::Buffer(it) => it.next_back().map(|(k, v)| (k, Packet::Buffer(v))),
        }
    }
}

impl<R: OwningRefCount> ExactSizeIterator for PacketEntries<'_, R> {}
impl<R: OwningRefCount> FusedIterator for PacketEntries<'_, R> {}
