//! # Ring Buffer Implementation
//!
//! Fixed-capacity circular byte buffers used for every byte that crosses the
//! serial link: the receive backlog, the frame scratch area and any buffer the
//! application wants to search for frames.
//!
//! ## Design Principles
//!
//! 1. **Caller-Provided Storage**: a [`RingBuffer`] never allocates. It wraps
//!    any `AsRef<[u8]> + AsMut<[u8]>` storage, either a borrowed slice or an
//!    owned array, and never resizes it.
//!
//! 2. **Virtual Indices**: operations address bytes by their logical position
//!    from the head (virtual index). The physical slot is
//!    `(start_index + virtual) % capacity`.
//!
//! 3. **Borrowed Views**: a [`RingView`] aliases the storage of the buffer it
//!    was taken from. The borrow checker keeps the source from being mutated
//!    while a view is alive.
//!
//! 4. **No Panics on Bad Input**: empty inputs, zero capacity and offsets past
//!    the valid range are no-ops that report `0`.
//!
//! ## Memory Layout
//!
//! ```text
//!        physical slot:  0    1    2    3    4    5    6    7
//!                      ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!                      │ v5 │ v6 │    │    │ v0 │ v1 │ v2 │ v3 │ ...
//!                      └────┴────┴────┴────┴────┴────┴────┴────┘
//!                                 ▲         ▲
//!                               free    start_index (virtual index 0 = head)
//! ```
//!
//! ## Ends
//!
//! Operations take an [`End`]. Element `i` of the caller's slice maps to the
//! `i`-th position counted from that end, so pushing `[a, b, c]` at the head
//! leaves `c` at the head, and reading from the tail yields the newest byte
//! first.

/// End of a buffer an operation counts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum End {
    /// Oldest byte, virtual index 0
    Head,
    /// Newest byte, virtual index `len - 1`
    Tail,
}

/// Direction of a logical rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    /// The byte at virtual index `k` becomes the head
    Left,
    /// The byte at virtual index `len - k` becomes the head
    Right,
}

/// A slice view into the buffer for zero-copy access
#[derive(Debug, Clone, Copy)]
pub struct BufferSlice<'a> {
    /// First contiguous chunk (before wrap-around)
    pub first: &'a [u8],
    /// Second contiguous chunk (after wrap-around, may be empty)
    pub second: &'a [u8],
}

impl<'a> BufferSlice<'a> {
    /// Total length across both chunks
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// Check if the slice is empty
    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }

    /// Iterate over both chunks in head-to-tail order
    pub fn iter(&self) -> impl Iterator<Item = u8> + 'a {
        let (first, second) = (self.first, self.second);
        first.iter().chain(second.iter()).copied()
    }
}

/// Read access shared by [`RingBuffer`] and [`RingView`]
///
/// Implementors provide the raw storage, the physical index of the head and
/// the number of valid bytes. Everything else is derived from those.
pub trait ByteRing {
    /// The complete backing storage, valid or not
    fn storage(&self) -> &[u8];

    /// Physical slot holding virtual index 0
    fn start_index(&self) -> usize;

    /// Number of valid bytes
    fn len(&self) -> usize;

    /// Drop up to `len` bytes from one end without touching storage
    ///
    /// Returns the number of bytes dropped.
    fn discard(&mut self, len: usize, end: End) -> usize;

    /// Total number of slots
    #[inline]
    fn capacity(&self) -> usize {
        self.storage().len()
    }

    /// Check if the buffer holds no valid byte
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if every slot holds a valid byte
    #[inline]
    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Map a virtual index to its physical slot
    #[inline]
    fn physical_index(&self, virtual_index: usize) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return virtual_index;
        }
        let index = self.start_index() + virtual_index % capacity;
        if index >= capacity {
            index - capacity
        } else {
            index
        }
    }

    /// Read a single byte `offset` positions away from `end`
    fn byte_at(&self, offset: usize, end: End) -> Option<u8> {
        let len = self.len();
        if offset >= len {
            return None;
        }
        let virtual_index = match end {
            End::Head => offset,
            End::Tail => len - 1 - offset,
        };
        Some(self.storage()[self.physical_index(virtual_index)])
    }

    /// Copy bytes starting `offset` positions away from `end` into `dst`
    ///
    /// Stops at the opposite end, never wraps around. Returns the number of
    /// bytes copied, `0` when `offset` is past the valid range.
    fn read_at(&self, dst: &mut [u8], end: End, offset: usize) -> usize {
        let len = self.len();
        if dst.is_empty() || offset >= len {
            return 0;
        }

        let copied = dst.len().min(len - offset);
        let storage = self.storage();
        for (i, slot) in dst[..copied].iter_mut().enumerate() {
            let virtual_index = match end {
                End::Head => offset + i,
                End::Tail => len - 1 - offset - i,
            };
            *slot = storage[self.physical_index(virtual_index)];
        }
        copied
    }

    /// Borrow all valid bytes as a view
    fn view(&self) -> RingView<'_> {
        RingView::new(self.storage(), self.start_index(), self.len())
    }

    /// Borrow up to `len` valid bytes starting at virtual index `offset`
    fn view_range(&self, offset: usize, len: usize) -> RingView<'_> {
        let available = self.len().saturating_sub(offset);
        let start = self.physical_index(offset.min(self.len()));
        RingView::new(self.storage(), start, len.min(available))
    }

    /// Get a split readable view (handles wrap-around)
    ///
    /// Returns two slices that together contain all valid bytes, head first.
    fn as_slices(&self) -> BufferSlice<'_> {
        let len = self.len();
        let storage = self.storage();
        if len == 0 {
            return BufferSlice {
                first: &[],
                second: &[],
            };
        }

        let start = self.start_index();
        let first_len = len.min(storage.len() - start);
        BufferSlice {
            first: &storage[start..start + first_len],
            second: &storage[..len - first_len],
        }
    }
}

/// Read-only window over another buffer's storage
///
/// Produced by frame search and by [`ByteRing::view`]. Discarding bytes from
/// a view only moves its own bounds, which makes it usable as a scan cursor
/// over a buffer that must stay untouched.
#[derive(Debug, Clone, Copy)]
pub struct RingView<'a> {
    storage: &'a [u8],
    start: usize,
    count: usize,
}

impl<'a> RingView<'a> {
    /// Create a view over `count` bytes of `storage` starting at physical `start`
    pub fn new(storage: &'a [u8], start: usize, count: usize) -> Self {
        let capacity = storage.len();
        let start = if capacity == 0 { 0 } else { start % capacity };
        Self {
            storage,
            start,
            count: count.min(capacity),
        }
    }
}

impl ByteRing for RingView<'_> {
    fn storage(&self) -> &[u8] {
        self.storage
    }

    fn start_index(&self) -> usize {
        self.start
    }

    fn len(&self) -> usize {
        self.count
    }

    fn discard(&mut self, len: usize, end: End) -> usize {
        let dropped = len.min(self.count);
        if end == End::Head {
            self.start = self.physical_index(dropped);
        }
        self.count -= dropped;
        dropped
    }
}

impl PartialEq<[u8]> for RingView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.count == other.len() && self.as_slices().iter().eq(other.iter().copied())
    }
}

/// Circular byte buffer over fixed storage
///
/// # Example
///
/// ```rust
/// use sdl_shared::buffer::{ByteRing, End, RingBuffer};
///
/// let mut buffer = RingBuffer::new([0u8; 8]);
///
/// // Producer: append at the tail
/// assert_eq!(buffer.push_bounded(b"hello", End::Tail), 5);
///
/// // Consumer: take from the head
/// let mut out = [0u8; 5];
/// assert_eq!(buffer.pull(&mut out, End::Head), 5);
/// assert_eq!(&out, b"hello");
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer<S> {
    /// Backing storage, never resized
    storage: S,
    /// Physical slot of virtual index 0
    start: usize,
    /// Number of valid bytes
    count: usize,
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> RingBuffer<S> {
    /// Bind an empty buffer to `storage`
    pub fn new(storage: S) -> Self {
        Self::with_count(storage, 0)
    }

    /// Bind `storage` whose first `initial_count` slots already hold valid bytes
    pub fn with_count(storage: S, initial_count: usize) -> Self {
        let count = initial_count.min(storage.as_ref().len());
        Self {
            storage,
            start: 0,
            count,
        }
    }

    /// Release the backing storage
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Number of empty slots
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.count
    }

    /// Insert bytes at one end, overwriting the opposite end when full
    ///
    /// Ring semantics: every byte pushed into a full buffer silently discards
    /// the byte at the other end.
    pub fn push_overwrite(&mut self, data: &[u8], end: End) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }

        for &byte in data {
            match end {
                End::Tail => {
                    let slot = self.physical_index(self.count);
                    self.storage.as_mut()[slot] = byte;
                    if self.count < capacity {
                        self.count += 1;
                    } else {
                        self.start = self.physical_index(1);
                    }
                }
                End::Head => {
                    let slot = self.physical_index(capacity - 1);
                    self.storage.as_mut()[slot] = byte;
                    self.start = slot;
                    if self.count < capacity {
                        self.count += 1;
                    }
                }
            }
        }
    }

    /// Insert bytes at one end until the buffer is full
    ///
    /// Returns the number of bytes actually written.
    pub fn push_bounded(&mut self, data: &[u8], end: End) -> usize {
        let written = data.len().min(self.free());
        self.push_overwrite(&data[..written], end);
        written
    }

    /// Remove bytes from one end into `dst`
    ///
    /// Returns the number of bytes removed, bounded by `dst.len()` and by the
    /// number of valid bytes.
    pub fn pull(&mut self, dst: &mut [u8], end: End) -> usize {
        let pulled = self.read_at(dst, end, 0);
        self.discard(pulled, end);
        pulled
    }

    /// Overwrite valid bytes starting `offset` positions away from `end`
    ///
    /// Stops at the opposite end without wrap-around. Returns the number of
    /// bytes written, `0` when `offset` is past the valid range.
    pub fn write_at(&mut self, src: &[u8], end: End, offset: usize) -> usize {
        let count = self.count;
        if src.is_empty() || offset >= count {
            return 0;
        }

        let written = src.len().min(count - offset);
        for (i, &byte) in src[..written].iter().enumerate() {
            let virtual_index = match end {
                End::Head => offset + i,
                End::Tail => count - 1 - offset - i,
            };
            let slot = self.physical_index(virtual_index);
            self.storage.as_mut()[slot] = byte;
        }
        written
    }

    /// Remove a range that does not have to touch either end
    ///
    /// The bytes are copied into `dst` (read order follows `end`), then the
    /// gap is closed by shifting whichever surrounding span is shorter.
    pub fn cut(&mut self, dst: &mut [u8], end: End, offset: usize) -> usize {
        let removed = self.read_at(dst, end, offset);
        self.close_gap(removed, end, offset);
        removed
    }

    /// Same as [`cut`](Self::cut) without copying the removed bytes out
    pub fn remove_range(&mut self, len: usize, end: End, offset: usize) -> usize {
        let count = self.count;
        if len == 0 || offset >= count {
            return 0;
        }
        let removed = len.min(count - offset);
        self.close_gap(removed, end, offset);
        removed
    }

    fn close_gap(&mut self, removed: usize, end: End, offset: usize) {
        if removed == 0 {
            return;
        }

        let count = self.count;
        let low = match end {
            End::Head => offset,
            End::Tail => count - offset - removed,
        };
        let high = low + removed;

        if low <= count - high {
            // leading span is shorter: shift it towards the tail
            for index in (0..low).rev() {
                let byte = self.storage.as_ref()[self.physical_index(index)];
                let slot = self.physical_index(index + removed);
                self.storage.as_mut()[slot] = byte;
            }
            self.start = self.physical_index(removed);
        } else {
            // trailing span is shorter: shift it towards the head
            for index in high..count {
                let byte = self.storage.as_ref()[self.physical_index(index)];
                let slot = self.physical_index(index - removed);
                self.storage.as_mut()[slot] = byte;
            }
        }
        self.count -= removed;
    }

    /// Copy up to `len` bytes from `source` onto this buffer, source untouched
    ///
    /// Bounded by the bytes available in `source` and the free space here.
    pub fn push_from<R: ByteRing + ?Sized>(
        &mut self,
        source: &R,
        len: usize,
        dest_end: End,
        source_end: End,
    ) -> usize {
        if self.capacity() == 0 || source.capacity() == 0 {
            return 0;
        }

        let moved = len.min(source.len()).min(self.free());
        for offset in 0..moved {
            if let Some(byte) = source.byte_at(offset, source_end) {
                self.push_overwrite(&[byte], dest_end);
            }
        }
        moved
    }

    /// Rotate the valid bytes only
    ///
    /// The head moves to a new virtual position; the shorter of the two spans
    /// is relocated next to the other one so no hole opens up.
    pub fn rotate_logical(&mut self, rotation: Rotation, positions: usize) {
        let count = self.count;
        if count == 0 {
            return;
        }
        let shift = positions % count;
        if shift == 0 {
            return;
        }

        let capacity = self.capacity();
        let new_head = match rotation {
            Rotation::Left => shift,
            Rotation::Right => count - shift,
        };

        if new_head <= count - new_head {
            // move the leading span after the old tail
            for index in 0..new_head {
                let byte = self.storage.as_ref()[self.physical_index(index)];
                let slot = self.physical_index(count + index);
                self.storage.as_mut()[slot] = byte;
            }
            self.start = self.physical_index(new_head);
        } else {
            // move the trailing span before the old head
            for index in (new_head..count).rev() {
                let byte = self.storage.as_ref()[self.physical_index(index)];
                let slot = self.physical_index(capacity + index - count);
                self.storage.as_mut()[slot] = byte;
            }
            self.start = self.physical_index(capacity + new_head - count);
        }
    }

    /// Rotate the whole storage so virtual index 0 lands on `new_start`
    ///
    /// Every slot moves, valid or not. Each cycle of the index-shift
    /// permutation is walked once, carrying one byte along, so the cost is
    /// `O(capacity)` with no scratch memory.
    pub fn rotate_to_physical_start(&mut self, new_start: usize) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }
        let new_start = new_start % capacity;
        if new_start == self.start {
            return;
        }

        let shift = (new_start + capacity - self.start) % capacity;
        let storage = self.storage.as_mut();
        let mut moved = 0;
        let mut cycle_start = 0;
        while moved < capacity {
            let mut position = cycle_start;
            let mut carried = storage[position];
            loop {
                position = (position + shift) % capacity;
                core::mem::swap(&mut carried, &mut storage[position]);
                moved += 1;
                if position == cycle_start {
                    break;
                }
            }
            cycle_start += 1;
        }

        self.start = new_start;
    }

    /// Rotate storage so the valid bytes are one slice starting at slot 0
    pub fn make_contiguous(&mut self) -> &[u8] {
        self.rotate_to_physical_start(0);
        &self.storage.as_ref()[..self.count]
    }

    /// Reset the buffer to empty state
    ///
    /// Storage is left as is; only the valid count is cleared.
    pub fn flush(&mut self) {
        self.count = 0;
    }
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> ByteRing for RingBuffer<S> {
    fn storage(&self) -> &[u8] {
        self.storage.as_ref()
    }

    fn start_index(&self) -> usize {
        self.start
    }

    fn len(&self) -> usize {
        self.count
    }

    fn discard(&mut self, len: usize, end: End) -> usize {
        let dropped = len.min(self.count);
        if end == End::Head {
            self.start = self.physical_index(dropped);
        }
        self.count -= dropped;
        dropped
    }
}

/// Transfer up to `len` bytes from `source` to `dest`, one byte at a time
///
/// Reads from `source_end` of the source and pushes onto `dest_end` of the
/// destination. With `destructive` set the moved bytes are also removed from
/// the source. Returns the number of bytes moved.
pub fn move_across<D, R>(
    dest: &mut RingBuffer<D>,
    source: &mut R,
    len: usize,
    dest_end: End,
    source_end: End,
    destructive: bool,
) -> usize
where
    D: AsRef<[u8]> + AsMut<[u8]>,
    R: ByteRing + ?Sized,
{
    let moved = dest.push_from(&*source, len, dest_end, source_end);
    if destructive {
        source.discard(moved, source_end);
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents<R: ByteRing>(ring: &R) -> ([u8; 16], usize) {
        let mut out = [0u8; 16];
        let len = ring.read_at(&mut out, End::Head, 0);
        (out, len)
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = RingBuffer::new([0u8; 8]);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.free(), 8);
    }

    #[test]
    fn test_with_count_is_clamped_to_capacity() {
        let buffer = RingBuffer::with_count([1u8, 2, 3], 10);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_push_tail_and_pull_head() {
        let mut buffer = RingBuffer::new([0u8; 8]);
        assert_eq!(buffer.push_bounded(b"abc", End::Tail), 3);

        let mut out = [0u8; 3];
        assert_eq!(buffer.pull(&mut out, End::Head), 3);
        assert_eq!(&out, b"abc");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_push_head_reverses_order() {
        let mut buffer = RingBuffer::new([0u8; 8]);
        buffer.push_overwrite(b"abc", End::Head);

        let (out, len) = contents(&buffer);
        assert_eq!(&out[..len], b"cba");
    }

    #[test]
    fn test_read_from_tail_is_newest_first() {
        let buffer = RingBuffer::with_count(*b"abcd", 4);
        let mut out = [0u8; 3];
        assert_eq!(buffer.read_at(&mut out, End::Tail, 1), 3);
        assert_eq!(&out, b"cba");
    }

    #[test]
    fn test_overwrite_at_tail_drops_head() {
        let mut buffer = RingBuffer::new([0u8; 4]);
        buffer.push_overwrite(b"abcdef", End::Tail);

        assert!(buffer.is_full());
        let (out, len) = contents(&buffer);
        assert_eq!(&out[..len], b"cdef");
    }

    #[test]
    fn test_overwrite_at_head_drops_tail() {
        let mut buffer = RingBuffer::with_count(*b"abcd", 4);
        buffer.push_overwrite(b"x", End::Head);

        let (out, len) = contents(&buffer);
        assert_eq!(&out[..len], b"xabc");
    }

    #[test]
    fn test_push_bounded_stops_at_capacity() {
        let mut buffer = RingBuffer::new([0u8; 4]);
        assert_eq!(buffer.push_bounded(b"abcdef", End::Tail), 4);
        assert_eq!(buffer.push_bounded(b"g", End::Tail), 0);

        let (out, len) = contents(&buffer);
        assert_eq!(&out[..len], b"abcd");
    }

    #[test]
    fn test_pull_stops_at_empty() {
        let mut buffer = RingBuffer::with_count(*b"ab\0\0", 2);
        let mut out = [0u8; 4];
        assert_eq!(buffer.pull(&mut out, End::Tail), 2);
        assert_eq!(&out[..2], b"ba");
        assert_eq!(buffer.pull(&mut out, End::Tail), 0);
    }

    #[test]
    fn test_zero_capacity_is_inert() {
        let mut storage: [u8; 0] = [];
        let mut buffer = RingBuffer::new(&mut storage[..]);
        buffer.push_overwrite(b"abc", End::Tail);
        assert_eq!(buffer.push_bounded(b"abc", End::Head), 0);
        assert_eq!(buffer.pull(&mut [0u8; 2], End::Head), 0);
        assert_eq!(buffer.remove_range(1, End::Head, 0), 0);
        buffer.rotate_logical(Rotation::Left, 3);
        buffer.rotate_to_physical_start(2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_offset_past_count_is_noop() {
        let mut buffer = RingBuffer::with_count(*b"abcd", 2);
        let mut out = [0u8; 2];
        assert_eq!(buffer.read_at(&mut out, End::Head, 2), 0);
        assert_eq!(buffer.write_at(b"zz", End::Head, 2), 0);
        assert_eq!(buffer.cut(&mut out, End::Head, 5), 0);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_write_at_then_read_at() {
        let mut buffer = RingBuffer::new([0u8; 6]);
        buffer.push_overwrite(b"xxabcdef", End::Tail);

        assert_eq!(buffer.write_at(b"12", End::Tail, 1), 2);
        let mut out = [0u8; 2];
        assert_eq!(buffer.read_at(&mut out, End::Tail, 1), 2);
        assert_eq!(&out, b"12");

        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"abc21f");
    }

    #[test]
    fn test_write_at_does_not_wrap() {
        let mut buffer = RingBuffer::with_count(*b"abcd", 4);
        assert_eq!(buffer.write_at(b"xyz", End::Head, 2), 2);
        let (out, len) = contents(&buffer);
        assert_eq!(&out[..len], b"abxy");
    }

    #[test]
    fn test_cut_shifts_leading_span() {
        let mut buffer = RingBuffer::with_count(*b"abcdefgh", 8);
        let mut out = [0u8; 2];
        assert_eq!(buffer.cut(&mut out, End::Head, 1), 2);
        assert_eq!(&out, b"bc");

        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"adefgh");
        assert_eq!(buffer.start_index(), 2);
    }

    #[test]
    fn test_cut_shifts_trailing_span() {
        let mut buffer = RingBuffer::with_count(*b"abcdefgh", 8);
        let mut out = [0u8; 2];
        assert_eq!(buffer.cut(&mut out, End::Head, 5), 2);
        assert_eq!(&out, b"fg");

        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"abcdeh");
        assert_eq!(buffer.start_index(), 0);
    }

    #[test]
    fn test_cut_from_tail() {
        let mut buffer = RingBuffer::with_count(*b"abcdefgh", 8);
        let mut out = [0u8; 3];
        assert_eq!(buffer.cut(&mut out, End::Tail, 1), 3);
        assert_eq!(&out, b"gfe");

        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"abcdh");
    }

    #[test]
    fn test_remove_range_across_wrap() {
        let mut buffer = RingBuffer::new([0u8; 6]);
        buffer.push_overwrite(b"123abcdef", End::Tail);
        assert_eq!(buffer.start_index(), 3);

        assert_eq!(buffer.remove_range(2, End::Head, 2), 2);
        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"abef");
    }

    #[test]
    fn test_push_from_copies_without_consuming() {
        let source = RingBuffer::with_count(*b"abcdef", 6);
        let mut dest = RingBuffer::new([0u8; 4]);

        assert_eq!(dest.push_from(&source, 10, End::Tail, End::Head), 4);
        assert_eq!(source.len(), 6);
        let (all, len) = contents(&dest);
        assert_eq!(&all[..len], b"abcd");
    }

    #[test]
    fn test_move_across_destructive() {
        let mut source = RingBuffer::with_count(*b"abcdef", 6);
        let mut dest = RingBuffer::new([0u8; 8]);

        assert_eq!(move_across(&mut dest, &mut source, 2, End::Tail, End::Tail, true), 2);
        let (all, len) = contents(&dest);
        assert_eq!(&all[..len], b"fe");
        let (rest, len) = contents(&source);
        assert_eq!(&rest[..len], b"abcd");
    }

    #[test]
    fn test_move_across_non_destructive() {
        let mut source = RingBuffer::with_count(*b"abc", 3);
        let mut dest = RingBuffer::new([0u8; 8]);

        assert_eq!(move_across(&mut dest, &mut source, 3, End::Tail, End::Head, false), 3);
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn test_rotate_logical_left() {
        let mut buffer = RingBuffer::new([0u8; 8]);
        buffer.push_bounded(b"abcde", End::Tail);
        buffer.rotate_logical(Rotation::Left, 2);

        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"cdeab");
    }

    #[test]
    fn test_rotate_logical_right() {
        let mut buffer = RingBuffer::new([0u8; 8]);
        buffer.push_bounded(b"abcde", End::Tail);
        buffer.rotate_logical(Rotation::Right, 1);

        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"eabcd");
    }

    #[test]
    fn test_rotate_logical_full_buffer() {
        let mut buffer = RingBuffer::with_count(*b"abcde", 5);
        buffer.rotate_logical(Rotation::Left, 7);

        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"cdeab");
    }

    #[test]
    fn test_rotate_to_physical_start_moves_every_slot() {
        let mut buffer = RingBuffer::with_count(*b"abcdef", 4);
        buffer.rotate_to_physical_start(2);

        assert_eq!(buffer.start_index(), 2);
        assert_eq!(buffer.storage(), b"efabcd");
        let (all, len) = contents(&buffer);
        assert_eq!(&all[..len], b"abcd");
    }

    #[test]
    fn test_rotate_to_physical_start_round_trip() {
        let original = *b"0123456789";
        let mut buffer = RingBuffer::with_count(original, 7);
        buffer.rotate_to_physical_start(4);
        buffer.rotate_to_physical_start(0);
        assert_eq!(buffer.storage(), &original);
    }

    #[test]
    fn test_make_contiguous() {
        let mut buffer = RingBuffer::new([0u8; 5]);
        buffer.push_overwrite(b"xyzabc", End::Tail);
        assert_eq!(buffer.make_contiguous(), b"yzabc");
        assert_eq!(buffer.start_index(), 0);
    }

    #[test]
    fn test_as_slices_split_on_wrap() {
        let mut buffer = RingBuffer::new([0u8; 4]);
        buffer.push_overwrite(b"abcdef", End::Tail);

        let slices = buffer.as_slices();
        assert_eq!(slices.first, b"cd");
        assert_eq!(slices.second, b"ef");
        assert_eq!(slices.len(), 4);
    }

    #[test]
    fn test_view_discard_leaves_source() {
        let buffer = RingBuffer::with_count(*b"abcdef", 6);
        let mut view = buffer.view_range(1, 4);
        assert!(view == b"bcde"[..]);

        assert_eq!(view.discard(2, End::Head), 2);
        assert!(view == b"de"[..]);
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn test_flush_keeps_storage() {
        let mut buffer = RingBuffer::with_count(*b"abc", 3);
        buffer.flush();
        assert!(buffer.is_empty());
        assert_eq!(buffer.storage(), b"abc");
    }
}
