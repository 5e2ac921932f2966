//! The allocator that performs the actual memory reservation and release.

use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::ptr::NonNull;

use crate::{Error, Result};

/// Size of the bookkeeping header placed in front of every block handed out by
/// [`HeapAllocator`]. Also the alignment of every block, so the header never shifts the
/// caller's data off the alignment `malloc` would give it.
const HEADER_SIZE: usize = 16;

const BLOCK_ALIGN: usize = HEADER_SIZE;

/// Reserves and releases memory on behalf of a [`ReportingAllocator`](crate::ReportingAllocator).
///
/// The reporting allocator never manages memory itself. It forwards every request to an
/// implementation of this trait, supplied by the caller when the reporting allocator is built.
/// Any type that can hand out and take back raw blocks by pointer alone can take this role.
///
/// # Examples
///
/// ```
/// use alloc_report::{HeapAllocator, RealAllocator};
///
/// let allocator = HeapAllocator::system();
///
/// let memory = allocator.allocate(10).unwrap();
///
/// // SAFETY: The memory was allocated by this allocator and is released exactly once.
/// unsafe {
///     allocator.release(memory);
/// }
/// ```
pub trait RealAllocator {
    /// Reserves `size` bytes and returns a pointer to the start of the block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the request cannot be satisfied.
    fn allocate(&self, size: usize) -> Result<NonNull<u8>>;

    /// Returns a block obtained from [`allocate()`][Self::allocate] to the allocator.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `ptr` was returned by `allocate()` on this same
    /// allocator and has not been released since.
    unsafe fn release(&self, ptr: NonNull<u8>);

    /// The name of the allocation function this allocator stands for, as shown in
    /// human-readable reports.
    fn allocate_name(&self) -> &'static str {
        "malloc"
    }

    /// The name of the release function this allocator stands for, as shown in
    /// human-readable reports.
    fn release_name(&self) -> &'static str {
        "free"
    }
}

/// A [`RealAllocator`] backed by any Rust [`GlobalAlloc`] implementation.
///
/// Rust allocators need to know the size of a block when releasing it, whereas `free()` only
/// receives a pointer. Each block therefore carries a small header that remembers its size.
/// Blocks are aligned to 16 bytes, the same guarantee `malloc()` gives on common platforms.
///
/// # Examples
///
/// ```rust
/// use alloc_report::HeapAllocator;
///
/// let allocator = HeapAllocator::system();
/// ```
pub struct HeapAllocator<A: GlobalAlloc> {
    inner: A,
}

impl<A: GlobalAlloc> fmt::Debug for HeapAllocator<A> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapAllocator")
            .field("inner", &"<allocator>")
            .finish()
    }
}

impl HeapAllocator<System> {
    /// Creates a heap allocator on top of the system's default allocator.
    ///
    /// This is what a test harness typically supplies as the real allocator.
    #[must_use]
    #[inline]
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A: GlobalAlloc> HeapAllocator<A> {
    /// Creates a heap allocator that reserves memory from the provided allocator.
    #[must_use]
    #[inline]
    pub const fn new(allocator: A) -> Self {
        Self { inner: allocator }
    }

    fn block_layout(size: usize) -> Result<Layout> {
        let total = HEADER_SIZE
            .checked_add(size)
            .ok_or(Error::OutOfMemory { size })?;

        Layout::from_size_align(total, BLOCK_ALIGN)
            .map_err(|_layout_error| Error::OutOfMemory { size })
    }
}

impl<A: GlobalAlloc> RealAllocator for HeapAllocator<A> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>> {
        let layout = Self::block_layout(size)?;

        // SAFETY: The layout always has a non-zero size because it includes the header.
        let base = unsafe { self.inner.alloc(layout) };
        let base = NonNull::new(base).ok_or(Error::OutOfMemory { size })?;

        // SAFETY: The block is at least HEADER_SIZE bytes long, which fits a usize.
        unsafe {
            base.cast::<usize>().as_ptr().write_unaligned(size);
        }

        // SAFETY: HEADER_SIZE bytes past the start is still inside (or one past the end of)
        // the block we just allocated.
        Ok(unsafe { base.add(HEADER_SIZE) })
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        // SAFETY: The caller guarantees ptr came from allocate(), which returned a pointer
        // exactly HEADER_SIZE bytes past the start of the block.
        let base = unsafe { ptr.sub(HEADER_SIZE) };

        // SAFETY: allocate() wrote the requested size at the start of the block.
        let size = unsafe { base.cast::<usize>().as_ptr().read_unaligned() };

        // The same layout was successfully created in allocate(), so it is valid here.
        let total = HEADER_SIZE.wrapping_add(size);

        // SAFETY: This is the exact size and alignment the block was allocated with.
        let layout = unsafe { Layout::from_size_align_unchecked(total, BLOCK_ALIGN) };

        // SAFETY: The block was allocated by the inner allocator with this layout.
        unsafe {
            self.inner.dealloc(base.as_ptr(), layout);
        }
    }
}
