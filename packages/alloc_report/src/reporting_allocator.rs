//! The allocation reporting decorator.

use std::fmt;
use std::ptr::NonNull;

use tracing::{trace, warn};

use crate::render::{AllocateEvent, ReleaseEvent, Renderer};
use crate::{Origin, OutputSink, RealAllocator, ReportStyle, ReportingAllocatorBuilder, Result};

/// Wraps a [`RealAllocator`] and reports every allocation and release to an [`OutputSink`].
///
/// Each successful [`allocate()`][Self::allocate] and each [`release()`][Self::release]
/// appends exactly one line to the sink, in call order. What the line looks like depends on
/// the [`ReportStyle`] chosen when the reporting allocator was built:
///
/// * [`ReportStyle::Narrative`] describes the event in a sentence, including the pointer and
///   the origin of the call.
/// * [`ReportStyle::Code`] emits a C statement. Each allocation is declared as a variable named
///   after its origin and the matching release frees that same variable, so the output can be
///   pasted into a program that replays the allocation pattern.
///
/// The real allocator and the sink are borrowed, so one sink can be inspected by the test
/// while the reporting allocator is still alive. Two reporting allocators never share any
/// state beyond what their callers give them.
///
/// # Memory use
///
/// In the code style, every identifier ever handed out is remembered for the lifetime of the
/// reporting allocator, so that no name is declared twice in the generated code. Memory use
/// therefore grows with the total number of allocations reported, not with the number that
/// are live. Build a fresh reporting allocator per test (or per scenario) rather than keeping
/// one around for a long-running workload.
///
/// # Examples
///
/// ```
/// use alloc_report::{HeapAllocator, OutputSink, ReportStyle, ReportingAllocator, StringSink};
///
/// let real = HeapAllocator::system();
/// let sink = StringSink::new();
///
/// let mut allocator = ReportingAllocator::builder()
///     .real_allocator(&real)
///     .output_sink(&sink)
///     .style(ReportStyle::Code)
///     .build()
///     .unwrap();
///
/// let memory = allocator.allocate(10, "file", 9).unwrap();
///
/// // SAFETY: The memory was allocated above from the same real allocator.
/// unsafe {
///     allocator.release(memory, "boo", 6);
/// }
///
/// assert_eq!(
///     sink.contents(),
///     "\tvoid* file_9 = malloc(10);\n\tfree(file_9) /* at: boo:6 */\n"
/// );
/// ```
pub struct ReportingAllocator<'a> {
    real: &'a dyn RealAllocator,
    sink: &'a dyn OutputSink,
    style: ReportStyle,
    renderer: Renderer,
    counts: EventCounts,
}

impl fmt::Debug for ReportingAllocator<'_> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportingAllocator")
            .field("style", &self.style)
            .field("renderer", &self.renderer)
            .field("counts", &self.counts)
            .finish_non_exhaustive()
    }
}

impl<'a> ReportingAllocator<'a> {
    /// Starts configuring a new reporting allocator.
    #[must_use]
    pub fn builder() -> ReportingAllocatorBuilder<'a> {
        ReportingAllocatorBuilder::new()
    }

    pub(crate) fn new(
        real: &'a dyn RealAllocator,
        sink: &'a dyn OutputSink,
        style: ReportStyle,
    ) -> Self {
        Self {
            real,
            sink,
            style,
            renderer: Renderer::new(style),
            counts: EventCounts::default(),
        }
    }

    /// The style this reporting allocator renders events in.
    #[must_use]
    pub fn style(&self) -> ReportStyle {
        self.style
    }

    /// Allocates `size` bytes from the real allocator and reports the allocation as having
    /// been requested at `file:line`.
    ///
    /// # Errors
    ///
    /// Returns whatever error the real allocator returned, unchanged. Nothing is reported
    /// for an allocation that did not happen.
    pub fn allocate(&mut self, size: usize, file: &str, line: u32) -> Result<NonNull<u8>> {
        self.allocate_from(size, Origin::new(file, line))
    }

    /// Allocates `size` bytes, reporting the location of the caller as the origin.
    ///
    /// # Errors
    ///
    /// Returns whatever error the real allocator returned, unchanged.
    #[track_caller]
    pub fn allocate_here(&mut self, size: usize) -> Result<NonNull<u8>> {
        self.allocate_from(size, Origin::caller())
    }

    /// Allocates `size` bytes and reports the allocation as coming from `origin`.
    ///
    /// # Errors
    ///
    /// Returns whatever error the real allocator returned, unchanged.
    pub fn allocate_from(&mut self, size: usize, origin: Origin<'_>) -> Result<NonNull<u8>> {
        let ptr = self.real.allocate(size)?;

        let event = AllocateEvent {
            function: self.real.allocate_name(),
            size,
            ptr,
            origin,
        };

        let line = self.renderer.render_allocate(&event);
        self.sink.append(&line);
        self.counts.allocations = self.counts.allocations.wrapping_add(1);

        trace!(size, pointer = ?ptr, %origin, "allocation reported");

        Ok(ptr)
    }

    /// Releases `ptr` through the real allocator and reports the release as having been
    /// requested at `file:line`.
    ///
    /// The pointer does not need to have been allocated through this reporting allocator.
    /// Pointers it does not know about are still released and reported; the code style marks
    /// them as untracked.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `ptr` was allocated by the real allocator this reporting
    /// allocator wraps and has not been released since.
    pub unsafe fn release(&mut self, ptr: NonNull<u8>, file: &str, line: u32) {
        // SAFETY: Forwarding the caller's guarantees.
        unsafe {
            self.release_from(ptr, Origin::new(file, line));
        }
    }

    /// Releases `ptr`, reporting the location of the caller as the origin.
    ///
    /// # Safety
    ///
    /// Same as [`release()`][Self::release].
    #[track_caller]
    pub unsafe fn release_here(&mut self, ptr: NonNull<u8>) {
        let origin = Origin::caller();

        // SAFETY: Forwarding the caller's guarantees.
        unsafe {
            self.release_from(ptr, origin);
        }
    }

    /// Releases `ptr` and reports the release as coming from `origin`.
    ///
    /// # Safety
    ///
    /// Same as [`release()`][Self::release].
    pub unsafe fn release_from(&mut self, ptr: NonNull<u8>, origin: Origin<'_>) {
        // SAFETY: Forwarding the caller's guarantees.
        unsafe {
            self.real.release(ptr);
        }

        // Only the address is used from here on, the memory behind it is never touched.
        let event = ReleaseEvent {
            function: self.real.release_name(),
            ptr,
            origin,
        };

        let line = self.renderer.render_release(&event);
        self.sink.append(&line.text);
        self.counts.releases = self.counts.releases.wrapping_add(1);

        if line.untracked {
            self.counts.untracked_releases = self.counts.untracked_releases.wrapping_add(1);

            warn!(
                pointer = ?ptr,
                %origin,
                "released pointer has no live identifier, it is untracked or already released"
            );
        } else {
            trace!(pointer = ?ptr, %origin, "release reported");
        }
    }

    /// How many events this reporting allocator has reported so far.
    #[must_use]
    pub fn counts(&self) -> EventCounts {
        self.counts
    }

    /// Number of allocations whose generated identifier has not been released yet.
    ///
    /// Only the code style keeps track of individual allocations, so this is `None` for
    /// other styles.
    #[must_use]
    pub fn tracked_allocations(&self) -> Option<usize> {
        self.renderer.tracked_live()
    }
}

/// Counts of the events reported by one [`ReportingAllocator`].
///
/// # Examples
///
/// ```
/// use alloc_report::{HeapAllocator, ReportingAllocator, StringSink};
///
/// let real = HeapAllocator::system();
/// let sink = StringSink::new();
///
/// let mut allocator = ReportingAllocator::builder()
///     .real_allocator(&real)
///     .output_sink(&sink)
///     .build()
///     .unwrap();
///
/// let first = allocator.allocate_here(8).unwrap();
/// let second = allocator.allocate_here(8).unwrap();
///
/// // SAFETY: Allocated above from the same real allocator.
/// unsafe {
///     allocator.release_here(first);
/// }
///
/// let counts = allocator.counts();
/// assert_eq!(counts.allocations(), 2);
/// assert_eq!(counts.releases(), 1);
/// assert_eq!(counts.outstanding(), 1);
/// # // SAFETY: Allocated above from the same real allocator.
/// # unsafe { allocator.release_here(second) };
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventCounts {
    allocations: u64,
    releases: u64,
    untracked_releases: u64,
}

impl EventCounts {
    /// Number of successful allocations reported.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Number of releases reported, including untracked ones.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Number of releases of pointers that had no live identifier.
    ///
    /// Always zero for styles that do not track identity.
    #[must_use]
    pub fn untracked_releases(&self) -> u64 {
        self.untracked_releases
    }

    /// Allocations minus releases, or zero if there have been more releases than allocations.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.allocations.saturating_sub(self.releases)
    }
}
