#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Allocation reporting for unit tests.
//!
//! This package wraps a real allocator in a [`ReportingAllocator`] that writes one line to an
//! [`OutputSink`] for every allocation and release performed through it. The output comes in
//! two styles:
//!
//! - [`ReportStyle::Narrative`] - human-readable diagnostics naming size, pointer and the
//!   `file:line` each call came from. Useful for spotting leaks and double frees by origin.
//! - [`ReportStyle::Code`] - C statements that reproduce the allocation pattern. Each
//!   allocation becomes a `malloc()` into a variable named after its origin and each release
//!   becomes a `free()` of that same variable, with the release site in a trailing comment.
//!
//! The package does not decide whether a test passes or fails, and it does not manage memory
//! itself. Both the real allocator and the output sink are supplied by the caller.
//!
//! # Narrative reports
//!
//! ```
//! use alloc_report::{HeapAllocator, OutputSink, ReportingAllocator, StringSink};
//!
//! let real = HeapAllocator::system();
//! let sink = StringSink::new();
//!
//! let mut allocator = ReportingAllocator::builder()
//!     .real_allocator(&real)
//!     .output_sink(&sink)
//!     .build()
//!     .unwrap();
//!
//! let memory = allocator.allocate(10, "file", 9).unwrap();
//!
//! assert_eq!(
//!     sink.contents(),
//!     format!("Allocation using malloc of size: 10 pointer: {memory:p} at file:9\n")
//! );
//!
//! // SAFETY: The memory was allocated above from the same real allocator.
//! unsafe {
//!     allocator.release(memory, "file", 12);
//! }
//! ```
//!
//! # Generated code
//!
//! ```
//! use alloc_report::{HeapAllocator, OutputSink, ReportStyle, ReportingAllocator, StringSink};
//!
//! let real = HeapAllocator::system();
//! let sink = StringSink::new();
//!
//! let mut allocator = ReportingAllocator::builder()
//!     .real_allocator(&real)
//!     .output_sink(&sink)
//!     .style(ReportStyle::Code)
//!     .build()
//!     .unwrap();
//!
//! let first = allocator.allocate(10, "file", 2).unwrap();
//! let second = allocator.allocate(10, "boo", 4).unwrap();
//!
//! // SAFETY: Allocated above from the same real allocator.
//! unsafe {
//!     allocator.release(first, "foo", 6);
//! }
//!
//! // SAFETY: Allocated above from the same real allocator.
//! unsafe {
//!     allocator.release(second, "bar", 8);
//! }
//!
//! print!("{sink}");
//! //     void* file_2 = malloc(10);
//! //     void* boo_4 = malloc(10);
//! //     free(file_2) /* at: foo:6 */
//! //     free(boo_4) /* at: bar:8 */
//! ```
//!
//! Identifiers are unique for the lifetime of a reporting allocator. A second allocation from
//! the same origin is named `<file>_<line>_2`, a third `<file>_<line>_3` and so on. File names
//! are reduced to valid C identifier characters, so passing `file!()` works as expected.
//!
//! # Logging
//!
//! Events are logged through `tracing` at `trace` level. Releases of pointers the code style
//! has no identifier for are logged at `warn` level.
//!
//! # Thread safety
//!
//! A reporting allocator is meant to be driven from a single test thread and performs no
//! internal synchronization.

mod builder;
mod error;
mod identity;
mod origin;
mod real_allocator;
mod render;
mod reporting_allocator;
mod sink;

pub use builder::*;
pub use error::*;
pub use origin::*;
pub use real_allocator::*;
pub use render::ReportStyle;
pub use reporting_allocator::*;
pub use sink::*;
