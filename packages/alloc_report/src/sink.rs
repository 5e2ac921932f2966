//! Destinations for rendered report lines.

use std::cell::RefCell;
use std::fmt;

/// Receives report lines from a [`ReportingAllocator`](crate::ReportingAllocator).
///
/// The sink is borrowed by the reporting allocator, so that the owner can inspect or reset
/// the collected output while the reporting allocator is still in use. All methods therefore
/// take `&self`.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink {
    /// Appends one piece of text to the end of the collected output.
    fn append(&self, text: &str);

    /// Returns everything appended since creation or the last [`reset()`][Self::reset].
    fn contents(&self) -> String;

    /// Discards all collected output.
    fn reset(&self);
}

/// An [`OutputSink`] that collects all output in an in-memory string.
///
/// # Examples
///
/// ```
/// use alloc_report::{OutputSink, StringSink};
///
/// let sink = StringSink::new();
/// sink.append("hello ");
/// sink.append("world");
///
/// assert_eq!(sink.contents(), "hello world");
///
/// sink.reset();
/// assert_eq!(sink.contents(), "");
/// ```
#[derive(Debug, Default)]
pub struct StringSink {
    buffer: RefCell<String>,
}

impl StringSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been appended since creation or the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }
}

impl OutputSink for StringSink {
    fn append(&self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }

    fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    fn reset(&self) {
        self.buffer.borrow_mut().clear();
    }
}

impl fmt::Display for StringSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer.borrow())
    }
}
