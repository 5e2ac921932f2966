use std::fmt;

use tracing::debug;

use crate::{
    Collaborator, Error, OutputSink, RealAllocator, ReportStyle, ReportingAllocator, Result,
};

/// Configures and creates a [`ReportingAllocator`].
///
/// Both the real allocator and the output sink are mandatory. Forgetting either one is
/// reported by [`build()`][Self::build] instead of surfacing later as missing output.
///
/// # Examples
///
/// ```
/// use alloc_report::{HeapAllocator, ReportStyle, ReportingAllocator, StringSink};
///
/// let real = HeapAllocator::system();
/// let sink = StringSink::new();
///
/// let allocator = ReportingAllocator::builder()
///     .real_allocator(&real)
///     .output_sink(&sink)
///     .style(ReportStyle::Narrative)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct ReportingAllocatorBuilder<'a> {
    real: Option<&'a dyn RealAllocator>,
    sink: Option<&'a dyn OutputSink>,
    style: ReportStyle,
}

impl fmt::Debug for ReportingAllocatorBuilder<'_> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportingAllocatorBuilder")
            .field("real", &self.real.map(|_| "<allocator>"))
            .field("sink", &self.sink.map(|_| "<sink>"))
            .field("style", &self.style)
            .finish()
    }
}

impl<'a> ReportingAllocatorBuilder<'a> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets the allocator that performs the actual memory operations.
    #[must_use]
    pub fn real_allocator(mut self, real: &'a dyn RealAllocator) -> Self {
        self.real = Some(real);
        self
    }

    /// Sets the sink that receives the rendered report lines.
    #[must_use]
    pub fn output_sink(mut self, sink: &'a dyn OutputSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets how events are rendered. Defaults to [`ReportStyle::Narrative`].
    #[must_use]
    pub fn style(mut self, style: ReportStyle) -> Self {
        self.style = style;
        self
    }

    /// Creates the reporting allocator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unconfigured`] if no real allocator or no output sink was set.
    pub fn build(self) -> Result<ReportingAllocator<'a>> {
        let real = self.real.ok_or(Error::Unconfigured {
            missing: Collaborator::RealAllocator,
        })?;

        let sink = self.sink.ok_or(Error::Unconfigured {
            missing: Collaborator::OutputSink,
        })?;

        debug!(style = ?self.style, "reporting allocator configured");

        Ok(ReportingAllocator::new(real, sink, self.style))
    }
}
