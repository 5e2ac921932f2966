//! Turning allocation events into report lines.

use std::ptr::NonNull;

use crate::Origin;
use crate::identity::IdentityTable;

/// How a [`ReportingAllocator`](crate::ReportingAllocator) describes each event.
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
/// assert_eq!(sink.contents(), "\tvoid* file_9 = malloc(10);\n");
/// # // SAFETY: Allocated above from the same real allocator.
/// # unsafe { allocator.release(memory, "file", 10) };
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReportStyle {
    /// One human-readable sentence per event, naming size, pointer and origin.
    #[default]
    Narrative,

    /// One C statement per event, suitable for pasting into a program that replays
    /// the allocation pattern.
    ///
    /// The statements always call `malloc` and `free`, whatever names the real allocator
    /// reports for itself, so that the output is plain C that compiles on its own.
    Code,
}

/// An allocation that the real allocator has just satisfied.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AllocateEvent<'a> {
    pub(crate) function: &'static str,
    pub(crate) size: usize,
    pub(crate) ptr: NonNull<u8>,
    pub(crate) origin: Origin<'a>,
}

/// A block that has just been handed back to the real allocator.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReleaseEvent<'a> {
    pub(crate) function: &'static str,
    pub(crate) ptr: NonNull<u8>,
    pub(crate) origin: Origin<'a>,
}

/// The report line for a release, plus whether the released pointer was unknown to the
/// renderer. Only renderers that track identity can ever report a pointer as unknown.
#[derive(Debug)]
pub(crate) struct ReleaseLine {
    pub(crate) text: String,
    pub(crate) untracked: bool,
}

#[derive(Debug)]
pub(crate) enum Renderer {
    Narrative,
    Code(IdentityTable),
}

impl Renderer {
    pub(crate) fn new(style: ReportStyle) -> Self {
        match style {
            ReportStyle::Narrative => Self::Narrative,
            ReportStyle::Code => Self::Code(IdentityTable::new()),
        }
    }

    pub(crate) fn render_allocate(&mut self, event: &AllocateEvent<'_>) -> String {
        match self {
            Self::Narrative => format!(
                "Allocation using {} of size: {} pointer: {:p} at {}\n",
                event.function, event.size, event.ptr, event.origin
            ),
            Self::Code(identities) => {
                let identifier = identities.assign(address(event.ptr), event.origin);

                format!("\tvoid* {identifier} = malloc({});\n", event.size)
            }
        }
    }

    pub(crate) fn render_release(&mut self, event: &ReleaseEvent<'_>) -> ReleaseLine {
        match self {
            Self::Narrative => ReleaseLine {
                text: format!(
                    "Deallocation using {} of pointer: {:p} at {}\n",
                    event.function, event.ptr, event.origin
                ),
                untracked: false,
            },
            Self::Code(identities) => identities.release(address(event.ptr)).map_or_else(
                || ReleaseLine {
                    text: format!(
                        "\t/* free({:p}) of untracked pointer at: {} */\n",
                        event.ptr, event.origin
                    ),
                    untracked: true,
                },
                |identifier| ReleaseLine {
                    text: format!("\tfree({identifier}) /* at: {} */\n", event.origin),
                    untracked: false,
                },
            ),
        }
    }

    /// Number of allocations still awaiting a matching release, if this renderer tracks them.
    pub(crate) fn tracked_live(&self) -> Option<usize> {
        match self {
            Self::Narrative => None,
            Self::Code(identities) => Some(identities.len()),
        }
    }
}

fn address(ptr: NonNull<u8>) -> usize {
    ptr.addr().get()
}
