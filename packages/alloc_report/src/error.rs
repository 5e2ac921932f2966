use std::fmt;

use thiserror::Error;

/// Errors that can occur when configuring or using a reporting allocator.
#[derive(Debug, Error)]
#[non_exhaustive]
#[expect(
    variant_size_differences,
    reason = "errors are rare and returned by value, a few bytes per variant do not matter"
)]
pub enum Error {
    /// The reporting allocator was built without one of its mandatory collaborators.
    #[error("reporting allocator is not configured: no {missing} was provided")]
    Unconfigured {
        /// The collaborator that was never supplied to the builder.
        missing: Collaborator,
    },

    /// The real allocator could not satisfy an allocation request.
    #[error("real allocator could not provide {size} bytes")]
    OutOfMemory {
        /// The number of bytes the caller asked for.
        size: usize,
    },
}

/// The external collaborators a reporting allocator depends on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Collaborator {
    /// The allocator that performs the actual memory reservation and release.
    RealAllocator,

    /// The sink that receives rendered report lines.
    OutputSink,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RealAllocator => f.write_str("real allocator"),
            Self::OutputSink => f.write_str("output sink"),
        }
    }
}

/// A specialized `Result` type for allocation reporting operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
