use std::fmt;
use std::panic::Location;

/// The source location an allocation or release was requested from.
///
/// The file is whatever tag the caller supplies. Tests that exercise the reporting allocator
/// directly typically pass short tags like `"file"`, while Rust callers usually pass the value
/// of `file!()`.
///
/// # Examples
///
/// ```
/// use alloc_report::Origin;
///
/// let origin = Origin::new("file", 9);
///
/// assert_eq!(origin.to_string(), "file:9");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Origin<'a> {
    file: &'a str,
    line: u32,
}

impl<'a> Origin<'a> {
    /// Creates an origin from a file tag and a line number.
    #[must_use]
    pub const fn new(file: &'a str, line: u32) -> Self {
        Self { file, line }
    }

    /// The file tag, exactly as supplied by the caller.
    #[must_use]
    pub const fn file(&self) -> &'a str {
        self.file
    }

    /// The line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }
}

impl Origin<'static> {
    /// Creates an origin pointing at the caller of the function this is invoked from.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&'static Location<'static>> for Origin<'static> {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Origin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
