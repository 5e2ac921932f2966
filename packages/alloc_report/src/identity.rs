//! Symbolic names for live allocations in generated code.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::Origin;

/// C99 guarantees at least this many significant initial characters in an identifier.
pub(crate) const MAX_IDENTIFIER_LEN: usize = 63;

const ANONYMOUS_FILE: &str = "anonymous";

/// Prepended to file names that would otherwise start an identifier reserved by C.
const RESERVED_PREFIX: &str = "file";

/// Maps the address of each live allocation to the identifier it was declared with.
///
/// Identifiers are derived from the allocation origin as `<file>_<line>`. The first allocation
/// from an origin gets the plain name, later ones get `_2`, `_3` and so on appended. No
/// identifier is ever handed out twice by the same table, even after the allocation it named
/// has been released, because the generated code declares each one as a variable.
#[derive(Debug, Default)]
pub(crate) struct IdentityTable {
    live: HashMap<usize, String>,

    // Every identifier this table has ever handed out.
    issued: HashSet<String>,

    // How many identifiers have been derived from each `<file>_<line>` stem.
    ordinals: HashMap<String, u64>,
}

impl IdentityTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Derives a fresh identifier for an allocation at `address` and remembers it.
    ///
    /// If the address is still registered (because it was released behind our back and then
    /// handed out again by the real allocator), the stale entry is replaced.
    pub(crate) fn assign(&mut self, address: usize, origin: Origin<'_>) -> &str {
        let file = file_component(origin.file());
        let stem = format!("{file}_{}", origin.line());

        let ordinal = self.ordinals.entry(stem).or_insert(0);

        let identifier = loop {
            *ordinal = ordinal.wrapping_add(1);

            let candidate = compose(&file, origin.line(), *ordinal);
            if !self.issued.contains(&candidate) {
                break candidate;
            }
        };

        self.issued.insert(identifier.clone());

        let slot = self.live.entry(address).or_default();
        *slot = identifier;
        slot
    }

    /// Removes the allocation at `address`, returning the identifier it was declared with.
    ///
    /// Returns `None` if nothing is registered at that address.
    pub(crate) fn release(&mut self, address: usize) -> Option<String> {
        self.live.remove(&address)
    }

    /// Number of allocations that have been assigned an identifier but not yet released.
    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }
}

/// Turns a caller-supplied file tag into something usable as the start of a C identifier.
fn file_component(file: &str) -> String {
    let name = file.rsplit(['/', '\\']).next().unwrap_or(file);

    let mut component: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if component.is_empty() {
        component.push_str(ANONYMOUS_FILE);
    } else if component.starts_with(|c: char| c.is_ascii_digit()) {
        component.insert(0, '_');
    } else if is_reserved(&component) {
        component.insert_str(0, RESERVED_PREFIX);
    }

    component
}

/// C reserves identifiers that begin with two underscores or with an underscore followed by
/// an uppercase letter.
fn is_reserved(component: &str) -> bool {
    let mut chars = component.chars();

    chars.next() == Some('_') && chars.next().is_some_and(|c| c == '_' || c.is_ascii_uppercase())
}

/// Builds `<file>_<line>` (ordinal 1) or `<file>_<line>_<ordinal>`, truncating the file part
/// so the result fits in [`MAX_IDENTIFIER_LEN`].
fn compose(file: &str, line: u32, ordinal: u64) -> String {
    let mut suffix = format!("_{line}");
    if ordinal > 1 {
        // Writing to a String cannot fail.
        _ = write!(suffix, "_{ordinal}");
    }

    let file_budget = MAX_IDENTIFIER_LEN.saturating_sub(suffix.len());

    // The file component is pure ASCII, so truncating at any byte index is a char boundary.
    let mut identifier = file.to_owned();
    identifier.truncate(file_budget);
    identifier.push_str(&suffix);
    identifier
}
