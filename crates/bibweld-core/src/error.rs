//! Hard errors surfaced by the publication database.

use crate::pubdb::PubId;

/// A targeted lookup matched more than one publication. This means the
/// caller's key set spans distinct works, or the index is corrupt; either
/// way it is not recoverable by the database itself.
#[derive(Debug)]
pub struct AmbiguousLookup {
    /// Display forms of the refs used for the lookup.
    pub refs: Vec<String>,
    /// Every publication that matched.
    pub matches: Vec<PubId>,
}

impl std::fmt::Display for AmbiguousLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} publications ({:?}) found using refs [{}]",
            self.matches.len(),
            self.matches,
            self.refs.join(", ")
        )
    }
}

impl std::error::Error for AmbiguousLookup {}
