//! bibweld core - the deduplicating bibliographic store
//!
//! Consolidates publication records harvested from heterogeneous
//! scholarly sources into one canonical in-memory database. Identifiers
//! accumulate monotonically: equal entities merge in place and their
//! identity never changes, so anything holding a handle stays valid.

pub mod author;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod lattice;
pub mod pubdb;
pub mod publication;
pub mod pubtype;
pub mod reference;
pub mod text;

// Re-exports for convenience
pub use author::Author;
pub use error::AmbiguousLookup;
pub use fetch::{backoff_duration, retry_with_backoff, FetchError, Fetcher};
pub use ingest::{ingest, IngestStats};
pub use lattice::{DedupMap, DedupMultimap, DedupSet, Handle, LatticeKey};
pub use pubdb::{AddOutcome, PubDb, PubId};
pub use publication::{AuthorId, PubRecord, Publication, RefId, MIN_ABSTRACT_LEN};
pub use pubtype::PubType;
pub use reference::{BookRef, JournalRef, PageStart, Pages, Ref};
pub use text::{clean_pii, normalize_ws, strip_accents, title_case};
