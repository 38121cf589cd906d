//! Driving a stream of adapter records into the database.

use crate::pubdb::{AddOutcome, PubDb};
use crate::publication::PubRecord;

/// Counters for one ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub received: usize,
    pub created: usize,
    pub merged: usize,
    pub dropped: usize,
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records: {} new, {} merged, {} dropped",
            self.received, self.created, self.merged, self.dropped
        )
    }
}

/// Feed records through [`PubDb::add`]. Records missing authors or refs
/// cannot be reconciled against anything and are dropped with a warning.
pub fn ingest<I>(db: &mut PubDb, records: I) -> IngestStats
where
    I: IntoIterator<Item = PubRecord>,
{
    let mut stats = IngestStats::default();
    for record in records {
        stats.received += 1;
        if !record.is_well_formed() {
            log::warn!("dropping malformed record {}", record.describe());
            stats.dropped += 1;
            continue;
        }
        match db.add(record) {
            AddOutcome::Created(_) => stats.created += 1,
            AddOutcome::Merged(_) => stats.merged += 1,
        }
    }
    stats
}
