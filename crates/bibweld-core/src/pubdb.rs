//! The deduplicating publication database.
//!
//! Two indices — ref→publication and author→publications — share their
//! canonical keys with the publications themselves, so every ref and
//! author lives exactly once in memory. Matching between refs and
//! between authors is not transitive, so there is no clean partition
//! into equivalence classes; `add` linearizes the ambiguity with a
//! deterministic rule instead of a union-find.

use std::collections::BTreeSet;

use crate::author::Author;
use crate::error::AmbiguousLookup;
use crate::lattice::{DedupMap, DedupMultimap};
use crate::publication::{AuthorId, PubRecord, Publication, RefId};
use crate::reference::Ref;

/// Identity of a publication inside a [`PubDb`]. Slots are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PubId(u32);

impl PubId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PubId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What `add` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created(PubId),
    Merged(PubId),
}

impl AddOutcome {
    pub fn id(self) -> PubId {
        match self {
            AddOutcome::Created(id) | AddOutcome::Merged(id) => id,
        }
    }
}

/// A record merges into a publication it is not outright equal to only
/// when they share at least this many hard refs. One shared identifier
/// with neither matching authors nor a common title is treated as source
/// noise, not as the same work.
const MIN_HARD_MATCHES: usize = 2;

pub struct PubDb {
    pubs: Vec<Publication>,
    refs: DedupMap<Ref, PubId>,
    authors: DedupMultimap<Author, PubId>,
}

impl PubDb {
    pub fn new() -> PubDb {
        PubDb {
            pubs: Vec::new(),
            refs: DedupMap::new(),
            authors: DedupMultimap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pubs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PubId, &Publication)> {
        self.pubs
            .iter()
            .enumerate()
            .map(|(i, p)| (PubId(i as u32), p))
    }

    pub fn publication(&self, id: PubId) -> &Publication {
        &self.pubs[id.index()]
    }

    pub fn ref_key(&self, id: RefId) -> &Ref {
        self.refs.key(id)
    }

    pub fn author_key(&self, id: AuthorId) -> &Author {
        self.authors.key(id)
    }

    /// Canonical handle for a ref, if one equal to it is indexed.
    pub fn find_ref(&self, r: &Ref) -> Option<RefId> {
        self.refs.find(r)
    }

    pub fn find_author(&self, a: &Author) -> Option<AuthorId> {
        self.authors.find(a)
    }

    /// The publication a canonical ref currently points at.
    pub fn ref_owner(&self, id: RefId) -> PubId {
        *self.refs.value(id)
    }

    /// Publications credited to an author equal to `author`.
    pub fn author_pubs(&self, author: &Author) -> Vec<PubId> {
        match self.authors.find(author) {
            Some(handle) => {
                let mut ids: Vec<PubId> = self.authors.values(handle).iter().copied().collect();
                ids.sort();
                ids
            }
            None => Vec::new(),
        }
    }

    /// Each indexed ref among `refs`, with the publication it points at.
    /// Probing lookups: page/ISSN information in `refs` is absorbed into
    /// the canonical refs even when the caller does nothing further.
    pub fn lookup_by_refs(&mut self, refs: &[Ref]) -> Vec<(RefId, PubId)> {
        refs.iter()
            .filter_map(|r| self.refs.get(r).map(|(h, &pid)| (h, pid)))
            .collect()
    }

    /// The single publication carrying one of `refs` whose author set
    /// equals `authors`. More than one match is index corruption or
    /// caller misuse and fails hard.
    pub fn get(
        &mut self,
        refs: &[Ref],
        authors: &[Author],
    ) -> Result<Option<PubId>, AmbiguousLookup> {
        let mut found: Vec<PubId> = Vec::new();
        for r in refs {
            let Some((_, &pid)) = self.refs.get(r) else {
                continue;
            };
            if found.contains(&pid) {
                continue;
            }
            let same = {
                let publication = &self.pubs[pid.index()];
                self.same_author_set(&publication.authors, authors)
            };
            if same {
                found.push(pid);
            }
        }
        match found.len() {
            0 => Ok(None),
            1 => Ok(Some(found[0])),
            _ => Err(AmbiguousLookup {
                refs: refs.iter().map(Ref::to_string).collect(),
                matches: found,
            }),
        }
    }

    /// Reconcile a record against the database.
    ///
    /// Every incoming ref is probed against the index first (absorbing
    /// its information into the canonical ref on a hit). The first
    /// candidate publication outright equal to the record wins; failing
    /// that, the candidate sharing the most hard refs wins — provided it
    /// shares at least [`MIN_HARD_MATCHES`] — with ties going to the
    /// first candidate seen. Otherwise the record becomes a new
    /// publication, its refs and authors canonicalized through the
    /// indices.
    pub fn add(&mut self, rec: PubRecord) -> AddOutcome {
        // Candidate publications in first-seen order, with the indices
        // of the record refs that matched them hard.
        let mut candidates: Vec<(PubId, Vec<usize>)> = Vec::new();
        let mut exact: Option<PubId> = None;
        for (i, r) in rec.refs.iter().enumerate() {
            let Some((_, &pid)) = self.refs.get(r) else {
                continue;
            };
            if r.is_hard() {
                match candidates.iter_mut().find(|(cand, _)| *cand == pid) {
                    Some((_, matched)) => matched.push(i),
                    None => candidates.push((pid, vec![i])),
                }
            }
            if self.record_matches(pid, &rec) {
                exact = Some(pid);
                break;
            }
        }

        let chosen = exact.or_else(|| {
            let mut best: Option<&(PubId, Vec<usize>)> = None;
            for cand in &candidates {
                // Strictly greater: ties keep the first-seen candidate.
                if best.map_or(true, |b| cand.1.len() > b.1.len()) {
                    best = Some(cand);
                }
            }
            let &(pid, ref matched) = best?;
            if matched.len() < MIN_HARD_MATCHES {
                return None;
            }
            let shared: Vec<String> = matched.iter().map(|&i| rec.refs[i].to_string()).collect();
            log::warn!(
                "merging {} <- {} on behalf of: [{}]",
                self.describe(pid),
                rec.describe(),
                shared.join(", ")
            );
            Some(pid)
        });

        match chosen {
            Some(pid) => {
                self.merge_into(pid, rec);
                AddOutcome::Merged(pid)
            }
            None => AddOutcome::Created(self.insert_new(rec)),
        }
    }

    /// Reinsert a publication that is already known to be canonical (a
    /// persisted mirror being reloaded). Refs and authors are
    /// canonicalized through the indices, but no reconciliation against
    /// existing publications takes place.
    pub fn restore(&mut self, rec: PubRecord) -> PubId {
        self.insert_new(rec)
    }

    /// Publication-level equality against a record, given that a shared
    /// ref is already established: same author set, or a common title.
    fn record_matches(&self, pid: PubId, rec: &PubRecord) -> bool {
        let publication = &self.pubs[pid.index()];
        if self.same_author_set(&publication.authors, &rec.authors) {
            return true;
        }
        let rec_titles = rec.titles();
        publication.titles.iter().any(|t| rec_titles.contains(t))
    }

    /// Set equality under author matching: same cardinality and every
    /// member matched in both directions.
    fn same_author_set(&self, canonical: &BTreeSet<AuthorId>, given: &[Author]) -> bool {
        if canonical.len() != given.len() {
            return false;
        }
        canonical
            .iter()
            .all(|&h| given.iter().any(|a| self.authors.key(h).matches(a)))
            && given
                .iter()
                .all(|a| canonical.iter().any(|&h| self.authors.key(h).matches(a)))
    }

    fn merge_into(&mut self, pid: PubId, rec: PubRecord) {
        log::info!("merging {} <- {}", self.describe(pid), rec.describe());
        let titles = rec.titles();
        let PubRecord {
            pubtype,
            authors,
            refs,
            en_abstract,
            fr_abstract,
            ..
        } = rec;

        let ref_handles: Vec<RefId> = refs.into_iter().map(|r| self.refs.insert(r, pid)).collect();
        let author_handles: Vec<AuthorId> = authors
            .into_iter()
            .map(|a| self.authors.insert(a, pid))
            .collect();

        let (all_refs, all_authors) = {
            let publication = &mut self.pubs[pid.index()];
            publication.refs.extend(ref_handles);
            publication.authors.extend(author_handles);
            publication.titles.extend(titles);
            publication.pubtype.promote(pubtype);
            merge_abstract(&mut publication.en_abstract, en_abstract, "en");
            merge_abstract(&mut publication.fr_abstract, fr_abstract, "fr");
            (
                publication.refs.iter().copied().collect::<Vec<_>>(),
                publication.authors.iter().copied().collect::<Vec<_>>(),
            )
        };

        // Re-publish: after a merge, every ref and author of the merged
        // publication points at it, including refs previously indexed
        // under some other publication.
        for h in all_refs {
            self.refs.set_value(h, pid);
        }
        for h in all_authors {
            self.authors.add_value(h, pid);
        }
    }

    fn insert_new(&mut self, rec: PubRecord) -> PubId {
        let pid = PubId(self.pubs.len() as u32);
        let titles = rec.titles();
        let PubRecord {
            pubtype,
            date,
            authors,
            refs,
            en_abstract,
            fr_abstract,
        } = rec;
        let refs: BTreeSet<RefId> = refs.into_iter().map(|r| self.refs.insert(r, pid)).collect();
        let authors: BTreeSet<AuthorId> = authors
            .into_iter()
            .map(|a| self.authors.insert(a, pid))
            .collect();
        self.pubs.push(Publication {
            pubtype,
            date,
            refs,
            authors,
            titles,
            en_abstract,
            fr_abstract,
        });
        pid
    }

    fn describe(&self, pid: PubId) -> String {
        let publication = &self.pubs[pid.index()];
        format!(
            "{} {} {:?}",
            pid,
            publication.pubtype,
            publication.title().unwrap_or("<untitled>")
        )
    }
}

impl Default for PubDb {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_abstract(current: &mut Option<String>, incoming: Option<String>, lang: &str) {
    match (current.as_ref(), incoming) {
        (None, Some(text)) => *current = Some(text),
        (Some(mine), Some(theirs)) if *mine != theirs => {
            log::info!("different {lang} abstracts, keeping the longer one");
            if theirs.len() > mine.len() {
                *current = Some(theirs);
            }
        }
        _ => {}
    }
}
