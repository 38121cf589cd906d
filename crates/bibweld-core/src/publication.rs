//! Publications: the record shape adapters produce, and the canonical
//! entity the database stores.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::author::Author;
use crate::lattice::Handle;
use crate::pubtype::PubType;
use crate::reference::Ref;
use crate::text::normalize_ws;

/// Abstracts shorter than this are too generic to identify anything.
pub const MIN_ABSTRACT_LEN: usize = 100;

pub type RefId = Handle<Ref>;
pub type AuthorId = Handle<Author>;

/// A publication as a source adapter reports it: owned author and ref
/// lists, not yet reconciled against anything.
#[derive(Debug, Clone)]
pub struct PubRecord {
    pub pubtype: PubType,
    pub date: Option<NaiveDate>,
    pub authors: Vec<Author>,
    pub refs: Vec<Ref>,
    pub en_abstract: Option<String>,
    pub fr_abstract: Option<String>,
}

impl PubRecord {
    /// Assemble a record. Abstracts are whitespace-normalized and adopted
    /// only when long enough to act as identifying text; an adopted
    /// abstract is also injected as a ref so it participates in matching.
    pub fn new(
        pubtype: PubType,
        authors: Vec<Author>,
        date: Option<NaiveDate>,
        mut refs: Vec<Ref>,
        en_abstract: Option<&str>,
        fr_abstract: Option<&str>,
    ) -> PubRecord {
        let en_abstract = adopt_abstract(en_abstract, "en_abstract", &mut refs);
        let fr_abstract = adopt_abstract(fr_abstract, "fr_abstract", &mut refs);
        PubRecord {
            pubtype,
            date,
            authors,
            refs,
            en_abstract,
            fr_abstract,
        }
    }

    /// Title strings carried by this record's title refs.
    pub fn titles(&self) -> BTreeSet<String> {
        self.refs
            .iter()
            .filter(|r| r.is_title())
            .map(|r| r.key_value().to_string())
            .collect()
    }

    /// A record that identifies nothing or credits nobody cannot be
    /// reconciled and is dropped at ingest.
    pub fn is_well_formed(&self) -> bool {
        !self.authors.is_empty() && !self.refs.is_empty()
    }

    /// Short description for merge logging.
    pub fn describe(&self) -> String {
        let title = self
            .titles()
            .into_iter()
            .next()
            .unwrap_or_else(|| "<untitled>".to_string());
        format!("{} {:?}", self.pubtype, title)
    }
}

fn adopt_abstract(text: Option<&str>, reftype: &str, refs: &mut Vec<Ref>) -> Option<String> {
    let text = normalize_ws(text?);
    if text.len() < MIN_ABSTRACT_LEN {
        return None;
    }
    refs.push(Ref::plain(reftype, &text));
    Some(text)
}

/// A canonical publication owned by the database.
///
/// Refs and authors are held as handles into the database indices, so
/// the identity of every member is shared with the index that
/// deduplicated it. Publications themselves are identified by their slot
/// in the database, never by value.
#[derive(Debug, Clone)]
pub struct Publication {
    pub pubtype: PubType,
    pub date: Option<NaiveDate>,
    pub refs: BTreeSet<RefId>,
    pub authors: BTreeSet<AuthorId>,
    pub titles: BTreeSet<String>,
    pub en_abstract: Option<String>,
    pub fr_abstract: Option<String>,
}

impl Publication {
    /// A deterministic representative title: the shortest, ties broken
    /// lexicographically.
    pub fn title(&self) -> Option<&str> {
        self.titles
            .iter()
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_abstract(text: &str) -> PubRecord {
        PubRecord::new(
            PubType::Art,
            vec![Author::parse("John Smith")],
            None,
            vec![Ref::plain("doi", "10.1/x")],
            Some(text),
            None,
        )
    }

    #[test]
    fn short_abstract_rejected() {
        let rec = record_with_abstract("Too short to mean anything.");
        assert_eq!(rec.en_abstract, None);
        assert_eq!(rec.refs.len(), 1);
    }

    #[test]
    fn long_abstract_adopted_and_injected_as_ref() {
        let text = "word ".repeat(30);
        let rec = record_with_abstract(&text);
        let adopted = rec.en_abstract.as_deref().unwrap();
        assert!(adopted.len() >= MIN_ABSTRACT_LEN);
        assert!(!adopted.contains("  "));
        assert!(rec
            .refs
            .iter()
            .any(|r| r.reftype() == "en_abstract" && r.key_value() == adopted));
    }

    #[test]
    fn abstract_length_checked_after_normalization() {
        // Lots of whitespace, little content: must be rejected.
        let padded = format!("{}{}", "a ".repeat(10), " ".repeat(200));
        let rec = record_with_abstract(&padded);
        assert_eq!(rec.en_abstract, None);
    }

    #[test]
    fn titles_derived_from_title_refs() {
        let rec = PubRecord::new(
            PubType::Art,
            vec![Author::parse("John Smith")],
            None,
            vec![
                Ref::plain("en_title", "A Study."),
                Ref::plain("fr_title", "Une Étude"),
                Ref::plain("doi", "10.1/x"),
            ],
            None,
            None,
        );
        let titles = rec.titles();
        assert!(titles.contains("a study"));
        assert!(titles.contains("une étude"));
        assert_eq!(titles.len(), 2);
    }

    #[test]
    fn well_formedness() {
        let rec = PubRecord::new(PubType::Art, vec![], None, vec![], None, None);
        assert!(!rec.is_well_formed());
        let rec = PubRecord::new(
            PubType::Art,
            vec![Author::parse("John Smith")],
            None,
            vec![Ref::plain("doi", "10.1/x")],
            None,
            None,
        );
        assert!(rec.is_well_formed());
    }
}
