//! End-to-end behavior of the deduplicating store.

use std::collections::BTreeSet;

use bibweld_core::{
    Author, AddOutcome, PubDb, PubRecord, PubType, Pages, Ref,
};

fn record(
    pubtype: PubType,
    authors: Vec<Author>,
    refs: Vec<Ref>,
) -> PubRecord {
    PubRecord::new(pubtype, authors, None, refs, None, None)
}

/// Observable state of one publication, for order-insensitive comparison.
fn snapshot(db: &PubDb) -> Vec<(String, BTreeSet<String>, BTreeSet<String>, BTreeSet<String>)> {
    let mut out: Vec<_> = db
        .iter()
        .map(|(_, p)| {
            (
                p.pubtype.to_string(),
                p.refs
                    .iter()
                    .map(|&h| db.ref_key(h).to_string())
                    .collect::<BTreeSet<_>>(),
                p.authors
                    .iter()
                    .map(|&h| db.author_key(h).to_string())
                    .collect::<BTreeSet<_>>(),
                p.titles.clone(),
            )
        })
        .collect();
    out.sort();
    out
}

#[test]
fn merge_absorbs_initials_titles_and_pubtype() {
    // Two sources describe the same DOI; one knows the full first name
    // and the title, the other the document type.
    let mut db = PubDb::new();
    let a = db.add(record(
        PubType::Undefined,
        vec![Author::parse("John Smith")],
        vec![Ref::plain("doi", "10.x/1"), Ref::plain("en_title", "A Study")],
    ));
    let b = db.add(record(
        PubType::Art,
        vec![Author::new("Smith", None, Some("J"))],
        vec![Ref::plain("doi", "10.x/1")],
    ));

    assert!(matches!(a, AddOutcome::Created(_)));
    assert_eq!(b, AddOutcome::Merged(a.id()));
    assert_eq!(db.len(), 1);

    let publication = db.publication(a.id());
    assert_eq!(publication.pubtype, PubType::Art);
    assert_eq!(publication.refs.len(), 2);
    assert_eq!(publication.titles, BTreeSet::from(["a study".to_string()]));

    // One canonical author, with the initials absorbed into the richer form.
    assert_eq!(publication.authors.len(), 1);
    let author = db.author_key(*publication.authors.iter().next().unwrap());
    assert_eq!(author.lname, "Smith");
    assert_eq!(author.fname.as_deref(), Some("John"));
    assert_eq!(author.fname_initials.as_deref(), Some("J"));
}

#[test]
fn journal_ref_narrows_and_gains_issn_across_adds() {
    let mut db = PubDb::new();
    let authors = || vec![Author::parse("Jane Doe")];
    let first = db.add(record(
        PubType::Art,
        authors(),
        vec![Ref::journal(
            "Nature",
            None,
            Some("3"),
            Some("5"),
            Pages::parse("100-120"),
        )],
    ));
    let second = db.add(record(
        PubType::Art,
        authors(),
        vec![Ref::journal(
            "Nature",
            Some("0028-0836"),
            Some("3"),
            Some("5"),
            Pages::parse("105-110"),
        )],
    ));
    assert_eq!(second, AddOutcome::Merged(first.id()));

    let publication = db.publication(first.id());
    assert_eq!(publication.refs.len(), 1);
    let merged = db.ref_key(*publication.refs.iter().next().unwrap());
    match merged {
        Ref::Journal(j) => {
            assert_eq!(j.pages, Pages::parse("105-110"));
            assert_eq!(j.issn.as_deref(), Some("0028-0836"));
        }
        other => panic!("expected a journal ref, got {other}"),
    }
}

#[test]
fn title_in_another_language_is_not_a_shared_ref() {
    // Same title text under different reftypes: the title sets intersect
    // but no ref is shared, so these stay distinct.
    let mut db = PubDb::new();
    db.add(record(
        PubType::Art,
        vec![Author::parse("John Smith")],
        vec![
            Ref::plain("doi", "10.x/a"),
            Ref::plain("en_title", "Shared Words"),
        ],
    ));
    db.add(record(
        PubType::Art,
        vec![Author::parse("John Smith")],
        vec![
            Ref::plain("doi", "10.x/b"),
            Ref::plain("fr_title", "Shared Words"),
        ],
    ));
    assert_eq!(db.len(), 2);
}

#[test]
fn shared_title_ref_merges_despite_different_authors() {
    let mut db = PubDb::new();
    let first = db.add(record(
        PubType::Art,
        vec![Author::parse("John Smith")],
        vec![
            Ref::plain("doi", "10.x/a"),
            Ref::plain("en_title", "Shared Words"),
        ],
    ));
    let second = db.add(record(
        PubType::Art,
        vec![Author::parse("Jane Doe")],
        vec![
            Ref::plain("doi", "10.x/b"),
            Ref::plain("en_title", "Shared Words."),
        ],
    ));
    assert_eq!(second, AddOutcome::Merged(first.id()));
    assert_eq!(db.publication(first.id()).authors.len(), 2);
}

#[test]
fn one_shared_identifier_with_nothing_else_in_common_stays_split() {
    // A single DOI collision with disjoint authors and disjoint titles is
    // treated as source noise.
    let mut db = PubDb::new();
    db.add(record(
        PubType::Art,
        vec![Author::parse("John Smith")],
        vec![Ref::plain("doi", "10.x/1"), Ref::plain("en_title", "Alpha")],
    ));
    db.add(record(
        PubType::Art,
        vec![Author::parse("Jane Doe")],
        vec![Ref::plain("doi", "10.x/1"), Ref::plain("en_title", "Beta")],
    ));
    assert_eq!(db.len(), 2);
}

#[test]
fn two_shared_hard_identifiers_merge_without_publication_equality() {
    let mut db = PubDb::new();
    let first = db.add(record(
        PubType::Art,
        vec![Author::parse("John Smith")],
        vec![
            Ref::plain("doi", "10.x/1"),
            Ref::plain("pubmed", "999"),
            Ref::plain("en_title", "Alpha"),
        ],
    ));
    let second = db.add(record(
        PubType::Art,
        vec![Author::parse("Jane Doe")],
        vec![
            Ref::plain("doi", "10.x/1"),
            Ref::plain("pubmed", "999"),
            Ref::plain("en_title", "Beta"),
        ],
    ));
    assert_eq!(second, AddOutcome::Merged(first.id()));
    let publication = db.publication(first.id());
    assert_eq!(publication.authors.len(), 2);
    assert!(publication.titles.contains("alpha"));
    assert!(publication.titles.contains("beta"));
}

#[test]
fn overlap_with_two_pubs_merges_into_the_equal_one() {
    let mut db = PubDb::new();
    let r1 = vec![Ref::plain("doi", "10.x/a"), Ref::plain("pubmed", "1")];
    let r2 = vec![Ref::plain("doi", "10.x/b"), Ref::plain("pubmed", "2")];
    let p1 = db
        .add(record(PubType::Art, vec![Author::parse("John Smith")], r1.clone()))
        .id();
    let p2 = db
        .add(record(PubType::Art, vec![Author::parse("Jane Doe")], r2.clone()))
        .id();

    // The new record spans both ref sets but carries the first one's
    // authors; whichever order its refs come in, it lands on the first.
    let mut spanning: Vec<Ref> = r2.clone();
    spanning.extend(r1.clone());
    let outcome = db.add(record(
        PubType::Art,
        vec![Author::parse("John Smith")],
        spanning,
    ));
    assert_eq!(outcome, AddOutcome::Merged(p1));

    // The second publication is untouched.
    let second = db.publication(p2);
    assert_eq!(second.refs.len(), 2);
    assert_eq!(second.authors.len(), 1);
    assert_eq!(db.len(), 2);
}

#[test]
fn add_is_idempotent() {
    let make = || {
        record(
            PubType::Art,
            vec![Author::parse("John Smith")],
            vec![
                Ref::plain("doi", "10.x/1"),
                Ref::plain("en_title", "A Study"),
                Ref::journal("Nature", None, Some("3"), Some("5"), Pages::parse("100-120")),
            ],
        )
    };
    let mut db = PubDb::new();
    db.add(make());
    let once = snapshot(&db);
    db.add(make());
    assert_eq!(snapshot(&db), once);
}

#[test]
fn merge_commutes_for_equivalent_records() {
    let p = || {
        PubRecord::new(
            PubType::Undefined,
            vec![Author::parse("John Smith")],
            None,
            vec![Ref::plain("doi", "10.x/1"), Ref::plain("en_title", "A Study")],
            Some(
                "An abstract long enough to be adopted by the record constructor, \
                 padded out well past the hundred character minimum.",
            ),
            None,
        )
    };
    let q = || {
        PubRecord::new(
            PubType::Art,
            vec![Author::new("Smith", None, Some("J"))],
            None,
            vec![Ref::plain("doi", "10.x/1"), Ref::plain("fr_title", "Une Etude")],
            None,
            None,
        )
    };

    let mut ab = PubDb::new();
    ab.add(p());
    ab.add(q());
    let mut ba = PubDb::new();
    ba.add(q());
    ba.add(p());

    assert_eq!(snapshot(&ab), snapshot(&ba));
    let (_, publication) = ab.iter().next().unwrap();
    let (_, other) = ba.iter().next().unwrap();
    assert_eq!(publication.en_abstract, other.en_abstract);
    assert_eq!(publication.pubtype, other.pubtype);
}

#[test]
fn observable_state_grows_monotonically() {
    let mut db = PubDb::new();
    let id = db
        .add(record(
            PubType::Undefined,
            vec![Author::parse("John Smith")],
            vec![Ref::plain("doi", "10.x/1")],
        ))
        .id();

    let before = db.publication(id).clone();
    db.add(record(
        PubType::Art,
        vec![Author::parse("John Smith")],
        vec![Ref::plain("doi", "10.x/1"), Ref::plain("pubmed", "42")],
    ));
    let after = db.publication(id);

    assert!(after.refs.is_superset(&before.refs));
    assert!(after.authors.is_superset(&before.authors));
    assert!(after.titles.is_superset(&before.titles));
    assert!(after.pubtype.priority() >= before.pubtype.priority());
}

#[test]
fn added_refs_and_authors_become_canonical() {
    let mut db = PubDb::new();
    let refs = vec![
        Ref::plain("doi", "10.x/1"),
        Ref::journal("Nature", None, Some("3"), Some("5"), Pages::parse("100-120")),
    ];
    let authors = vec![Author::parse("John Smith")];
    let id = db.add(record(PubType::Art, authors.clone(), refs.clone())).id();

    let publication = db.publication(id);
    for r in &refs {
        let handle = db.find_ref(r).expect("ref must be indexed");
        assert!(publication.refs.contains(&handle));
        assert_eq!(db.ref_owner(handle), id);
    }
    for a in &authors {
        let handle = db.find_author(a).expect("author must be indexed");
        assert!(publication.authors.contains(&handle));
    }
    assert_eq!(db.author_pubs(&Author::parse("John Smith")), vec![id]);
}
