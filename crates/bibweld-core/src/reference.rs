//! Publication references: stable identifiers and pagination-based soft
//! identifiers, with the merge rules that let partial records refine each
//! other.

use std::hash::{Hash, Hasher};

use crate::lattice::LatticeKey;

/// Start of a page range. Free-form page strings that carry digits but no
/// parseable integer ("e100137", "12 suppl") are kept verbatim as weak
/// evidence rather than discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStart {
    Num(u32),
    Raw(String),
}

/// A (possibly partial) page range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pages {
    pub start: Option<PageStart>,
    pub end: Option<u32>,
}

impl Pages {
    pub fn none() -> Pages {
        Pages::default()
    }

    /// Parse a free-form page string.
    ///
    /// En-dashes and spaces count as range separators. One integer gives a
    /// bare start; two give a range when ordered, otherwise only the
    /// start is trusted. A string with digits but no clean integers is
    /// kept raw. A parsed start page of 1 means "starts at the beginning"
    /// and carries no information, so it becomes `None`.
    pub fn parse(pages: &str) -> Pages {
        if pages.is_empty() {
            return Pages::none();
        }
        let normalized = pages.replace('\u{2013}', "-").replace(' ', "-");
        let tokens: Vec<&str> = normalized.split('-').filter(|t| !t.is_empty()).collect();
        let ints: Result<Vec<u32>, _> = tokens.iter().map(|t| t.parse::<u32>()).collect();

        let raw_or_none = || {
            if normalized.chars().any(|c| c.is_ascii_digit()) {
                Pages {
                    start: Some(PageStart::Raw(normalized.clone())),
                    end: None,
                }
            } else {
                Pages::none()
            }
        };

        let mut parsed = match ints {
            Err(_) => raw_or_none(),
            Ok(ints) => match ints[..] {
                [] => raw_or_none(),
                [start] => Pages {
                    start: Some(PageStart::Num(start)),
                    end: None,
                },
                [start, end] if start <= end => Pages {
                    start: Some(PageStart::Num(start)),
                    end: Some(end),
                },
                [start, _] => Pages {
                    start: Some(PageStart::Num(start)),
                    end: None,
                },
                // More than two numbers: untrustworthy, keep raw.
                _ => Pages {
                    start: Some(PageStart::Raw(normalized.clone())),
                    end: None,
                },
            },
        };
        if parsed.start == Some(PageStart::Num(1)) {
            parsed.start = None;
        }
        parsed
    }

    pub fn start_num(&self) -> Option<u32> {
        match self.start {
            Some(PageStart::Num(n)) => Some(n),
            _ => None,
        }
    }

    /// Whether `self` lies within `other`. `None` when any bound is
    /// missing or raw: inclusion is untestable.
    fn included_in(&self, other: &Pages) -> Option<bool> {
        let (s1, e1) = (self.start_num()?, self.end?);
        let (s2, e2) = (other.start_num()?, other.end?);
        Some(s1 >= s2 && e1 <= e2)
    }

    fn start_eq(&self, other: &Pages) -> Option<bool> {
        // Integer starts only. Two raw free-form strings agreeing is a
        // textual coincidence, not evidence of identity.
        match (&self.start, &other.start) {
            (Some(PageStart::Num(a)), Some(PageStart::Num(b))) => Some(a == b),
            _ => None,
        }
    }

    fn end_eq(&self, other: &Pages) -> Option<bool> {
        match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a == b),
            _ => None,
        }
    }

    /// Compatible page ranges: one contains the other, or an endpoint
    /// agrees outright.
    pub fn compatible(&self, other: &Pages) -> bool {
        if self.included_in(other) == Some(true) || other.included_in(self) == Some(true) {
            return true;
        }
        self.start_eq(other) == Some(true) || self.end_eq(other) == Some(true)
    }

    /// Fill missing bounds from `other`; when both ranges are complete,
    /// keep the narrower contained one.
    pub fn absorb(&mut self, other: &Pages) {
        let no_start = self.start.is_none();
        let no_end = self.end.is_none();
        if no_start || no_end {
            if no_start {
                self.start = other.start.clone();
            }
            if no_end {
                if let (Some(start), Some(end)) = (self.start_num(), other.end) {
                    if start <= end {
                        self.end = Some(end);
                    }
                }
            }
        } else if self != other && other.included_in(self) == Some(true) {
            self.start = other.start.clone();
            self.end = other.end;
        }
    }
}

impl std::fmt::Display for Pages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.start, self.end) {
            (Some(PageStart::Num(s)), Some(e)) => write!(f, "p{s}-{e}"),
            (Some(PageStart::Num(s)), None) => write!(f, "p{s}"),
            (Some(PageStart::Raw(raw)), _) => write!(f, "p{raw:?}"),
            (None, Some(e)) => write!(f, "p?-{e}"),
            (None, None) => write!(f, "p?"),
        }
    }
}

/// A journal issue identified by title, issue, volume and pagination.
#[derive(Debug, Clone)]
pub struct JournalRef {
    pub title: String,
    pub issn: Option<String>,
    pub issue: Option<String>,
    pub volume: Option<String>,
    pub pages: Pages,
}

/// A book or conference proceedings identified by title and pagination.
#[derive(Debug, Clone)]
pub struct BookRef {
    pub title: String,
    pub isbn: Option<String>,
    pub pages: Pages,
}

/// A publication reference.
///
/// `Plain` covers stable identifiers (`doi`, `pubmed`, `pii`, `hal`, ...)
/// as well as normalized titles and adopted abstracts. `Journal` and
/// `Book` are softer: their identity is the container title, and their
/// pagination only has to be compatible, not equal.
#[derive(Debug, Clone)]
pub enum Ref {
    Plain { reftype: String, value: String },
    Journal(JournalRef),
    Book(BookRef),
}

/// Strip the trailing dots and spaces titles accumulate, and lowercase.
fn norm_title(title: &str) -> String {
    title
        .trim_start()
        .trim_end_matches(['.', ' '])
        .to_lowercase()
}

fn norm_opt(value: Option<&str>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

impl Ref {
    pub fn plain(reftype: &str, value: &str) -> Ref {
        let value = if reftype.ends_with("title") {
            norm_title(value)
        } else {
            value.to_string()
        };
        Ref::Plain {
            reftype: reftype.to_string(),
            value,
        }
    }

    pub fn journal(
        title: &str,
        issn: Option<&str>,
        issue: Option<&str>,
        volume: Option<&str>,
        pages: Pages,
    ) -> Ref {
        Ref::Journal(JournalRef {
            title: norm_title(title),
            issn: norm_opt(issn),
            issue: norm_opt(issue),
            volume: norm_opt(volume),
            pages,
        })
    }

    pub fn book(title: &str, isbn: Option<&str>, pages: Pages) -> Ref {
        Ref::Book(BookRef {
            title: norm_title(title),
            isbn: norm_opt(isbn),
            pages,
        })
    }

    pub fn reftype(&self) -> &str {
        match self {
            Ref::Plain { reftype, .. } => reftype,
            Ref::Journal(_) => "journal",
            Ref::Book(_) => "book",
        }
    }

    /// The identifying string: the identifier value, or the container
    /// title for journal/book refs.
    pub fn key_value(&self) -> &str {
        match self {
            Ref::Plain { value, .. } => value,
            Ref::Journal(j) => &j.title,
            Ref::Book(b) => &b.title,
        }
    }

    /// A title ref carries a publication title as its value.
    pub fn is_title(&self) -> bool {
        matches!(self, Ref::Plain { reftype, .. } if reftype.ends_with("_title"))
    }

    /// Strong evidence of identity: any stable identifier, or a
    /// paginated ref with a parsed integer start page.
    pub fn is_hard(&self) -> bool {
        match self {
            Ref::Plain { .. } => true,
            Ref::Journal(j) => j.pages.start_num().is_some(),
            Ref::Book(b) => b.pages.start_num().is_some(),
        }
    }
}

impl LatticeKey for Ref {
    fn bucket_hash<H: Hasher>(&self, state: &mut H) {
        // (reftype, identifying value) only: two compatible paginated
        // refs with different page ranges must land in the same bucket.
        self.reftype().hash(state);
        self.key_value().hash(state);
    }

    fn same_key(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Ref::Plain { reftype, value },
                Ref::Plain {
                    reftype: rt,
                    value: v,
                },
            ) => reftype == rt && value == v,
            (Ref::Journal(a), Ref::Journal(b)) => {
                a.title == b.title
                    && a.pages.compatible(&b.pages)
                    && a.issue == b.issue
                    && a.volume == b.volume
                    && match (&a.issn, &b.issn) {
                        (Some(x), Some(y)) => x == y,
                        _ => true,
                    }
            }
            (Ref::Book(a), Ref::Book(b)) => {
                a.title == b.title
                    && a.pages.compatible(&b.pages)
                    && match (&a.isbn, &b.isbn) {
                        (Some(x), Some(y)) => x == y,
                        _ => true,
                    }
            }
            _ => false,
        }
    }

    fn merge(&mut self, other: &Self) {
        match (self, other) {
            (Ref::Journal(a), Ref::Journal(b)) => {
                a.pages.absorb(&b.pages);
                if a.issn.is_none() {
                    a.issn = b.issn.clone();
                }
            }
            (Ref::Book(a), Ref::Book(b)) => {
                a.pages.absorb(&b.pages);
                if a.isbn.is_none() {
                    a.isbn = b.isbn.clone();
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ref::Plain { reftype, value } => write!(f, "{reftype} {value:?}"),
            Ref::Journal(j) => {
                write!(f, "journal {:?} {}", j.title, j.pages)?;
                if let Some(issn) = &j.issn {
                    write!(f, " issn:{issn}")?;
                }
                if let Some(issue) = &j.issue {
                    write!(f, " issue:{issue}")?;
                }
                if let Some(volume) = &j.volume {
                    write!(f, " volume:{volume}")?;
                }
                Ok(())
            }
            Ref::Book(b) => {
                write!(f, "book {:?} {}", b.title, b.pages)?;
                if let Some(isbn) = &b.isbn {
                    write!(f, " isbn:{isbn}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_refs_are_normalized() {
        let r = Ref::plain("en_title", "  A Study of Things.. ");
        match r {
            Ref::Plain { value, .. } => assert_eq!(value, "a study of things"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn non_title_values_kept_verbatim() {
        let r = Ref::plain("doi", "10.1016/J.Example");
        assert_eq!(r.key_value(), "10.1016/J.Example");
    }

    #[test]
    fn pages_single_and_range() {
        assert_eq!(
            Pages::parse("117"),
            Pages {
                start: Some(PageStart::Num(117)),
                end: None
            }
        );
        assert_eq!(
            Pages::parse("100-120"),
            Pages {
                start: Some(PageStart::Num(100)),
                end: Some(120)
            }
        );
        // En-dash and space separators
        assert_eq!(Pages::parse("100\u{2013}120"), Pages::parse("100 120"));
    }

    #[test]
    fn pages_inverted_range_keeps_only_start() {
        assert_eq!(
            Pages::parse("117-26"),
            Pages {
                start: Some(PageStart::Num(117)),
                end: None
            }
        );
    }

    #[test]
    fn pages_start_one_means_unknown() {
        assert_eq!(
            Pages::parse("1-12"),
            Pages {
                start: None,
                end: Some(12)
            }
        );
        assert_eq!(Pages::parse("1"), Pages::none());
    }

    #[test]
    fn pages_soft_and_empty_forms() {
        assert_eq!(
            Pages::parse("e100137"),
            Pages {
                start: Some(PageStart::Raw("e100137".to_string())),
                end: None
            }
        );
        assert_eq!(Pages::parse("np"), Pages::none());
        assert_eq!(Pages::parse(""), Pages::none());
    }

    #[test]
    fn pages_inclusion_makes_ranges_compatible() {
        let wide = Pages::parse("100-120");
        let narrow = Pages::parse("105-110");
        assert!(wide.compatible(&narrow));
        assert!(narrow.compatible(&wide));
        let disjoint = Pages::parse("200-210");
        assert!(!wide.compatible(&disjoint));
    }

    #[test]
    fn equal_raw_starts_are_not_evidence() {
        // Both sides carry the same unparseable page string; that is not
        // an integer match and must not make the ranges compatible.
        let a = Pages::parse("e100137");
        let b = Pages::parse("e100137");
        assert_eq!(a, b);
        assert!(!a.compatible(&b));
    }

    #[test]
    fn pages_endpoint_match_is_enough() {
        let a = Pages::parse("100-120");
        let b = Pages::parse("100");
        assert!(a.compatible(&b));
        let c = Pages {
            start: None,
            end: Some(120),
        };
        assert!(a.compatible(&c));
    }

    #[test]
    fn pages_absorb_fills_missing_bounds() {
        let mut a = Pages::parse("100");
        a.absorb(&Pages::parse("100-120"));
        assert_eq!(a, Pages::parse("100-120"));
    }

    #[test]
    fn pages_absorb_keeps_narrower_contained_range() {
        let mut wide = Pages::parse("100-120");
        wide.absorb(&Pages::parse("105-110"));
        assert_eq!(wide, Pages::parse("105-110"));

        // A non-contained range changes nothing.
        let mut a = Pages::parse("100-120");
        a.absorb(&Pages::parse("90-130"));
        assert_eq!(a, Pages::parse("100-120"));
    }

    #[test]
    fn journal_identity_requires_issue_and_volume() {
        let a = Ref::journal("Nature", None, Some("3"), Some("5"), Pages::parse("100-120"));
        let b = Ref::journal("Nature", None, Some("3"), Some("5"), Pages::parse("105-110"));
        assert!(a.same_key(&b));
        let c = Ref::journal("Nature", None, Some("4"), Some("5"), Pages::parse("105-110"));
        assert!(!a.same_key(&c));
    }

    #[test]
    fn journal_issn_gate() {
        let a = Ref::journal(
            "Nature",
            Some("0028-0836"),
            Some("3"),
            Some("5"),
            Pages::parse("100-120"),
        );
        let b = Ref::journal(
            "Nature",
            Some("1476-4687"),
            Some("3"),
            Some("5"),
            Pages::parse("100-120"),
        );
        assert!(!a.same_key(&b));
        // One side without an ISSN is compatible.
        let c = Ref::journal("Nature", None, Some("3"), Some("5"), Pages::parse("100-120"));
        assert!(a.same_key(&c));
    }

    #[test]
    fn journal_merge_narrows_and_fills_issn() {
        let mut a = Ref::journal("Nature", None, Some("3"), Some("5"), Pages::parse("100-120"));
        let b = Ref::journal(
            "Nature",
            Some("0028-0836"),
            Some("3"),
            Some("5"),
            Pages::parse("105-110"),
        );
        assert!(a.same_key(&b));
        a.merge(&b);
        match a {
            Ref::Journal(j) => {
                assert_eq!(j.pages, Pages::parse("105-110"));
                assert_eq!(j.issn.as_deref(), Some("0028-0836"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn book_isbn_gate_and_fill() {
        let a = Ref::book("Proc. Conf", Some("978-0"), Pages::parse("10-20"));
        let b = Ref::book("Proc. Conf", Some("978-1"), Pages::parse("10-20"));
        assert!(!a.same_key(&b));

        let mut bare = Ref::book("Proc. Conf", None, Pages::parse("10-20"));
        assert!(bare.same_key(&a));
        bare.merge(&a);
        match bare {
            Ref::Book(book) => assert_eq!(book.isbn.as_deref(), Some("978-0")),
            _ => unreachable!(),
        }
    }

    #[test]
    fn hard_refs() {
        assert!(Ref::plain("doi", "10.1/x").is_hard());
        assert!(Ref::journal("J", None, None, None, Pages::parse("105-110")).is_hard());
        assert!(!Ref::journal("J", None, None, None, Pages::parse("e1234")).is_hard());
        assert!(!Ref::book("B", None, Pages::none()).is_hard());
    }

    #[test]
    fn different_variants_never_match() {
        let j = Ref::journal("X", None, None, None, Pages::none());
        let b = Ref::book("X", None, Pages::none());
        assert!(!j.same_key(&b));
    }
}
