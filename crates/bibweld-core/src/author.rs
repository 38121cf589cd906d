//! Author names: normalization, last-name-gated matching, merge.

use std::hash::{Hash, Hasher};

use crate::lattice::LatticeKey;
use crate::text::{strip_accents, title_case};

/// Tokens that carry no identifying information in a given-name string.
const HONORIFICS: [&str; 3] = ["Mr", "Mme", "Mrs"];

/// Last-name prefixes. Once one appears in the given-name token stream,
/// it and every subsequent token belong to the last name.
const PARTICLES: [&str; 9] = ["De", "Da", "Le", "El", "Van", "Del", "Von", "Zu", "Of"];

/// A normalized author name.
///
/// `lname` is always present; the given name may be known in full
/// (`fname`), only as initials (`fname_initials`), both, or not at all.
/// Two records for the same person routinely disagree on how much of the
/// given name they carry, which is why matching is last-name-gated and
/// merging keeps the richer form.
#[derive(Debug, Clone)]
pub struct Author {
    pub lname: String,
    pub fname: Option<String>,
    pub fname_initials: Option<String>,
}

impl Author {
    /// Build from separate fields, as biomedical records supply them.
    pub fn new(lname: &str, fname: Option<&str>, fname_initials: Option<&str>) -> Author {
        let mut lname = scrub(lname);
        let mut fname = fname.map(str::to_string);

        if fname.is_none() {
            if let Some((last, given)) = lname.split_once(',') {
                // "Last, First" form
                let (last, given) = (last.trim().to_string(), given.trim().to_string());
                lname = last;
                if !given.is_empty() {
                    fname = Some(given);
                }
            } else if let Some((given, last)) = lname.rsplit_once(' ') {
                // The last name is usually the single trailing token; the
                // rest is the (possibly multi-part) given name.
                let (given, last) = (given.to_string(), last.to_string());
                lname = last;
                fname = Some(given);
            }
        }

        lname = title_case(&strip_accents(&lname));

        let mut fname_out = None;
        let mut derived_initials = String::new();
        if let Some(given) = fname {
            let given = title_case(&strip_accents(&given)).replace('-', " ");
            let mut in_fname = true;
            let mut fname_parts: Vec<&str> = Vec::new();
            let mut lname_parts: Vec<&str> = Vec::new();
            for token in given.split(' ') {
                if HONORIFICS.contains(&token) {
                    continue;
                }
                let Some(initial) = token.chars().next() else {
                    continue;
                };
                if token.chars().count() == 1 {
                    derived_initials.push(initial);
                    continue;
                }
                if PARTICLES.contains(&token) {
                    in_fname = false;
                }
                if in_fname {
                    derived_initials.push(initial);
                    fname_parts.push(token);
                } else {
                    lname_parts.push(token);
                }
            }
            if !fname_parts.is_empty() {
                fname_out = Some(fname_parts.join(" "));
            }
            if !lname_parts.is_empty() {
                lname = format!("{} {}", lname_parts.join(" "), lname);
            }
        }

        let fname_initials = match fname_initials {
            Some(explicit) if !explicit.trim().is_empty() => Some(explicit.trim().to_string()),
            Some(_) => None,
            None if !derived_initials.is_empty() => Some(derived_initials),
            None => None,
        };

        Author {
            lname,
            fname: fname_out,
            fname_initials,
        }
    }

    /// Build from a single free-form name string, as open-archive
    /// records supply them (`"Jan Van Der Berg"`, `"Van Der Berg, Jan"`).
    pub fn parse(full_name: &str) -> Author {
        Author::new(full_name, None, None)
    }

    /// Rebuild from already-normalized parts (a persisted mirror). No
    /// inference: a multi-word `lname` stays a last name.
    pub fn from_parts(
        lname: String,
        fname: Option<String>,
        fname_initials: Option<String>,
    ) -> Author {
        Author {
            lname,
            fname,
            fname_initials,
        }
    }

    /// True when two authors plausibly denote the same person: equal last
    /// names, and compatible given-name information. Not transitive —
    /// initials `"JC"` match both `"J"` and `"C"`.
    pub fn matches(&self, other: &Author) -> bool {
        if self.lname != other.lname {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.fname, &other.fname) {
            return a == b || a.split(' ').any(|t| b.split(' ').any(|u| t == u));
        }
        if let (Some(a), Some(b)) = (&self.fname_initials, &other.fname_initials) {
            return a.chars().any(|c| b.contains(c));
        }
        self.fname.is_none()
            && self.fname_initials.is_none()
            && other.fname.is_none()
            && other.fname_initials.is_none()
    }

    /// Absorb the richer given-name information from `other`.
    pub fn absorb(&mut self, other: &Author) {
        if self.fname == other.fname && self.fname_initials == other.fname_initials {
            return;
        }
        log::debug!("merging author {} <- {}", self, other);
        match (&self.fname, &other.fname) {
            (None, Some(_)) => self.fname = other.fname.clone(),
            (Some(mine), Some(theirs)) => {
                if token_count(theirs) > token_count(mine) {
                    self.fname = other.fname.clone();
                }
            }
            _ => {}
        }
        match (&self.fname_initials, &other.fname_initials) {
            (None, Some(_)) => self.fname_initials = other.fname_initials.clone(),
            (Some(mine), Some(theirs)) => {
                if theirs.len() > mine.len() {
                    self.fname_initials = other.fname_initials.clone();
                }
            }
            _ => {}
        }
    }
}

fn token_count(name: &str) -> usize {
    name.split(' ').filter(|t| !t.is_empty()).count()
}

/// Replace formatting punctuation with spaces and collapse runs.
fn scrub(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '(' | ')' | '-' | '/' => ' ',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fname) = &self.fname {
            write!(f, "{} {}", fname, self.lname)
        } else if let Some(initials) = &self.fname_initials {
            write!(f, "{}. {}", initials, self.lname)
        } else {
            write!(f, "{}", self.lname)
        }
    }
}

impl LatticeKey for Author {
    fn bucket_hash<H: Hasher>(&self, state: &mut H) {
        // Last name only: equal authors may disagree on everything else.
        self.lname.hash(state);
    }

    fn same_key(&self, other: &Self) -> bool {
        self.matches(other)
    }

    fn merge(&mut self, other: &Self) {
        self.absorb(other);
    }
}
