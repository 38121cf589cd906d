//! Text normalization helpers shared by the entity constructors.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// NFKD-decompose and drop combining marks: `"Müller"` → `"Muller"`.
pub fn strip_accents(input: &str) -> String {
    input.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Title casing by alphabetic runs: the first letter of every run is
/// uppercased, the rest lowercased. `"van der BERG"` → `"Van Der Berg"`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_alpha = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn normalize_ws(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate and normalize a PII (publisher item identifier).
///
/// Human-formatting separators `( ) - /` become spaces. The identifier is
/// accepted iff it carries exactly 17 significant characters and starts
/// with `S` or `B`; anything else is dropped as malformed.
pub fn clean_pii(pii: &str) -> Option<String> {
    let cleaned: String = pii
        .chars()
        .map(|c| match c {
            '(' | ')' | '-' | '/' => ' ',
            other => other,
        })
        .collect();
    let significant = cleaned.chars().filter(|c| *c != ' ').count();
    if significant == 17 && cleaned.starts_with(['S', 'B']) {
        Some(cleaned)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_accents_drops_combining_marks() {
        assert_eq!(strip_accents("Müller"), "Muller");
        assert_eq!(strip_accents("Bénédicte"), "Benedicte");
        assert_eq!(strip_accents("plain"), "plain");
    }

    #[test]
    fn title_case_per_alphabetic_run() {
        assert_eq!(title_case("van der berg"), "Van Der Berg");
        assert_eq!(title_case("JEAN-PIERRE"), "Jean-Pierre");
        assert_eq!(title_case("o'brien"), "O'Brien");
    }

    #[test]
    fn normalize_ws_collapses_runs() {
        assert_eq!(normalize_ws("  a \t b\n c "), "a b c");
    }

    #[test]
    fn pii_with_separators_accepted() {
        assert_eq!(
            clean_pii("S0140-6736(20)30183-5").as_deref(),
            Some("S0140 6736 20 30183 5")
        );
    }

    #[test]
    fn pii_compact_accepted() {
        assert_eq!(
            clean_pii("S0140673620301835").as_deref(),
            Some("S0140673620301835")
        );
    }

    #[test]
    fn pii_short_rejected() {
        assert_eq!(clean_pii("12345"), None);
    }

    #[test]
    fn pii_wrong_prefix_rejected() {
        assert_eq!(clean_pii("X0140673620301835"), None);
    }
}
