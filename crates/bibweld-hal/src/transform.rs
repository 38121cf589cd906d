//! Build publication records from archive search documents.
//!
//! The interesting part is the identifier sweep: any field named
//! `<kind>Id_s` is a stable identifier of kind `<kind>`, and any
//! `<lang>_title_s` is a title in that language. The field set is open,
//! so the document is walked as a JSON object rather than deserialized
//! into a fixed struct.

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use bibweld_core::{clean_pii, Author, Pages, PubRecord, PubType, Ref};

/// Identifier fields that name funding calls, not the document.
const EXCLUDED_ID_FIELDS: &[&str] = &["europeanProjectCallId_s"];

pub fn doc_to_record(doc: &Map<String, Value>) -> PubRecord {
    let refs = collect_refs(doc);

    let authors: Vec<Author> = strings(doc.get("authFullName_s"))
        .into_iter()
        .map(Author::parse)
        .collect();

    let date = doc
        .get("producedDate_tdate")
        .and_then(Value::as_str)
        .and_then(parse_date);

    let pubtype = doc
        .get("docType_s")
        .and_then(Value::as_str)
        .map(PubType::parse)
        .unwrap_or(PubType::Undefined);

    let en_abstract = joined(doc.get("en_abstract_s"));
    let fr_abstract = joined(doc.get("fr_abstract_s"));

    PubRecord::new(
        pubtype,
        authors,
        date,
        refs,
        en_abstract.as_deref(),
        fr_abstract.as_deref(),
    )
}

fn collect_refs(doc: &Map<String, Value>) -> Vec<Ref> {
    let mut refs = Vec::new();

    for (key, value) in doc {
        if let Some(kind) = key.strip_suffix("Id_s") {
            if EXCLUDED_ID_FIELDS.contains(&key.as_str()) {
                continue;
            }
            for id in strings(Some(value)) {
                if kind == "pii" {
                    match clean_pii(id) {
                        Some(pii) => refs.push(Ref::plain("pii", &pii)),
                        None => log::debug!("dropping malformed pii {id:?}"),
                    }
                } else {
                    refs.push(Ref::plain(kind, id));
                }
            }
        } else if key.ends_with("_title_s") {
            let reftype = &key[..key.len() - 2];
            for title in strings(Some(value)) {
                refs.push(Ref::plain(reftype, title));
            }
        }
    }

    if let Some(pages) = doc.get("page_s").and_then(Value::as_str) {
        let issues = strings(doc.get("issue_s"));
        if let Some(journal) = doc.get("journalTitle_s").and_then(Value::as_str) {
            let issn = doc.get("journalEissn_s").and_then(Value::as_str);
            let volume = doc.get("volume_s").and_then(Value::as_str);
            for &issue in &issues {
                refs.push(Ref::journal(
                    journal,
                    issn,
                    Some(issue),
                    volume,
                    Pages::parse(pages),
                ));
            }
        }

        let book_title = doc
            .get("conferenceTitle_s")
            .and_then(Value::as_str)
            .or_else(|| doc.get("bookTitle_s").and_then(Value::as_str));
        if let Some(title) = book_title {
            let isbn = doc.get("isbn_s").and_then(Value::as_str);
            refs.push(Ref::book(title, isbn, Pages::parse(pages)));
        }
    }

    refs
}

/// A string field or an array of strings, flattened.
fn strings(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Abstract fields arrive as arrays of paragraphs; join them.
fn joined(value: Option<&Value>) -> Option<String> {
    let parts = strings(value);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok())
}
