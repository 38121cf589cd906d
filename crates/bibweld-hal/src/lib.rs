//! Open-archive (HAL) search adapter: one JSON query per author.

use anyhow::{Context, Result};
use url::Url;

use bibweld_core::{Author, Fetcher, PubRecord};

pub mod transform;

pub use transform::doc_to_record;

const SEARCH_URL: &str = "https://api.archives-ouvertes.fr/search/";

/// Fields requested from the search API. Everything the record builder
/// consumes, nothing more.
const FIELDS: &[&str] = &[
    "authFullName_s",
    "producedDate_tdate",
    "*_abstract_s",
    "language_s",
    // Identification
    "*_title_s",
    "*Id_s",
    "isbn_s",
    "bookTitle_s",
    "docType_s",
    // Journal
    "journalTitle_s",
    "journalEissn_s",
    "issue_s",
    "volume_s",
    "page_s",
];

/// Fetch every publication the archive attributes to `author`.
pub fn author_search(fetcher: &mut dyn Fetcher, author: &Author) -> Result<Vec<PubRecord>> {
    let query = format!("authFullName_t:{author}");
    let fields = FIELDS.join(",");
    let url = Url::parse_with_params(
        SEARCH_URL,
        &[
            ("q", query.as_str()),
            ("fl", fields.as_str()),
            ("wt", "json"),
            ("rows", "10000"),
        ],
    )?;

    let body = fetcher.get(url.as_str())?;
    let response: serde_json::Value =
        serde_json::from_slice(&body).context("archive search: invalid JSON")?;
    let Some(docs) = response["response"]["docs"].as_array() else {
        log::warn!("archive search: unexpected response shape: {response}");
        return Ok(Vec::new());
    };

    log::info!("{author}: {} archive hits", docs.len());
    Ok(docs
        .iter()
        .filter_map(|doc| doc.as_object())
        .map(doc_to_record)
        .collect())
}
