//! PubMed E-utilities adapter: a two-stage search (esearch for PMIDs,
//! efetch for the article XML) producing publication records.

use anyhow::{Context, Result};
use url::Url;

use bibweld_core::{Author, Fetcher, PubRecord};

pub mod parser;
pub mod transform;

pub use parser::{parse_pubmed_xml, PubmedArticle};
pub use transform::to_record;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Beyond this many hits the name is too common to attribute safely.
const MAX_RESULTS: u64 = 400;

/// E-utilities search term for an author, using the most specific field
/// the name supports.
fn author_term(author: &Author) -> String {
    if let Some(fname) = &author.fname {
        format!("{}, {}[FAU]", author.lname, fname)
    } else if let Some(initials) = &author.fname_initials {
        format!("{} {}[AU]", author.lname, initials)
    } else {
        format!("{}[AU]", author.lname)
    }
}

/// Search for PMIDs matching an author.
pub fn esearch(fetcher: &mut dyn Fetcher, author: &Author) -> Result<Vec<String>> {
    let term = author_term(author);
    let url = Url::parse_with_params(
        ESEARCH_URL,
        &[
            ("term", term.as_str()),
            ("retmode", "json"),
            ("retmax", "1000"),
        ],
    )?;
    let body = fetcher.get(url.as_str())?;
    let response: serde_json::Value =
        serde_json::from_slice(&body).context("esearch: invalid JSON")?;
    let result = &response["esearchresult"];

    let count: u64 = result["count"]
        .as_str()
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    if count >= MAX_RESULTS {
        log::warn!("skipping {term:?}, having {count} results");
        return Ok(Vec::new());
    }

    Ok(result["idlist"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

/// Fetch one article by PMID. `None` when the payload carries no
/// `PubmedArticle` (books are not handled).
pub fn efetch(fetcher: &mut dyn Fetcher, pmid: &str) -> Result<Option<PubRecord>> {
    let url = Url::parse_with_params(
        EFETCH_URL,
        &[("id", pmid), ("db", "pubmed"), ("retmode", "xml")],
    )?;
    let body = fetcher.get(url.as_str())?;
    let xml = String::from_utf8_lossy(&body);
    let articles = parse_pubmed_xml(&xml).with_context(|| format!("efetch {pmid}"))?;
    Ok(articles.into_iter().next().map(to_record))
}

/// Fetch every publication attributable to `author`: search, fetch each
/// hit, and keep the records whose author list contains the query.
pub fn author_search(fetcher: &mut dyn Fetcher, author: &Author) -> Result<Vec<PubRecord>> {
    let pmids = esearch(fetcher, author)?;
    log::info!("{author}: {} PubMed hits", pmids.len());

    let mut records = Vec::new();
    for pmid in &pmids {
        match efetch(fetcher, pmid)? {
            Some(record) if record.authors.iter().any(|a| a.matches(author)) => {
                records.push(record);
            }
            Some(_) => log::debug!("{pmid}: queried author not on the author list"),
            None => log::debug!("{pmid}: no article in payload"),
        }
    }
    Ok(records)
}
