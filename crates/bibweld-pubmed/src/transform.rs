//! Transform a parsed PubmedArticle into a publication record.

use bibweld_core::{clean_pii, Author, Pages, PubRecord, PubType, Ref};
use chrono::NaiveDate;

use crate::parser::PubmedArticle;

/// Map the PubMed publication type list onto the document type tags.
fn resolve_pubtype(types: &[String]) -> PubType {
    if types
        .iter()
        .any(|t| t == "Journal Article" || t == "Introductory Journal Article")
    {
        PubType::Art
    } else if types.iter().any(|t| t == "Case Reports") {
        PubType::Report
    } else {
        PubType::Other
    }
}

pub fn to_record(article: PubmedArticle) -> PubRecord {
    let pubtype = resolve_pubtype(&article.publication_types);

    let mut refs: Vec<Ref> = Vec::new();
    for id in &article.article_ids {
        if id.id_type == "pii" {
            match clean_pii(&id.value) {
                Some(pii) => refs.push(Ref::plain("pii", &pii)),
                None => log::debug!("{}: dropping malformed pii {:?}", article.pmid, id.value),
            }
        } else {
            refs.push(Ref::plain(&id.id_type, &id.value));
        }
    }

    // Title and abstract are adopted under the article language.
    let lang: String = article
        .language
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(2)
        .collect::<String>()
        .to_lowercase();
    let mut en_abstract = None;
    let mut fr_abstract = None;
    if lang == "en" {
        en_abstract = article.abstract_text.as_deref();
        if let Some(title) = &article.title {
            refs.push(Ref::plain("en_title", title));
        }
    } else if lang == "fr" {
        fr_abstract = article.abstract_text.as_deref();
        if let Some(title) = &article.title {
            refs.push(Ref::plain("fr_title", title));
        }
    }

    if let (Some(pages), Some(journal)) = (&article.pagination, &article.journal_title) {
        refs.push(Ref::journal(
            journal,
            article.journal_issn.as_deref(),
            Some(article.journal_issue.as_deref().unwrap_or("1")),
            Some(article.journal_volume.as_deref().unwrap_or("1")),
            Pages::parse(pages),
        ));
    }

    let mut authors = Vec::new();
    for author in &article.authors {
        match &author.last_name {
            Some(last) => authors.push(Author::new(
                last,
                author.fore_name.as_deref(),
                author.initials.as_deref(),
            )),
            None => {
                if author.collective_name.is_none() {
                    log::warn!("{}: author entry without a last name", article.pmid);
                }
            }
        }
    }

    let date = article
        .date_created
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

    PubRecord::new(pubtype, authors, date, refs, en_abstract, fr_abstract)
}
