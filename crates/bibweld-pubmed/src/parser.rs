//! PubMed efetch XML parser using quick-xml
//!
//! Streaming parser for the `PubmedArticleSet` payload, reading only the
//! fields the ingestion pipeline consumes.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// One parsed `PubmedArticle`.
#[derive(Debug, Default)]
pub struct PubmedArticle {
    pub pmid: String,

    /// Every `ArticleId` with its `IdType` attribute (`doi`, `pubmed`,
    /// `pii`, `pmc`, ...).
    pub article_ids: Vec<ArticleId>,

    // Article
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub language: Option<String>,
    pub publication_types: Vec<String>,

    // Journal
    pub journal_title: Option<String>,
    pub journal_issn: Option<String>,
    pub journal_volume: Option<String>,
    pub journal_issue: Option<String>,
    pub pagination: Option<String>,

    // Record creation date, YYYY-MM-DD
    pub date_created: Option<String>,

    pub authors: Vec<Author>,
}

#[derive(Debug, Default, Clone)]
pub struct ArticleId {
    pub id_type: String,
    pub value: String,
}

#[derive(Debug, Default, Clone)]
pub struct Author {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub collective_name: Option<String>,
}

/// Parse every `PubmedArticle` from an efetch response.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<PubmedArticle>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut articles = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"PubmedArticle" => {
                match parse_article(&mut reader) {
                    Ok(article) => articles.push(article),
                    Err(e) => log::debug!("Failed to parse article: {}", e),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e).context("XML parse error"),
            _ => {}
        }
        buf.clear();
    }

    Ok(articles)
}

fn parse_article(reader: &mut Reader<&[u8]>) -> Result<PubmedArticle> {
    let mut article = PubmedArticle::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"MedlineCitation" => parse_medline_citation(reader, &mut article)?,
                b"PubmedData" => parse_pubmed_data(reader, &mut article)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"PubmedArticle" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(article)
}

fn parse_medline_citation(reader: &mut Reader<&[u8]>, article: &mut PubmedArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"PMID" => {
                    if article.pmid.is_empty() {
                        article.pmid = read_text(reader)?;
                    }
                }
                b"DateCreated" => article.date_created = Some(read_date(reader, b"DateCreated")?),
                b"Article" => parse_article_element(reader, article)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"MedlineCitation" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_article_element(reader: &mut Reader<&[u8]>, article: &mut PubmedArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"Journal" => parse_journal(reader, article)?,
                b"ArticleTitle" => {
                    article.title = Some(read_text_content(reader, b"ArticleTitle")?)
                }
                b"Abstract" => article.abstract_text = Some(parse_abstract(reader)?),
                b"AuthorList" => article.authors = parse_author_list(reader)?,
                b"Language" => article.language = Some(read_text(reader)?),
                b"PublicationTypeList" => article.publication_types = parse_pub_type_list(reader)?,
                b"Pagination" => article.pagination = parse_pagination(reader)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"Article" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_journal(reader: &mut Reader<&[u8]>, article: &mut PubmedArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"ISSN" => article.journal_issn = Some(read_text(reader)?),
                b"Title" => article.journal_title = Some(read_text(reader)?),
                b"Volume" => article.journal_volume = Some(read_text(reader)?),
                b"Issue" => article.journal_issue = Some(read_text(reader)?),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"Journal" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_abstract(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text_parts = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"AbstractText" => {
                text_parts.push(read_text_content(reader, b"AbstractText")?);
            }
            Event::End(e) if e.name().as_ref() == b"Abstract" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text_parts.join(" "))
}

fn parse_pagination(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let mut pagination = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"MedlinePgn" => {
                pagination = Some(read_text(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"Pagination" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(pagination)
}

fn parse_author_list(reader: &mut Reader<&[u8]>) -> Result<Vec<Author>> {
    let mut authors = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"Author" => {
                authors.push(parse_author(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"AuthorList" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(authors)
}

fn parse_author(reader: &mut Reader<&[u8]>) -> Result<Author> {
    let mut author = Author::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"LastName" => author.last_name = Some(read_text(reader)?),
                b"ForeName" => author.fore_name = Some(read_text(reader)?),
                b"Initials" => author.initials = Some(read_text(reader)?),
                b"CollectiveName" => author.collective_name = Some(read_text(reader)?),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"Author" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(author)
}

fn parse_pub_type_list(reader: &mut Reader<&[u8]>) -> Result<Vec<String>> {
    let mut types = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"PublicationType" => {
                types.push(read_text(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"PublicationTypeList" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(types)
}

fn parse_pubmed_data(reader: &mut Reader<&[u8]>, article: &mut PubmedArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"ArticleIdList" => {
                parse_article_id_list(reader, article)?;
            }
            Event::End(e) if e.name().as_ref() == b"PubmedData" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_article_id_list(reader: &mut Reader<&[u8]>, article: &mut PubmedArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"ArticleId" => {
                let mut id_type = String::new();
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"IdType" {
                        id_type = String::from_utf8_lossy(&attr.value).to_string();
                    }
                }
                let value = read_text(reader)?.trim().to_string();
                if !id_type.is_empty() && !value.is_empty() {
                    article.article_ids.push(ArticleId { id_type, value });
                }
            }
            Event::End(e) if e.name().as_ref() == b"ArticleIdList" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Read text content until next end tag
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::End(_) => break,
            Event::Start(_) => {
                // Handle nested markup (<i>, <b>, ...)
                text.push_str(&read_text(reader)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Read text content of a specific element, handling nested tags
fn read_text_content(reader: &mut Reader<&[u8]>, end_tag: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                depth -= 1;
                if depth == 0 && e.name().as_ref() == end_tag {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Read a Year/Month/Day block as YYYY-MM-DD
fn read_date(reader: &mut Reader<&[u8]>, end_tag: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut year = String::new();
    let mut month = String::new();
    let mut day = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"Year" => year = read_text(reader)?,
                b"Month" => month = read_text(reader)?,
                b"Day" => day = read_text(reader)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == end_tag => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if year.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(
            "{}-{:0>2}-{:0>2}",
            year,
            month.parse::<u32>().unwrap_or(1),
            day.parse::<u32>().unwrap_or(1)
        ))
    }
}
