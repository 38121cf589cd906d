//! Relational mirror of the publication database.
//!
//! One row per document, with its refs split across three tables by
//! kind. Loading replays every document through the core indices, so the
//! canonical structure survives a round trip.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, ToSql};

use bibweld_core::{
    Author, AuthorId, PageStart, Pages, PubDb, PubRecord, PubType, Ref,
};

use crate::StoreError;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS docs (
    doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
    type CHAR(10) NOT NULL,
    date TIMESTAMP
);

CREATE TABLE IF NOT EXISTS refs (
    doc_id REFERENCES docs(doc_id) ON DELETE CASCADE NOT NULL,
    reftype CHAR(16) NOT NULL,
    ref TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS refs_journals (
    doc_id REFERENCES docs(doc_id) ON DELETE CASCADE NOT NULL,
    title TEXT NOT NULL,
    issue TEXT,
    volume TEXT,
    issn TEXT,
    pstart TEXT,
    pend INTEGER
);

CREATE TABLE IF NOT EXISTS refs_books (
    doc_id REFERENCES docs(doc_id) ON DELETE CASCADE NOT NULL,
    title TEXT NOT NULL,
    isbn CHAR(17),
    pstart TEXT,
    pend INTEGER
);

CREATE TABLE IF NOT EXISTS authors (
    author_id INTEGER PRIMARY KEY AUTOINCREMENT,
    fname TEXT,
    lname TEXT NOT NULL,
    fname_initials TEXT
);

CREATE TABLE IF NOT EXISTS authorships (
    doc_id REFERENCES docs(doc_id) ON DELETE CASCADE NOT NULL,
    author_id REFERENCES authors(author_id) ON DELETE CASCADE NOT NULL,
    quality CHAR(3)
);

CREATE TABLE IF NOT EXISTS texts (
    text_id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_id REFERENCES docs(doc_id) ON DELETE CASCADE NOT NULL,
    type CHAR(8) NOT NULL,
    lang CHAR(2) NOT NULL,
    content BLOB NOT NULL
);
";

pub struct Mirror {
    conn: Connection,
}

impl Mirror {
    pub fn open(path: &Path) -> Result<Mirror, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Mirror, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Mirror, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Mirror { conn })
    }

    /// Write the full database state, replacing any previous content.
    /// Abstract-derived refs are not persisted; they are re-derived when
    /// the record is rebuilt.
    pub fn save(&mut self, db: &PubDb) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM docs", [])?;
        tx.execute("DELETE FROM authors", [])?;

        let mut author_rows: HashMap<AuthorId, i64> = HashMap::new();

        for (_, publication) in db.iter() {
            tx.execute(
                "INSERT INTO docs (type, date) VALUES (?1, ?2)",
                params![
                    publication.pubtype.as_str(),
                    publication.date.map(|d| d.to_string())
                ],
            )?;
            let doc_id = tx.last_insert_rowid();

            for &handle in &publication.refs {
                match db.ref_key(handle) {
                    Ref::Plain { reftype, value } => {
                        if reftype == "en_abstract" || reftype == "fr_abstract" {
                            continue;
                        }
                        tx.execute(
                            "INSERT INTO refs (doc_id, reftype, ref) VALUES (?1, ?2, ?3)",
                            params![doc_id, reftype, value],
                        )?;
                    }
                    Ref::Journal(j) => {
                        tx.execute(
                            "INSERT INTO refs_journals
                             (doc_id, title, issue, volume, issn, pstart, pend)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                            params![
                                doc_id,
                                j.title,
                                j.issue,
                                j.volume,
                                j.issn,
                                encode_pstart(&j.pages),
                                j.pages.end
                            ],
                        )?;
                    }
                    Ref::Book(b) => {
                        tx.execute(
                            "INSERT INTO refs_books (doc_id, title, isbn, pstart, pend)
                             VALUES (?1, ?2, ?3, ?4, ?5)",
                            params![doc_id, b.title, b.isbn, encode_pstart(&b.pages), b.pages.end],
                        )?;
                    }
                }
            }

            for &handle in &publication.authors {
                let author_id = match author_rows.get(&handle) {
                    Some(&id) => id,
                    None => {
                        let author = db.author_key(handle);
                        tx.execute(
                            "INSERT INTO authors (fname, lname, fname_initials)
                             VALUES (?1, ?2, ?3)",
                            params![author.fname, author.lname, author.fname_initials],
                        )?;
                        let id = tx.last_insert_rowid();
                        author_rows.insert(handle, id);
                        id
                    }
                };
                tx.execute(
                    "INSERT INTO authorships (doc_id, author_id, quality)
                     VALUES (?1, ?2, NULL)",
                    params![doc_id, author_id],
                )?;
            }

            for (lang, text) in [
                ("en", &publication.en_abstract),
                ("fr", &publication.fr_abstract),
            ] {
                if let Some(content) = text {
                    tx.execute(
                        "INSERT INTO texts (doc_id, type, lang, content)
                         VALUES (?1, 'abstract', ?2, ?3)",
                        params![doc_id, lang, content.as_bytes()],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Rebuild the in-memory database. Each document is replayed through
    /// the indices as already-canonical, so no cross-document
    /// reconciliation takes place.
    pub fn load(&self) -> Result<PubDb, StoreError> {
        let mut db = PubDb::new();

        let mut docs_stmt = self
            .conn
            .prepare("SELECT doc_id, type, date FROM docs ORDER BY doc_id")?;
        let docs: Vec<(i64, String, Option<String>)> = docs_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<_, _>>()?;

        let mut plain_stmt = self
            .conn
            .prepare("SELECT reftype, ref FROM refs WHERE doc_id = ?1")?;
        let mut journal_stmt = self.conn.prepare(
            "SELECT title, issue, volume, issn, pstart, pend
             FROM refs_journals WHERE doc_id = ?1",
        )?;
        let mut book_stmt = self
            .conn
            .prepare("SELECT title, isbn, pstart, pend FROM refs_books WHERE doc_id = ?1")?;
        let mut authors_stmt = self.conn.prepare(
            "SELECT a.lname, a.fname, a.fname_initials
             FROM authors a JOIN authorships s ON s.author_id = a.author_id
             WHERE s.doc_id = ?1 ORDER BY a.author_id",
        )?;
        let mut texts_stmt = self.conn.prepare(
            "SELECT lang, content FROM texts WHERE doc_id = ?1 AND type = 'abstract'",
        )?;

        for (doc_id, pubtype, date) in docs {
            let mut refs: Vec<Ref> = Vec::new();

            let mut rows = plain_stmt.query(params![doc_id])?;
            while let Some(row) = rows.next()? {
                let reftype: String = row.get(0)?;
                let value: String = row.get(1)?;
                refs.push(Ref::plain(&reftype, &value));
            }

            let mut rows = journal_stmt.query(params![doc_id])?;
            while let Some(row) = rows.next()? {
                let title: String = row.get(0)?;
                let issue: Option<String> = row.get(1)?;
                let volume: Option<String> = row.get(2)?;
                let issn: Option<String> = row.get(3)?;
                let pages = decode_pages(row.get(4)?, row.get(5)?);
                refs.push(Ref::journal(
                    &title,
                    issn.as_deref(),
                    issue.as_deref(),
                    volume.as_deref(),
                    pages,
                ));
            }

            let mut rows = book_stmt.query(params![doc_id])?;
            while let Some(row) = rows.next()? {
                let title: String = row.get(0)?;
                let isbn: Option<String> = row.get(1)?;
                let pages = decode_pages(row.get(2)?, row.get(3)?);
                refs.push(Ref::book(&title, isbn.as_deref(), pages));
            }

            let mut authors: Vec<Author> = Vec::new();
            let mut rows = authors_stmt.query(params![doc_id])?;
            while let Some(row) = rows.next()? {
                authors.push(Author::from_parts(row.get(0)?, row.get(1)?, row.get(2)?));
            }

            let mut en_abstract: Option<String> = None;
            let mut fr_abstract: Option<String> = None;
            let mut rows = texts_stmt.query(params![doc_id])?;
            while let Some(row) = rows.next()? {
                let lang: String = row.get(0)?;
                let content: Vec<u8> = row.get(1)?;
                let text = String::from_utf8_lossy(&content).into_owned();
                match lang.as_str() {
                    "en" => en_abstract = Some(text),
                    "fr" => fr_abstract = Some(text),
                    other => log::warn!("doc {doc_id}: unknown abstract language {other:?}"),
                }
            }

            let record = PubRecord::new(
                PubType::parse(&pubtype),
                authors,
                date.as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
                refs,
                en_abstract.as_deref(),
                fr_abstract.as_deref(),
            );
            db.restore(record);
        }

        Ok(db)
    }

    /// Document ids carrying any of `refs`: one SELECT per ref, merged
    /// with UNION across the three ref tables.
    pub fn doc_ids_by_refs(&self, refs: &[Ref]) -> Result<Vec<i64>, StoreError> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let mut selects: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        for r in refs {
            match r {
                Ref::Plain { reftype, value } => {
                    selects.push(format!(
                        "SELECT doc_id FROM refs WHERE reftype = ?{} AND ref = ?{}",
                        values.len() + 1,
                        values.len() + 2
                    ));
                    values.push(Box::new(reftype.clone()));
                    values.push(Box::new(value.clone()));
                }
                Ref::Journal(j) => {
                    selects.push(format!(
                        "SELECT doc_id FROM refs_journals
                         WHERE title = ?{} AND issue IS ?{} AND pstart IS ?{}",
                        values.len() + 1,
                        values.len() + 2,
                        values.len() + 3
                    ));
                    values.push(Box::new(j.title.clone()));
                    values.push(Box::new(j.issue.clone()));
                    values.push(Box::new(encode_pstart(&j.pages)));
                }
                Ref::Book(b) => {
                    selects.push(format!(
                        "SELECT doc_id FROM refs_books WHERE title = ?{} AND pstart IS ?{}",
                        values.len() + 1,
                        values.len() + 2
                    ));
                    values.push(Box::new(b.title.clone()));
                    values.push(Box::new(encode_pstart(&b.pages)));
                }
            }
        }

        let sql = selects.join("\nUNION\n");
        let mut stmt = self.conn.prepare(&sql)?;
        let value_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let mut rows = stmt.query(&value_refs[..])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

fn encode_pstart(pages: &Pages) -> Option<String> {
    match &pages.start {
        Some(PageStart::Num(n)) => Some(n.to_string()),
        Some(PageStart::Raw(raw)) => Some(raw.clone()),
        None => None,
    }
}

fn decode_pages(pstart: Option<String>, pend: Option<u32>) -> Pages {
    let start = pstart.map(|s| match s.parse::<u32>() {
        Ok(n) => PageStart::Num(n),
        Err(_) => PageStart::Raw(s),
    });
    Pages { start, end: pend }
}
