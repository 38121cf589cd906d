//! An HTTP cache keyed by URL, backed by a SQLite table.
//!
//! Response bodies are stored gzip-compressed with their fetch time.
//! Entries stay fresh for a configurable window; an entry that no longer
//! decompresses is dropped and its URL refetched.

use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::{params, Connection, OptionalExtension};

use bibweld_core::fetch::{retry_with_backoff, FetchError, Fetcher};

use crate::StoreError;

const DEFAULT_MAX_AGE_DAYS: u32 = 30;
const DEFAULT_MAX_RETRIES: u32 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpCache {
    conn: Connection,
    client: reqwest::blocking::Client,
    max_age_days: u32,
    max_retries: u32,
}

impl HttpCache {
    pub fn open(path: &Path) -> Result<HttpCache, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<HttpCache, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<HttpCache, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS http_cache (
                url TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                fetch_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL
            )",
        )?;
        // gzip on the wire is handled transparently by the client.
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(HttpCache {
            conn,
            client,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_max_age(mut self, days: u32) -> HttpCache {
        self.max_age_days = days;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> HttpCache {
        self.max_retries = retries;
        self
    }

    /// Return a fresh cached body, or fetch and cache one.
    pub fn get(&mut self, url: &str) -> Result<Vec<u8>, StoreError> {
        if let Some(body) = self.cached(url)? {
            return Ok(body);
        }

        log::info!("HTTP query for {url:?}");
        let body = self.fetch(url)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO http_cache (url, data, fetch_time)
             VALUES (?1, ?2, datetime('now'))",
            params![url, gzip(&body)?],
        )?;
        Ok(body)
    }

    /// Remove entries older than the freshness window.
    pub fn purge_stale(&self) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM http_cache WHERE fetch_time <= datetime('now', ?1)",
            params![format!("-{} days", self.max_age_days)],
        )?;
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM http_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn cached(&self, url: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let row: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM http_cache
                 WHERE url = ?1 AND fetch_time > datetime('now', ?2)",
                params![url, format!("-{} days", self.max_age_days)],
                |row| row.get(0),
            )
            .optional()?;
        let Some(blob) = row else {
            return Ok(None);
        };
        match gunzip(&blob) {
            Ok(body) => {
                log::debug!("HTTP result for {url:?} retrieved from cache");
                Ok(Some(body))
            }
            Err(e) => {
                log::warn!("corrupt cache entry for {url:?} ({e}), refetching");
                self.conn
                    .execute("DELETE FROM http_cache WHERE url = ?1", params![url])?;
                Ok(None)
            }
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        retry_with_backoff(url, self.max_retries, || {
            let response = self
                .client
                .get(url)
                .send()
                .map_err(|e| to_fetch_error(url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Http {
                    status: Some(status.as_u16()),
                    message: status.to_string(),
                });
            }
            response
                .bytes()
                .map(|body| body.to_vec())
                .map_err(|e| to_fetch_error(url, e))
        })
    }
}

impl Fetcher for HttpCache {
    fn get(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        HttpCache::get(self, url).map_err(|e| match e {
            StoreError::Fetch(fetch) => fetch,
            other => FetchError::Io(std::io::Error::other(other.to_string())),
        })
    }
}

fn to_fetch_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    GzDecoder::new(data).read_to_end(&mut body)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(cache: &HttpCache, url: &str, blob: &[u8]) {
        cache
            .conn
            .execute(
                "INSERT INTO http_cache (url, data, fetch_time)
                 VALUES (?1, ?2, datetime('now'))",
                params![url, blob],
            )
            .unwrap();
    }

    #[test]
    fn gzip_roundtrip() {
        let body = b"some response body".to_vec();
        assert_eq!(gunzip(&gzip(&body).unwrap()).unwrap(), body);
    }

    #[test]
    fn fresh_entry_served_from_cache() {
        let mut cache = HttpCache::in_memory().unwrap();
        seed(&cache, "http://example.org/a", &gzip(b"hello").unwrap());
        // No network involved: get must hit the cache.
        assert_eq!(cache.get("http://example.org/a").unwrap(), b"hello");
    }

    #[test]
    fn stale_entry_is_not_served() {
        let cache = HttpCache::in_memory().unwrap();
        cache
            .conn
            .execute(
                "INSERT INTO http_cache (url, data, fetch_time)
                 VALUES (?1, ?2, datetime('now', '-60 days'))",
                params!["http://example.org/old", gzip(b"old").unwrap()],
            )
            .unwrap();
        assert_eq!(cache.cached("http://example.org/old").unwrap(), None);
        assert_eq!(cache.purge_stale().unwrap(), 1);
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn corrupt_entry_is_dropped() {
        let cache = HttpCache::in_memory().unwrap();
        seed(&cache, "http://example.org/bad", b"not gzip at all");
        assert_eq!(cache.cached("http://example.org/bad").unwrap(), None);
        // The poisoned row is gone, clearing the way for a refetch.
        assert_eq!(cache.len().unwrap(), 0);
    }
}
