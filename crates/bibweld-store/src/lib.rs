//! SQLite persistence: the HTTP response cache and the relational
//! mirror of the publication database.

use thiserror::Error;

pub mod http_cache;
pub mod mirror;

pub use http_cache::HttpCache;
pub use mirror::Mirror;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("fetch failed: {0}")]
    Fetch(#[from] bibweld_core::FetchError),
}
