//! The contract between source adapters and whatever performs HTTP.
//!
//! Adapters only ever see `fn get(url) -> bytes`; caching, compression
//! and retries live behind it.

use std::time::Duration;

/// Error from fetching one URL.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP-level failure with optional status code.
    Http {
        status: Option<u16>,
        message: String,
    },
    /// The transport stalled or timed out.
    Timeout(String),
    /// Local I/O failure (cache medium, decompression).
    Io(std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Timeout(url) => write!(f, "timeout fetching {url}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            // 4xx is the caller's fault and will not improve on retry.
            Self::Http { status: Some(s), .. } => *s >= 500,
            Self::Http { status: None, .. } => true,
            Self::Io(_) => false,
        }
    }
}

/// Anything that can turn a URL into a response body.
pub trait Fetcher {
    fn get(&mut self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Retry a fallible fetch with exponential backoff.
///
/// Retries up to `max_retries` times on retryable errors, then returns
/// the final error.
pub fn retry_with_backoff<T>(
    label: &str,
    max_retries: u32,
    mut attempt_fn: impl FnMut() -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                log::warn!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                std::thread::sleep(backoff_duration(attempt));
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}
