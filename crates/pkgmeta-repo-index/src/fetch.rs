//! Blocking HTTP transport behind a small trait.

use std::io::{self, Cursor, Read};
use std::time::Duration;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use tracing::trace;

/// Default `User-Agent` for outbound requests.
pub const DEFAULT_USER_AGENT: &str = concat!("pkgmeta/", env!("CARGO_PKG_VERSION"));

/// Errors from fetching a remote document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("http status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Fetches raw response bodies.
///
/// Implementations must honor `timeout` for the whole request.
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        (**self).get(url, timeout)
    }
}

impl<F: Fetch + ?Sized> Fetch for std::sync::Arc<F> {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        (**self).get(url, timeout)
    }
}

/// Fetch `url` and decode its body as JSON.
pub fn get_json<T, F>(fetch: &F, url: &str, timeout: Duration) -> Result<T, FetchError>
where
    T: DeserializeOwned,
    F: Fetch + ?Sized,
{
    let body = fetch.get(url, timeout)?;
    serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(format!("{url}: {e}")))
}

/// Whether `data` starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Decompress gzip data; anything else is returned as-is.
pub fn maybe_gunzip(data: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    if !is_gzip(&data) {
        return Ok(data);
    }
    let mut out = Vec::with_capacity(data.len() * 4);
    GzDecoder::new(Cursor::new(data))
        .read_to_end(&mut out)
        .map_err(|e| FetchError::Malformed(format!("gzip: {e}")))?;
    Ok(out)
}

/// [`Fetch`] over a shared `ureq` agent.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(user_agent).build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        trace!(url = %url, timeout_secs = timeout.as_secs(), "GET");
        let response = self
            .agent
            .get(url)
            .timeout(timeout)
            .call()
            .map_err(|e| classify(url, e))?;

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| match e.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                    FetchError::Timeout(url.to_string())
                }
                _ => FetchError::Io(e),
            })?;
        Ok(body)
    }
}

fn classify(url: &str, error: ureq::Error) -> FetchError {
    match error {
        ureq::Error::Status(404 | 410, _) => FetchError::NotFound(url.to_string()),
        ureq::Error::Status(429, _) => FetchError::RateLimited(url.to_string()),
        ureq::Error::Status(status, _) => FetchError::Status {
            status,
            url: url.to_string(),
        },
        ureq::Error::Transport(transport) => {
            let timed_out = std::error::Error::source(&transport)
                .and_then(|source| source.downcast_ref::<io::Error>())
                .is_some_and(|e| {
                    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
                });
            if timed_out {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Transport(format!("{url}: {transport}"))
            }
        }
    }
}
