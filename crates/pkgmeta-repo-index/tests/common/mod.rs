//! In-memory transport for index tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use pkgmeta_repo_index::{Fetch, FetchError};

/// Serves canned bodies by URL and records every request in order.
#[derive(Default)]
pub struct FakeFetch {
    responses: HashMap<String, Result<Vec<u8>, u16>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for FakeFetch {
    fn get(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(429)) => Err(FetchError::RateLimited(url.to_string())),
            Some(Err(status)) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            }),
            None => Err(FetchError::NotFound(url.to_string())),
        }
    }
}

pub fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}
