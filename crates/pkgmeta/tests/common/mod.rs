//! Fakes shared by the resolver and provider tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use pkgmeta::provider::{Lookup, Miss, Provider, ProviderError};
use pkgmeta::{MetadataRecord, PackageIdentifier, RecordBuilder};
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

/// Holds requests for one URL until released, announcing each arrival.
pub struct Gated {
    inner: FakeFetch,
    url: String,
    arrived: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

/// Test-side ends of a [`Gated`] fetch.
pub struct Gate {
    pub arrived: Receiver<()>,
    pub release: Sender<()>,
}

impl Gated {
    pub fn new(inner: FakeFetch, url: &str) -> (Self, Gate) {
        let (arrived_tx, arrived_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gated = Self {
            inner,
            url: url.to_string(),
            arrived: Mutex::new(arrived_tx),
            release: Mutex::new(release_rx),
        };
        let gate = Gate {
            arrived: arrived_rx,
            release: release_tx,
        };
        (gated, gate)
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.requests()
    }
}

impl Fetch for Gated {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        if url == self.url {
            let _ = self.arrived.lock().unwrap().send(());
            let _ = self
                .release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(10));
        }
        self.inner.get(url, timeout)
    }
}

pub fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

enum Behavior {
    Answer(Option<MetadataRecord>),
    Fail,
    Panic,
}

/// A provider with a fixed answer that counts its calls.
pub struct Scripted {
    name: &'static str,
    priority: u8,
    types: Vec<&'static str>,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn answering(name: &'static str, priority: u8, record: MetadataRecord) -> Self {
        Self::with_behavior(name, priority, Behavior::Answer(Some(record)))
    }

    pub fn empty(name: &'static str, priority: u8) -> Self {
        Self::with_behavior(name, priority, Behavior::Answer(None))
    }

    pub fn failing(name: &'static str, priority: u8) -> Self {
        Self::with_behavior(name, priority, Behavior::Fail)
    }

    pub fn panicking(name: &'static str, priority: u8) -> Self {
        Self::with_behavior(name, priority, Behavior::Panic)
    }

    fn with_behavior(name: &'static str, priority: u8, behavior: Behavior) -> Self {
        Self {
            name,
            priority,
            types: vec!["pypi"],
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn for_types(mut self, types: &[&'static str]) -> Self {
        self.types = types.to_vec();
        self
    }

    /// Handle on the call count, still readable after the provider is
    /// boxed into a resolver.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Provider for Scripted {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        self.types.contains(&id.ty())
    }

    fn resolve(&self, _id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Answer(Some(record)) => Ok(Lookup::from_record(record.clone())),
            Behavior::Answer(None) => Ok(Lookup::Absent(Miss::NotFound)),
            Behavior::Fail => Err(ProviderError::Internal {
                provider: self.name,
                message: "scripted failure".to_string(),
            }),
            Behavior::Panic => panic!("scripted panic in {}", self.name),
        }
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn record(source: &str) -> RecordBuilder {
    RecordBuilder::new(source)
}
