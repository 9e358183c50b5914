// types.rs
use std::sync::Arc;
use thiserror::Error;

/// Decoded image, always 8-bit RGBA. Cloning only bumps a reference count so the same pixels can
/// sit in the cache and in any number of image slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Size of the pixel data in bytes
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// The two failure families a fetch can end in. Both are treated the same by callers (no image),
/// but are kept apart in logs and stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Decode,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Decode error: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Network(_) | FetchError::Status(_) => FailureKind::Network,
            FetchError::Decode(_) => FailureKind::Decode,
        }
    }
}

impl From<ureq::Error> for FetchError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => FetchError::Status(code),
            other => FetchError::Network(other.to_string()),
        }
    }
}

pub type FetchOutcome = Result<Bitmap, FetchError>;

/// Identifies one fetch. A url that is fetched again after a failure gets a new id, so results
/// of the two attempts can be told apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FetchId(pub u64);

/// Result of asking the loader for an image
#[derive(Debug)]
pub enum RequestState {
    /// Already in the cache, use it right away
    Cached(Bitmap),
    /// A new fetch was queued
    Started(FetchId),
    /// A fetch for this url is already in flight
    Pending(FetchId),
}

/// Posted by a worker once a fetch has finished. On success the cache has already been updated.
#[derive(Debug)]
pub struct FetchCompletion {
    pub id: FetchId,
    pub url: String,
    pub outcome: FetchOutcome,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub cache_hits: u64,
    pub fetches_started: u64,
    pub deduplicated: u64,
    pub succeeded: u64,
    pub network_failures: u64,
    pub decode_failures: u64,
}
