// lib.rs
use background_worker::{WorkError, WorkSystem};
use fxhash::FxHashMap;
use log::{debug, error, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod cache;
mod decode;
mod fetch;
mod types;

pub use cache::ImageCache;
pub use decode::decode_image;
pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use types::{
    Bitmap, FailureKind, FetchCompletion, FetchError, FetchId, FetchOutcome, LoaderStats,
    RequestState,
};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Worker error: {0}")]
    Worker(#[from] WorkError),
}

pub type Result<T> = std::result::Result<T, LoaderError>;

/// Configuration for the image loader
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    /// Number of fetch/decode worker threads
    pub workers: usize,
    /// Upper bound for a whole request (connect, send and body read)
    pub timeout: Duration,
    /// Bodies larger than this fail with a network error
    pub max_body_bytes: u64,
    /// `None` keeps every fetched image for the lifetime of the loader
    pub cache_capacity: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout: Duration::from_secs(10),
            max_body_bytes: 16 * 1024 * 1024,
            cache_capacity: None,
        }
    }
}

/// Runs on a worker: fetch, decode, and cache on success. Failures are logged here with their
/// kind and returned as values.
fn fetch_job(
    fetcher: &dyn ImageFetcher,
    cache: &ImageCache,
    (id, url): (FetchId, String),
) -> FetchCompletion {
    let outcome = fetcher.fetch(&url);

    match &outcome {
        Ok(bitmap) => {
            debug!("Fetched {} ({}x{})", url, bitmap.width, bitmap.height);
            cache.insert(url.clone(), bitmap.clone());
        }
        Err(e) => match e.kind() {
            FailureKind::Network => warn!("Network failure for {}: {}", url, e),
            FailureKind::Decode => warn!("Decode failure for {}: {}", url, e),
        },
    }

    FetchCompletion { id, url, outcome }
}

/// Background image loader with an in-memory cache.
///
/// Lookups and requests are made from the coordinating thread. Fetching, decoding and cache writes
/// happen on the worker pool. Finished fetches are handed back through `try_completion` /
/// `wait_completion`, so the owner decides when results are applied. A url is fetched at most once
/// at a time, a second request while it is in flight is reported as `Pending`.
pub struct ImageLoader {
    cache: Arc<ImageCache>,
    workers: WorkSystem<(FetchId, String), FetchCompletion>,
    in_flight: FxHashMap<String, FetchId>,
    /// Finished fetches taken off the worker channel but not handed out yet
    ready: VecDeque<FetchCompletion>,
    next_id: u64,
    stats: LoaderStats,
}

impl ImageLoader {
    /// Loader that fetches over HTTP
    pub fn new(config: LoaderConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpImageFetcher::new(&config));
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(config: LoaderConfig, fetcher: Arc<dyn ImageFetcher>) -> Result<Self> {
        let cache = Arc::new(ImageCache::new(config.cache_capacity));
        Self::with_cache(config, fetcher, cache)
    }

    /// Builds a loader on top of an existing cache, e.g. one shared between several lists.
    pub fn with_cache(
        config: LoaderConfig,
        fetcher: Arc<dyn ImageFetcher>,
        cache: Arc<ImageCache>,
    ) -> Result<Self> {
        let worker_cache = Arc::clone(&cache);
        let workers = WorkSystem::new("image-fetch", config.workers, move |job: (FetchId, String)| {
            fetch_job(fetcher.as_ref(), &worker_cache, job)
        })?;

        Ok(Self {
            cache,
            workers,
            in_flight: FxHashMap::default(),
            ready: VecDeque::new(),
            next_id: 0,
            stats: LoaderStats::default(),
        })
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    pub fn get_cached(&self, url: &str) -> Option<Bitmap> {
        self.cache.get(url)
    }

    pub fn is_in_flight(&self, url: &str) -> bool {
        self.in_flight.contains_key(url)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    /// Returns the cached image or makes sure a fetch for `url` is running. Never blocks.
    pub fn request(&mut self, url: &str) -> Result<RequestState> {
        // The fetch may already be done on a worker, a failed one must not swallow this request
        if self.in_flight.contains_key(url) {
            self.collect_finished();
        }

        if let Some(bitmap) = self.cache.get(url) {
            self.stats.cache_hits += 1;
            return Ok(RequestState::Cached(bitmap));
        }

        if let Some(&id) = self.in_flight.get(url) {
            debug!("Fetch already in flight: {}", url);
            self.stats.deduplicated += 1;
            return Ok(RequestState::Pending(id));
        }

        let id = FetchId(self.next_id);
        debug!("Queue fetch {:?}: {}", id, url);
        self.workers.add_work((id, url.to_string()))?;
        self.next_id += 1;
        self.in_flight.insert(url.to_string(), id);
        self.stats.fetches_started += 1;

        Ok(RequestState::Started(id))
    }

    /// Moves everything the workers have posted so far into `ready`
    fn collect_finished(&mut self) {
        while let Some(completion) = self.workers.try_recv() {
            let completion = self.finish(completion);
            self.ready.push_back(completion);
        }
    }

    fn finish(&mut self, completion: FetchCompletion) -> FetchCompletion {
        self.in_flight.remove(&completion.url);

        match &completion.outcome {
            Ok(_) => self.stats.succeeded += 1,
            Err(e) => match e.kind() {
                FailureKind::Network => self.stats.network_failures += 1,
                FailureKind::Decode => self.stats.decode_failures += 1,
            },
        }

        completion
    }

    /// Next finished fetch, if any, without blocking.
    pub fn try_completion(&mut self) -> Option<FetchCompletion> {
        if let Some(completion) = self.ready.pop_front() {
            return Some(completion);
        }

        let completion = self.workers.try_recv()?;
        Some(self.finish(completion))
    }

    /// Waits up to `timeout` for the next finished fetch.
    pub fn wait_completion(&mut self, timeout: Duration) -> Option<FetchCompletion> {
        if let Some(completion) = self.ready.pop_front() {
            return Some(completion);
        }

        if self.in_flight.is_empty() {
            return None;
        }

        match self.workers.recv_timeout(timeout) {
            Some(completion) => Some(self.finish(completion)),
            None => {
                error!(
                    "Timed out after {:?} waiting for {} fetches",
                    timeout,
                    self.in_flight.len()
                );
                None
            }
        }
    }
}
