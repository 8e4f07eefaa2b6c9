//! Keyed query cache in front of the accessors.
//!
//! Each `{endpoint, params}` key moves `Idle -> Fetching -> Success | Failed`
//! and back to `Fetching` on a refetch. Reads are stale-while-revalidate:
//! the last known result is returned at once and a background fetch is started
//! when the entry is stale. Only one fetch per key is ever outstanding; callers
//! arriving while it runs wait on the same result.

pub mod retry;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::CatalogError;
use crate::models::{QueryParams, VideoCollectionPage};
use crate::youtube::{search, videos, ApiClient};

pub use retry::RetryPolicy;

pub type FetchResult = Result<Arc<VideoCollectionPage>, CatalogError>;

/// Which accessor a key belongs to. The listing and search endpoints return
/// different id shapes, so identical params never share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Videos,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub endpoint: Endpoint,
    pub params: QueryParams,
}

impl QueryKey {
    pub fn new(endpoint: Endpoint, params: QueryParams) -> Self {
        Self { endpoint, params }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Fetching,
    Success,
    Failed,
}

/// Performs the network call for a key.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        key: &QueryKey,
    ) -> impl Future<Output = Result<VideoCollectionPage, CatalogError>> + Send;
}

impl Fetcher for ApiClient {
    async fn fetch(&self, key: &QueryKey) -> Result<VideoCollectionPage, CatalogError> {
        match key.endpoint {
            Endpoint::Videos => videos::get_videos(self, &key.params).await,
            Endpoint::Search => search::search_videos(self, &key.params).await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// How long a result counts as fresh. Zero revalidates on every read.
    pub stale_time: Duration,
    pub retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            retry: RetryPolicy::default(),
        }
    }
}

/// Read model handed to consumers.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub status: QueryStatus,
    pub collection: Option<Arc<VideoCollectionPage>>,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<CatalogError>,
    pub is_success: bool,
    pub failure_count: u32,
}

impl QueryResult {
    /// Reports `err` even when the entry no longer records it, as after an evict.
    fn settled_with(mut self, err: CatalogError) -> Self {
        self.status = QueryStatus::Failed;
        self.is_loading = false;
        self.is_success = false;
        self.is_error = true;
        self.error = Some(err);
        self
    }

    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            collection: None,
            is_loading: false,
            is_error: false,
            error: None,
            is_success: false,
            failure_count: 0,
        }
    }
}

/// Cancellation of one fetch's remaining retries. Cleared again when its key
/// becomes active before the backoff ends.
#[derive(Default)]
struct RetryGate {
    cancelled: AtomicBool,
    wake: Notify,
}

impl RetryGate {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    fn resume(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct InFlight {
    id: u64,
    waiters: Vec<oneshot::Sender<FetchResult>>,
    gate: Arc<RetryGate>,
}

struct Entry {
    status: QueryStatus,
    data: Option<Arc<VideoCollectionPage>>,
    error: Option<CatalogError>,
    last_fetched_at: Option<Instant>,
    failure_count: u32,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn new() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            last_fetched_at: None,
            failure_count: 0,
            in_flight: None,
        }
    }

    fn is_stale(&self, stale_time: Duration) -> bool {
        self.last_fetched_at
            .map_or(true, |at| at.elapsed() >= stale_time)
    }

    fn result(&self) -> QueryResult {
        let is_error = self.error.is_some();
        QueryResult {
            status: self.status,
            collection: self.data.clone(),
            is_loading: self.status == QueryStatus::Fetching && self.data.is_none() && !is_error,
            is_error,
            error: self.error.clone(),
            is_success: !is_error && self.data.is_some(),
            failure_count: self.failure_count,
        }
    }
}

pub struct QueryCache<F> {
    fetcher: Arc<F>,
    config: CacheConfig,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    subscribers: Mutex<Vec<async_channel::Sender<QueryKey>>>,
    next_id: AtomicU64,
}

impl<F: Fetcher> QueryCache<F> {
    pub fn new(fetcher: F, config: CacheConfig) -> Arc<Self> {
        Arc::new(Self {
            fetcher: Arc::new(fetcher),
            config,
            entries: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Receives the key of every entry that changes state.
    pub fn subscribe(&self) -> async_channel::Receiver<QueryKey> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn notify(&self, key: &QueryKey) {
        self.subscribers
            .lock()
            .retain(|tx| tx.try_send(key.clone()).is_ok());
    }

    /// Current state without side effects.
    pub fn snapshot(&self, key: &QueryKey) -> QueryResult {
        self.entries
            .lock()
            .get(key)
            .map(Entry::result)
            .unwrap_or_else(QueryResult::idle)
    }

    /// Seeds an empty entry so the first read needs no round trip.
    pub fn seed(&self, key: &QueryKey, page: VideoCollectionPage) {
        {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
            if entry.data.is_some() {
                return;
            }
            entry.status = QueryStatus::Success;
            entry.data = Some(Arc::new(page));
            entry.error = None;
            entry.last_fetched_at = Some(Instant::now());
        }
        self.notify(key);
    }

    /// Returns the last known result immediately and revalidates in the
    /// background when the entry is absent or stale.
    pub fn query(self: &Arc<Self>, key: &QueryKey) -> QueryResult {
        let (result, started) = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
            let started = entry.in_flight.is_none() && entry.is_stale(self.config.stale_time);
            if started {
                self.start_fetch(key, entry, None);
            }
            (entry.result(), started)
        };
        if started {
            self.notify(key);
        }
        result
    }

    /// Fetches the key, joining a fetch already in flight for it.
    pub async fn fetch(self: &Arc<Self>, key: &QueryKey) -> FetchResult {
        let (tx, rx) = oneshot::channel();
        let started = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
            match entry.in_flight.as_mut() {
                Some(in_flight) => {
                    in_flight.waiters.push(tx);
                    false
                }
                None => {
                    self.start_fetch(key, entry, Some(tx));
                    true
                }
            }
        };
        if started {
            self.notify(key);
        }
        rx.await.unwrap_or(Err(CatalogError::Cancelled))
    }

    /// Marks the entry stale and refetches it in the background.
    pub fn invalidate(self: &Arc<Self>, key: &QueryKey) {
        let started = {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.last_fetched_at = None;
                    if entry.in_flight.is_none() {
                        self.start_fetch(key, entry, None);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        if started {
            self.notify(key);
        }
    }

    /// Drops the entry. A fetch still running for it completes into nothing.
    pub fn evict(&self, key: &QueryKey) {
        let removed = self.entries.lock().remove(key);
        if let Some(in_flight) = removed.and_then(|entry| entry.in_flight) {
            in_flight.gate.cancel();
        }
        self.notify(key);
    }

    /// Cancels a scheduled retry for the key. An attempt already on the wire
    /// still completes; no further attempt is made after it.
    pub fn cancel_retries(&self, key: &QueryKey) {
        if let Some(in_flight) = self.entries.lock().get(key).and_then(|e| e.in_flight.as_ref()) {
            debug!(?key, "Cancelling pending retries");
            in_flight.gate.cancel();
        }
    }

    fn resume_retries(&self, key: &QueryKey) {
        if let Some(in_flight) = self.entries.lock().get(key).and_then(|e| e.in_flight.as_ref()) {
            in_flight.gate.resume();
        }
    }

    fn has_data(&self, key: &QueryKey) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.data.is_some())
    }

    fn start_fetch(
        self: &Arc<Self>,
        key: &QueryKey,
        entry: &mut Entry,
        waiter: Option<oneshot::Sender<FetchResult>>,
    ) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let gate = Arc::new(RetryGate::default());
        entry.status = QueryStatus::Fetching;
        entry.in_flight = Some(InFlight {
            id,
            waiters: waiter.into_iter().collect(),
            gate: Arc::clone(&gate),
        });

        debug!(?key, id, "Starting fetch");
        tokio::spawn(Arc::clone(self).run(key.clone(), id, gate));
    }

    async fn run(self: Arc<Self>, key: QueryKey, id: u64, gate: Arc<RetryGate>) {
        let policy = self.config.retry;
        let mut failures = 0;

        let result = loop {
            match self.fetcher.fetch(&key).await {
                Ok(page) => break Ok(Arc::new(page)),
                Err(err) => {
                    let retry = policy.should_retry(failures, &err);
                    let delay = policy.delay(failures);
                    failures += 1;
                    self.record_failure(&key, id, failures);

                    if !retry {
                        break Err(err);
                    }
                    if gate.is_cancelled() {
                        info!(?key, "Retries cancelled");
                        break Err(err);
                    }

                    warn!(?key, attempt = failures, ?delay, error = %err, "Fetch failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = gate.wake.notified() => {}
                    }
                    if gate.is_cancelled() {
                        info!(?key, "Pending retry cancelled");
                        break Err(err);
                    }
                }
            }
        };

        self.finish(&key, id, result);
    }

    fn record_failure(&self, key: &QueryKey, id: u64, failures: u32) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            if entry.in_flight.as_ref().map(|f| f.id) == Some(id) {
                entry.failure_count = failures;
            }
        }
    }

    fn finish(&self, key: &QueryKey, id: u64, result: FetchResult) {
        let waiters = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(key) else { return };
            if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
                return;
            }
            let Some(in_flight) = entry.in_flight.take() else { return };

            entry.last_fetched_at = Some(Instant::now());
            match &result {
                Ok(page) => {
                    entry.status = QueryStatus::Success;
                    entry.data = Some(Arc::clone(page));
                    entry.error = None;
                    entry.failure_count = 0;
                }
                Err(err) => {
                    entry.status = QueryStatus::Failed;
                    entry.error = Some(err.clone());
                }
            }
            in_flight.waiters
        };

        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        self.notify(key);
    }
}

/// Follows the parameters one consumer currently shows. Switching to new
/// parameters cancels any retry still scheduled for the previous ones.
pub struct QueryObserver<F> {
    cache: Arc<QueryCache<F>>,
    endpoint: Endpoint,
    active: Mutex<Option<QueryKey>>,
}

impl<F: Fetcher> QueryObserver<F> {
    pub fn new(cache: Arc<QueryCache<F>>, endpoint: Endpoint) -> Self {
        Self {
            cache,
            endpoint,
            active: Mutex::new(None),
        }
    }

    /// Switching keys cancels the previous key's retries and resumes the new
    /// key's. Subscribers hear about a switch to a key that already has data,
    /// since no fetch may start for it.
    fn activate(&self, params: QueryParams) -> QueryKey {
        let key = QueryKey::new(self.endpoint, params);
        let previous = self.active.lock().replace(key.clone());
        if previous.as_ref() == Some(&key) {
            return key;
        }
        if let Some(previous) = previous {
            self.cache.cancel_retries(&previous);
        }
        self.cache.resume_retries(&key);
        if self.cache.has_data(&key) {
            self.cache.notify(&key);
        }
        key
    }

    pub fn active(&self) -> Option<QueryKey> {
        self.active.lock().clone()
    }

    /// State of the active key without starting a fetch.
    pub fn snapshot(&self) -> QueryResult {
        match self.active() {
            Some(key) => self.cache.snapshot(&key),
            None => QueryResult::idle(),
        }
    }

    pub fn set_params(&self, params: QueryParams) -> QueryResult {
        let key = self.activate(params);
        self.cache.query(&key)
    }

    pub async fn fetch(&self, params: QueryParams) -> FetchResult {
        let key = self.activate(params);
        self.cache.fetch(&key).await
    }

    /// Fetches, then reports the entry's state with the fetch's own error
    /// taking precedence.
    pub async fn fetch_settled(&self, params: QueryParams) -> QueryResult {
        match self.fetch(params).await {
            Ok(_) => self.snapshot(),
            Err(err) => self.snapshot().settled_with(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use crate::errors::{ErrorKind, TransportError, FORBIDDEN_LIKELY_CAUSES};
    use reqwest::StatusCode;

    #[derive(Default)]
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<VideoCollectionPage, CatalogError>>>,
        fallback_error: Option<CatalogError>,
        calls: Mutex<Vec<QueryKey>>,
        latency: Duration,
    }

    impl ScriptedFetcher {
        fn failing(err: CatalogError) -> Self {
            Self { fallback_error: Some(err), ..Default::default() }
        }

        fn scripted(script: Vec<Result<VideoCollectionPage, CatalogError>>) -> Self {
            Self { script: Mutex::new(script.into()), ..Default::default() }
        }
    }

    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, key: &QueryKey) -> Result<VideoCollectionPage, CatalogError> {
            self.calls.lock().push(key.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if let Some(next) = self.script.lock().pop_front() {
                return next;
            }
            match &self.fallback_error {
                Some(err) => Err(err.clone()),
                None => Ok(page(match key.endpoint {
                    Endpoint::Videos => "youtube#videoListResponse",
                    Endpoint::Search => "youtube#searchListResponse",
                })),
            }
        }
    }

    fn page(kind: &str) -> VideoCollectionPage {
        VideoCollectionPage { kind: kind.to_string(), ..Default::default() }
    }

    fn failed(source: TransportError) -> CatalogError {
        CatalogError::Request { endpoint: "/videos", params: Vec::new(), source }
    }

    fn server_error() -> CatalogError {
        failed(TransportError::ServerError(StatusCode::INTERNAL_SERVER_ERROR))
    }

    fn videos_key() -> QueryKey {
        QueryKey::new(Endpoint::Videos, QueryParams::default())
    }

    fn calls(cache: &QueryCache<ScriptedFetcher>, key: &QueryKey) -> usize {
        cache.fetcher.calls.lock().iter().filter(|k| *k == key).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_is_not_retried() {
        let cache = QueryCache::new(
            ScriptedFetcher::failing(failed(TransportError::Forbidden {
                message: None,
                likely_causes: FORBIDDEN_LIKELY_CAUSES,
            })),
            CacheConfig::default(),
        );

        let err = cache.fetch(&videos_key()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(calls(&cache, &videos_key()), 1);

        let snapshot = cache.snapshot(&videos_key());
        assert_eq!(snapshot.status, QueryStatus::Failed);
        assert!(snapshot.is_error);
        assert!(!snapshot.is_success);
        assert!(snapshot.collection.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_request_is_not_retried() {
        let cache = QueryCache::new(
            ScriptedFetcher::failing(failed(TransportError::BadRequest {
                message: None,
                params: Vec::new(),
            })),
            CacheConfig::default(),
        );

        let err = cache.fetch(&videos_key()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(calls(&cache, &videos_key()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_twice_with_backoff() {
        let cache = QueryCache::new(ScriptedFetcher::failing(server_error()), CacheConfig::default());
        let started = Instant::now();

        let err = cache.fetch(&videos_key()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(calls(&cache, &videos_key()), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(cache.snapshot(&videos_key()).failure_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_retry() {
        let cache = QueryCache::new(
            ScriptedFetcher::scripted(vec![Err(server_error()), Ok(page("recovered"))]),
            CacheConfig::default(),
        );

        let result = cache.fetch(&videos_key()).await.unwrap();
        assert_eq!(result.kind, "recovered");

        let snapshot = cache.snapshot(&videos_key());
        assert_eq!(snapshot.status, QueryStatus::Success);
        assert!(snapshot.is_success);
        assert_eq!(snapshot.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_call() {
        let fetcher = ScriptedFetcher { latency: Duration::from_millis(100), ..Default::default() };
        let cache = QueryCache::new(fetcher, CacheConfig::default());
        let key = videos_key();

        let (a, b) = tokio::join!(cache.fetch(&key), cache.fetch(&key));

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(calls(&cache, &key), 1);
    }

    #[tokio::test]
    async fn test_listing_and_search_keys_are_isolated() {
        let cache = QueryCache::new(ScriptedFetcher::default(), CacheConfig::default());
        let params = QueryParams::search("cats");
        let listing = QueryKey::new(Endpoint::Videos, params.clone());
        let search = QueryKey::new(Endpoint::Search, params);

        let listed = cache.fetch(&listing).await.unwrap();
        let searched = cache.fetch(&search).await.unwrap();

        assert_eq!(listed.kind, "youtube#videoListResponse");
        assert_eq!(searched.kind, "youtube#searchListResponse");
        assert_eq!(calls(&cache, &listing), 1);
        assert_eq!(calls(&cache, &search), 1);
        assert_eq!(
            cache.snapshot(&listing).collection.unwrap().kind,
            "youtube#videoListResponse"
        );
    }

    #[tokio::test]
    async fn test_seeded_entry_needs_no_round_trip() {
        let config = CacheConfig { stale_time: Duration::from_secs(3000), ..Default::default() };
        let cache = QueryCache::new(ScriptedFetcher::default(), config);
        cache.seed(&videos_key(), page("initial"));

        let result = cache.query(&videos_key());

        assert!(result.is_success);
        assert_eq!(result.collection.unwrap().kind, "initial");
        assert_eq!(result.status, QueryStatus::Success);
        assert_eq!(calls(&cache, &videos_key()), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_served_while_revalidating() {
        let cache = QueryCache::new(ScriptedFetcher::default(), CacheConfig::default());
        let updates = cache.subscribe();
        cache.seed(&videos_key(), page("initial"));
        assert_eq!(updates.recv().await.unwrap(), videos_key());

        let result = cache.query(&videos_key());
        assert_eq!(result.collection.unwrap().kind, "initial");
        assert_eq!(result.status, QueryStatus::Fetching);
        assert!(!result.is_loading);

        while cache.snapshot(&videos_key()).status != QueryStatus::Success {
            updates.recv().await.unwrap();
        }
        let refreshed = cache.snapshot(&videos_key());
        assert_eq!(refreshed.collection.unwrap().kind, "youtube#videoListResponse");
    }

    #[tokio::test]
    async fn test_first_read_is_loading() {
        let cache = QueryCache::new(ScriptedFetcher::default(), CacheConfig::default());
        let updates = cache.subscribe();

        let result = cache.query(&videos_key());
        assert!(result.is_loading);
        assert!(result.collection.is_none());

        while cache.snapshot(&videos_key()).status != QueryStatus::Success {
            updates.recv().await.unwrap();
        }
        assert!(cache.snapshot(&videos_key()).is_success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_param_change_cancels_pending_retry() {
        let cache = QueryCache::new(ScriptedFetcher::failing(server_error()), CacheConfig::default());
        let observer = QueryObserver::new(Arc::clone(&cache), Endpoint::Search);
        let first = QueryKey::new(Endpoint::Search, QueryParams::search("first"));

        observer.set_params(QueryParams::search("first"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls(&cache, &first), 1);

        observer.set_params(QueryParams::search("second"));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(calls(&cache, &first), 1);
        let snapshot = cache.snapshot(&first);
        assert_eq!(snapshot.status, QueryStatus::Failed);
        assert_eq!(snapshot.error.map(|e| e.kind()), Some(ErrorKind::ServerError));
    }

    #[tokio::test]
    async fn test_observer_tracks_active_key() {
        let cache = QueryCache::new(ScriptedFetcher::default(), CacheConfig::default());
        let observer = QueryObserver::new(Arc::clone(&cache), Endpoint::Videos);
        assert!(observer.active().is_none());
        assert_eq!(observer.snapshot().status, QueryStatus::Idle);

        observer.fetch(QueryParams::default()).await.unwrap();

        assert_eq!(observer.active(), Some(videos_key()));
        assert!(observer.snapshot().is_success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_to_key_restores_its_retries() {
        let fetcher = ScriptedFetcher {
            latency: Duration::from_millis(500),
            ..ScriptedFetcher::failing(server_error())
        };
        let cache = QueryCache::new(fetcher, CacheConfig::default());
        let observer = QueryObserver::new(Arc::clone(&cache), Endpoint::Search);
        let first = QueryKey::new(Endpoint::Search, QueryParams::search("first"));

        observer.set_params(QueryParams::search("first"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        observer.set_params(QueryParams::search("second"));
        observer.set_params(QueryParams::search("first"));
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(calls(&cache, &first), 3);
        assert_eq!(cache.snapshot(&first).failure_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_fetch_reports_cancellation_after_evict() {
        let fetcher = ScriptedFetcher { latency: Duration::from_millis(100), ..Default::default() };
        let cache = QueryCache::new(fetcher, CacheConfig::default());
        let observer = Arc::new(QueryObserver::new(Arc::clone(&cache), Endpoint::Videos));

        let waiting = {
            let observer = Arc::clone(&observer);
            tokio::spawn(async move { observer.fetch_settled(QueryParams::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.evict(&videos_key());

        let result = waiting.await.unwrap();
        assert_eq!(result.status, QueryStatus::Failed);
        assert!(result.is_error);
        assert!(!result.is_loading);
        assert!(matches!(result.error, Some(CatalogError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_discards_entry() {
        let cache = QueryCache::new(ScriptedFetcher::default(), CacheConfig::default());
        cache.fetch(&videos_key()).await.unwrap();

        cache.evict(&videos_key());

        let snapshot = cache.snapshot(&videos_key());
        assert_eq!(snapshot.status, QueryStatus::Idle);
        assert!(snapshot.collection.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicting_during_fetch_cancels_waiters() {
        let fetcher = ScriptedFetcher { latency: Duration::from_millis(100), ..Default::default() };
        let cache = QueryCache::new(fetcher, CacheConfig::default());
        let key = videos_key();

        let waiting = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(async move { cache.fetch(&key).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.evict(&key);

        let result = waiting.await.unwrap();
        assert!(matches!(result, Err(CatalogError::Cancelled)));
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let cache = QueryCache::new(ScriptedFetcher::default(), CacheConfig {
            stale_time: Duration::from_secs(3000),
            ..Default::default()
        });
        let updates = cache.subscribe();
        cache.seed(&videos_key(), page("initial"));

        cache.invalidate(&videos_key());
        assert_eq!(cache.snapshot(&videos_key()).status, QueryStatus::Fetching);

        while cache.snapshot(&videos_key()).status != QueryStatus::Success {
            updates.recv().await.unwrap();
        }
        assert_eq!(calls(&cache, &videos_key()), 1);
    }
}
