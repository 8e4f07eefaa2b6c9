use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::CatalogError;
use crate::models::QueryParams;
use crate::query::{CacheConfig, Endpoint, Fetcher, QueryCache, QueryKey, QueryObserver};
use crate::store::{FileStorage, Storage, VideoStore};
use crate::youtube::ApiClient;

/// Everything the read-model surface needs: one cache shared by the listing
/// and search observers, and the store their results flow into.
pub struct Catalog<F = ApiClient> {
    pub cache: Arc<QueryCache<F>>,
    pub videos: QueryObserver<F>,
    pub search: QueryObserver<F>,
    pub store: VideoStore,
}

impl Catalog<ApiClient> {
    pub fn from_config(config: &Config) -> Arc<Self> {
        let client = ApiClient::new(config.base_url.clone(), config.api_key.clone());
        let cache_config = CacheConfig {
            stale_time: config.stale_time,
            ..Default::default()
        };
        Self::new(client, cache_config, Arc::new(FileStorage::new(&config.storage_dir)))
    }
}

impl<F: Fetcher> Catalog<F> {
    pub fn new(fetcher: F, config: CacheConfig, storage: Arc<dyn Storage>) -> Arc<Self> {
        let cache = QueryCache::new(fetcher, config);
        Arc::new(Self {
            videos: QueryObserver::new(Arc::clone(&cache), Endpoint::Videos),
            search: QueryObserver::new(Arc::clone(&cache), Endpoint::Search),
            store: VideoStore::new(storage),
            cache,
        })
    }

    fn is_active(&self, key: &QueryKey) -> bool {
        let observer = match key.endpoint {
            Endpoint::Videos => &self.videos,
            Endpoint::Search => &self.search,
        };
        observer.active().as_ref() == Some(key)
    }

    /// Fetches the default listing once and seeds it into the cache and the
    /// store. Only logs on failure.
    pub async fn seed_initial(&self) {
        let key = QueryKey::new(Endpoint::Videos, QueryParams::default());
        match self.cache.fetcher().fetch(&key).await {
            Ok(page) => {
                info!(items = page.items.len(), "Seeded default listing");
                self.cache.seed(&key, page.clone());
                self.store.ingest(page);
            }
            Err(CatalogError::MissingApiKey) => {
                warn!("No API key configured, skipping initial listing");
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch initial listing");
            }
        }
    }

    /// Ingests the collection of an observer's active key into the store whenever
    /// that key's entry changes or becomes active. Stale data counts; the store
    /// follows what the observer shows.
    pub fn spawn_store_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let updates = self.cache.subscribe();
        let catalog = Arc::clone(self);
        tokio::spawn(async move {
            while let Ok(key) = updates.recv().await {
                if !catalog.is_active(&key) {
                    continue;
                }
                if let Some(page) = catalog.cache.snapshot(&key).collection {
                    debug!(?key, "Syncing result into store");
                    catalog.store.ingest((*page).clone());
                }
            }
        })
    }
}
