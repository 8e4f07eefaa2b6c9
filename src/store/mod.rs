//! Client state store: the last fetched collection plus state derived from it.
//!
//! State changes only through the action methods. Every action persists the
//! full state under [`STORAGE_KEY`]; loading it back is an explicit
//! [`VideoStore::rehydrate`] call, never part of construction.

pub mod storage;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::StorageError;
use crate::models::{VideoCollectionPage, VideoRecord, ALL_CATEGORIES};

pub use storage::{FileStorage, Storage};

pub const STORAGE_KEY: &str = "video-store";

const STORAGE_VERSION: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub collection: VideoCollectionPage,
    pub selected_category_id: String,
    pub filtered_by_category: Option<Vec<VideoRecord>>,
    pub channel_ids: String,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            collection: VideoCollectionPage::default(),
            selected_category_id: ALL_CATEGORIES.to_string(),
            filtered_by_category: None,
            channel_ids: String::new(),
        }
    }
}

impl StoreState {
    fn filter_by_category(&mut self, category_id: &str) {
        let filtered = if category_id == ALL_CATEGORIES {
            self.collection.items.clone()
        } else {
            self.collection
                .items
                .iter()
                .filter(|item| item.snippet.category_id == category_id)
                .cloned()
                .collect()
        };
        self.filtered_by_category = Some(filtered);
        self.selected_category_id = category_id.to_string();
    }

    fn join_channel_ids(&mut self) {
        self.channel_ids = self
            .collection
            .items
            .iter()
            .map(|item| item.snippet.channel_id.as_str())
            .collect::<Vec<_>>()
            .join(",");
    }
}

#[derive(Deserialize)]
struct PersistedState {
    state: StoreState,
    version: u32,
}

#[derive(Serialize)]
struct PersistedStateRef<'a> {
    state: &'a StoreState,
    version: u32,
}

pub struct VideoStore {
    state: RwLock<StoreState>,
    storage: Arc<dyn Storage>,
    // Orders saves so the last transition is the one left on disk.
    persist: Mutex<()>,
}

impl VideoStore {
    /// Starts empty regardless of what the storage holds.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            storage,
            persist: Mutex::new(()),
        }
    }

    /// Applies a transition and persists the result. The blob is serialized
    /// under the state lock; the write happens after the lock is released.
    fn mutate(&self, action: &'static str, apply: impl FnOnce(&mut StoreState)) {
        let (blob, _persist) = {
            let mut state = self.state.write();
            apply(&mut state);
            debug!(action, items = state.collection.items.len(), "Store updated");

            let blob = serde_json::to_string(&PersistedStateRef {
                state: &state,
                version: STORAGE_VERSION,
            });
            (blob, self.persist.lock())
        };

        let result = blob
            .map_err(StorageError::from)
            .and_then(|json| self.storage.save(STORAGE_KEY, &json));
        if let Err(e) = result {
            warn!(action, error = %e, "Failed to persist store state");
        }
    }

    /// Loads the persisted state, if any. Returns whether anything was loaded.
    pub fn rehydrate(&self) -> Result<bool, StorageError> {
        let Some(json) = self.storage.load(STORAGE_KEY)? else {
            return Ok(false);
        };
        let persisted: PersistedState = serde_json::from_str(&json)?;
        if persisted.version != STORAGE_VERSION {
            warn!(version = persisted.version, "Persisted store has an unknown version");
        }
        *self.state.write() = persisted.state;
        Ok(true)
    }

    // --- Actions ---

    pub fn set_videos(&self, page: VideoCollectionPage) {
        self.mutate("set_videos", |state| state.collection = page);
    }

    pub fn set_selected_category(&self, category_id: &str) {
        self.mutate("set_selected_category", |state| {
            state.selected_category_id = category_id.to_string()
        });
    }

    /// Stores the records whose category equals `category_id` and selects it.
    /// `"all"` stores the full collection.
    pub fn apply_category_filter(&self, category_id: &str) {
        self.mutate("apply_category_filter", |state| {
            state.filter_by_category(category_id)
        });
    }

    /// Comma-joins every record's channel id, in order, duplicates kept.
    pub fn derive_channel_ids(&self) {
        self.mutate("derive_channel_ids", StoreState::join_channel_ids);
    }

    pub fn clear_filters(&self) {
        self.mutate("clear_filters", |state| {
            state.selected_category_id = ALL_CATEGORIES.to_string();
            state.filtered_by_category = None;
            state.channel_ids.clear();
        });
    }

    /// Replaces the collection and recomputes every derived field against the
    /// current category selection, as one transition.
    pub fn ingest(&self, page: VideoCollectionPage) {
        self.mutate("ingest", |state| {
            state.collection = page;
            let selected = state.selected_category_id.clone();
            state.filter_by_category(&selected);
            state.join_channel_ids();
        });
    }

    // --- Selectors ---

    pub fn state(&self) -> StoreState {
        self.state.read().clone()
    }

    pub fn current_collection(&self) -> VideoCollectionPage {
        self.state.read().collection.clone()
    }

    /// The filtered subset, or the whole collection when no category is selected.
    pub fn filtered_collection(&self) -> Vec<VideoRecord> {
        let state = self.state.read();
        let selected = state.selected_category_id.as_str();
        if selected.is_empty() || selected == ALL_CATEGORIES {
            return state.collection.items.clone();
        }
        state.filtered_by_category.clone().unwrap_or_default()
    }

    pub fn selected_category_id(&self) -> String {
        self.state.read().selected_category_id.clone()
    }

    pub fn channel_ids_aggregate(&self) -> String {
        self.state.read().channel_ids.clone()
    }

    pub fn video_by_id(&self, id: &str) -> Option<VideoRecord> {
        self.state
            .read()
            .collection
            .items
            .iter()
            .find(|item| item.id.as_deref() == Some(id))
            .cloned()
    }
}
