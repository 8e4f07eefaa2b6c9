use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::CATEGORIES;
use crate::models::{ErrorView, MediaType, QueryParams, VideoRecord, VideoSummary};
use crate::query::{QueryResult, QueryStatus};
use crate::store::StoreState;

pub use crate::catalog::Catalog as AppState;

#[derive(Debug, Deserialize)]
pub struct CollectionRequest {
    pub q: Option<String>,
    pub r#type: Option<MediaType>,
    /// Wait for the fetch to settle instead of returning the cached snapshot.
    #[serde(default)]
    pub wait: bool,
}

impl CollectionRequest {
    pub fn params(&self) -> QueryParams {
        QueryParams {
            q: self.q.clone(),
            media_type: self.r#type.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub status: QueryStatus,
    pub videos: Vec<VideoSummary>,
    pub next_page_token: Option<String>,
    pub total_results: Option<u64>,
    pub is_loading: bool,
    pub is_error: bool,
    pub is_success: bool,
    pub error: Option<ErrorView>,
}

impl CollectionResponse {
    pub fn new(result: QueryResult, now: DateTime<Utc>) -> Self {
        let collection = result.collection.as_deref();
        Self {
            status: result.status,
            videos: collection
                .map(|page| page.items.iter().map(|v| VideoSummary::new(v, now)).collect())
                .unwrap_or_default(),
            next_page_token: collection.and_then(|page| page.next_page_token.clone()),
            total_results: collection.map(|page| page.page_info.total_results),
            is_loading: result.is_loading,
            is_error: result.is_error,
            is_success: result.is_success,
            error: result.error.as_ref().map(ErrorView::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChannelRequest {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category_id: String,
}

#[derive(Debug, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
}

pub fn categories() -> Vec<Category> {
    CATEGORIES
        .iter()
        .map(|&(id, label)| Category { id, label })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub selected_category_id: String,
    pub channel_ids: String,
    pub total: usize,
    pub videos: Vec<VideoRecord>,
}

impl StoreResponse {
    /// `videos` is the filtered view; `total` counts the whole collection.
    pub fn new(state: StoreState, videos: Vec<VideoRecord>) -> Self {
        Self {
            selected_category_id: state.selected_category_id,
            channel_ids: state.channel_ids,
            total: state.collection.items.len(),
            videos,
        }
    }
}
