use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    categories, AppState, Category, CategoryRequest, ChannelRequest, CollectionRequest,
    CollectionResponse, StoreResponse,
};
use crate::models::{ChannelRecord, VideoDetail};
use crate::query::QueryObserver;
use crate::youtube::{channels::search_channel, ApiClient};

async fn collection(
    observer: &QueryObserver<ApiClient>,
    request: CollectionRequest,
) -> CollectionResponse {
    let params = request.params();
    debug!(?params, wait = request.wait, "Collection requested");

    let result = if request.wait {
        observer.fetch_settled(params).await
    } else {
        observer.set_params(params)
    };
    CollectionResponse::new(result, Utc::now())
}

async fn videos_handler(
    State(state): State<Arc<AppState>>,
    request: Result<Query<CollectionRequest>, QueryRejection>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let Query(request) = request.map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    Ok(Json(collection(&state.videos, request).await))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    request: Result<Query<CollectionRequest>, QueryRejection>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let Query(request) = request.map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    Ok(Json(collection(&state.search, request).await))
}

async fn refresh_handler(State(state): State<Arc<AppState>>) -> Json<CollectionResponse> {
    for observer in [&state.videos, &state.search] {
        if let Some(key) = observer.active() {
            state.cache.invalidate(&key);
        }
    }
    Json(CollectionResponse::new(state.videos.snapshot(), Utc::now()))
}

async fn video_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<VideoDetail>, ApiError> {
    let video = state
        .store
        .video_by_id(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Video {} is not in the current collection", id)))?;
    Ok(Json(VideoDetail::new(&video, Utc::now())))
}

async fn channels_handler(
    State(state): State<Arc<AppState>>,
    request: Result<Query<ChannelRequest>, QueryRejection>,
) -> Result<Json<Vec<ChannelRecord>>, ApiError> {
    let Query(request) = request.map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    // Without an explicit id, look up every channel in the current collection.
    let channel_id = match request.id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => state.store.channel_ids_aggregate(),
    };
    if channel_id.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let channels = search_channel(state.cache.fetcher(), &channel_id).await?;
    Ok(Json(channels))
}

async fn categories_handler() -> Json<Vec<Category>> {
    Json(categories())
}

fn store_response(state: &AppState) -> Json<StoreResponse> {
    Json(StoreResponse::new(
        state.store.state(),
        state.store.filtered_collection(),
    ))
}

async fn store_handler(State(state): State<Arc<AppState>>) -> Json<StoreResponse> {
    store_response(&state)
}

async fn category_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<Json<StoreResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    state.store.apply_category_filter(&payload.category_id);
    Ok(store_response(&state))
}

async fn channel_ids_handler(State(state): State<Arc<AppState>>) -> Json<StoreResponse> {
    state.store.derive_channel_ids();
    store_response(&state)
}

async fn clear_handler(State(state): State<Arc<AppState>>) -> Json<StoreResponse> {
    state.store.clear_filters();
    store_response(&state)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/videos", get(videos_handler))
        .route("/api/videos/:id", get(video_handler))
        .route("/api/search", get(search_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/channels", get(channels_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/store", get(store_handler))
        .route("/api/store/category", post(category_handler))
        .route("/api/store/channel-ids", post(channel_ids_handler))
        .route("/api/store/clear", post(clear_handler))
        .with_state(state)
}
