use serde::Deserialize;

use crate::errors::CatalogError;
use crate::format;
use crate::models::ChannelRecord;
use super::{check_api_key, param, request_failed, ApiClient};

const ENDPOINT: &str = "/channels";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    items: Option<Vec<ApiChannel>>,
}

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: String,
    snippet: Option<ChannelSnippet>,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "customUrl")]
    custom_url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

/// Looks up channel snippets. `channel_id` may be a single id or the
/// comma-joined aggregate kept by the store.
pub async fn search_channel(
    client: &ApiClient,
    channel_id: &str,
) -> Result<Vec<ChannelRecord>, CatalogError> {
    check_api_key(client)?;

    let sent = vec![param("id", channel_id), param("part", "snippet")];
    let response: ApiResponse = client
        .get(ENDPOINT, &sent)
        .await
        .map_err(|e| request_failed(ENDPOINT, &sent, e))?;

    let channels = response
        .items
        .unwrap_or_default()
        .into_iter()
        .map(|channel| {
            let snippet = channel.snippet;
            ChannelRecord {
                id: channel.id,
                title: snippet.as_ref().and_then(|s| s.title.clone()).unwrap_or_default(),
                description: snippet
                    .as_ref()
                    .and_then(|s| s.description.clone())
                    .unwrap_or_default(),
                custom_url: snippet.as_ref().and_then(|s| s.custom_url.clone()),
                thumbnail_url: snippet
                    .as_ref()
                    .and_then(|s| s.thumbnails.as_ref())
                    .and_then(|t| t.default.as_ref())
                    .and_then(|d| d.url.clone()),
                published_at: format::parse_timestamp(
                    snippet.as_ref().and_then(|s| s.published_at.as_deref()),
                ),
            }
        })
        .collect();

    Ok(channels)
}
