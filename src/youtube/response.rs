use std::collections::BTreeMap;
use serde::Deserialize;

use crate::format;
use crate::models::{
    PageInfo, RawVideoId, Snippet, Statistics, Thumbnail, VideoCollectionPage, VideoRecord,
};

/// Shape shared by the `/videos` and `/search` list responses. Only the id
/// shape differs between the two, and that is resolved on conversion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiListResponse {
    kind: Option<String>,
    items: Option<Vec<ApiVideo>>,
    next_page_token: Option<String>,
    page_info: Option<ApiPageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPageInfo {
    total_results: Option<u64>,
    results_per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideo {
    id: Option<RawVideoId>,
    snippet: Option<ApiSnippet>,
    content_details: Option<ContentDetails>,
    statistics: Option<ApiStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSnippet {
    title: Option<String>,
    description: Option<String>,
    channel_id: Option<String>,
    channel_title: Option<String>,
    published_at: Option<String>,
    category_id: Option<String>,
    tags: Option<Vec<String>>,
    thumbnails: Option<BTreeMap<String, ApiThumbnail>>,
}

#[derive(Debug, Deserialize)]
struct ApiThumbnail {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStatistics {
    view_count: Option<Count>,
    like_count: Option<Count>,
    comment_count: Option<Count>,
    favorite_count: Option<Count>,
}

// Counts arrive as decimal strings, but some fixtures and proxies send numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Text(String),
    Number(u64),
}

impl Count {
    fn value(&self) -> Option<u64> {
        match self {
            Count::Text(text) => text.parse::<u64>().ok(),
            Count::Number(n) => Some(*n),
        }
    }
}

fn count(value: &Option<Count>) -> Option<u64> {
    value.as_ref().and_then(Count::value)
}

impl ApiListResponse {
    pub(super) fn into_page(self) -> VideoCollectionPage {
        let page_info = self.page_info.map(|info| PageInfo {
            total_results: info.total_results.unwrap_or_default(),
            results_per_page: info.results_per_page.unwrap_or_default(),
        });

        VideoCollectionPage {
            kind: self.kind.unwrap_or_default(),
            items: self
                .items
                .unwrap_or_default()
                .into_iter()
                .map(ApiVideo::into_record)
                .collect(),
            next_page_token: self.next_page_token,
            page_info: page_info.unwrap_or_default(),
        }
    }
}

impl ApiVideo {
    fn into_record(self) -> VideoRecord {
        let snippet = self.snippet.map(|s| Snippet {
            title: s.title.unwrap_or_default(),
            description: s.description.unwrap_or_default(),
            channel_id: s.channel_id.unwrap_or_default(),
            channel_title: s.channel_title.unwrap_or_default(),
            published_at: format::parse_timestamp(s.published_at.as_deref()),
            category_id: s.category_id.unwrap_or_default(),
            tags: s.tags.unwrap_or_default(),
            thumbnails: s
                .thumbnails
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(name, thumb)| {
                    let url = thumb.url?;
                    Some((name, Thumbnail { url, width: thumb.width, height: thumb.height }))
                })
                .collect(),
        });

        let duration = self.content_details.and_then(|c| c.duration);

        VideoRecord {
            id: format::resolve_video_id(self.id.as_ref()),
            snippet: snippet.unwrap_or_default(),
            duration_secs: duration.as_deref().map(|d| format::parse_duration(Some(d))),
            duration,
            statistics: self.statistics.map(|s| Statistics {
                view_count: count(&s.view_count),
                like_count: count(&s.like_count),
                comment_count: count(&s.comment_count),
                favorite_count: count(&s.favorite_count),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_item_is_normalized() {
        let body = r#"{
            "kind": "youtube#videoListResponse",
            "items": [{
                "kind": "youtube#video",
                "id": "video1",
                "snippet": {
                    "publishedAt": "2024-01-01T00:00:00Z",
                    "channelId": "channel1",
                    "title": "Test Video 1",
                    "channelTitle": "Channel 1",
                    "categoryId": "10",
                    "tags": ["tag1"],
                    "thumbnails": {"default": {"url": "thumb1.jpg", "width": 120, "height": 90}}
                },
                "contentDetails": {"duration": "PT5M30S"},
                "statistics": {"viewCount": "1000", "likeCount": 100}
            }],
            "nextPageToken": "next-token",
            "pageInfo": {"totalResults": 1, "resultsPerPage": 25}
        }"#;

        let page = serde_json::from_str::<ApiListResponse>(body).unwrap().into_page();
        assert_eq!(page.kind, "youtube#videoListResponse");
        assert_eq!(page.next_page_token.as_deref(), Some("next-token"));
        assert_eq!(page.page_info.results_per_page, 25);

        let video = &page.items[0];
        assert_eq!(video.id.as_deref(), Some("video1"));
        assert_eq!(video.duration_secs, Some(330));
        assert_eq!(video.snippet.category_id, "10");
        assert_eq!(video.snippet.published_at.map(|t| t.timestamp()), Some(1704067200));
        let stats = video.statistics.as_ref().unwrap();
        assert_eq!(stats.view_count, Some(1000));
        assert_eq!(stats.like_count, Some(100));
        assert_eq!(stats.comment_count, None);
    }

    #[test]
    fn test_search_item_and_missing_fields() {
        let body = r#"{
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "abc"}, "snippet": {"title": "Found"}},
                {"id": {"kind": "youtube#channel", "channelId": "UC1"}},
                {"snippet": {"publishedAt": "not a date"}}
            ]
        }"#;

        let page = serde_json::from_str::<ApiListResponse>(body).unwrap().into_page();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].id.as_deref(), Some("abc"));
        assert_eq!(page.items[1].id, None);
        assert_eq!(page.items[2].id, None);
        assert_eq!(page.items[2].snippet.published_at, None);
        assert_eq!(page.items[0].duration_secs, None);
        assert_eq!(page.page_info, PageInfo::default());
    }
}
