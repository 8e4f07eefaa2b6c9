use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, ErrorKind, Params, TransportError};
use crate::format;

/// Reserved category id meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Thumbnail variants from best to worst resolution.
const THUMBNAIL_PREFERENCE: &[&str] = &["maxres", "standard", "high", "medium", "default"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// The two identifier shapes the upstream API sends for a video: a plain string
/// from the videos endpoint, a resource object from the search endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawVideoId {
    Plain(String),
    Resource {
        kind: Option<String>,
        #[serde(rename = "videoId")]
        video_id: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub category_id: String,
    pub tags: Vec<String>,
    /// Keyed by resolution name (`default`, `medium`, `high`, `standard`, `maxres`).
    pub thumbnails: BTreeMap<String, Thumbnail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub favorite_count: Option<u64>,
}

/// One media item with its identifier already resolved to the canonical form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Option<String>,
    pub snippet: Snippet,
    /// Raw ISO-8601 duration as sent upstream, when content details were requested.
    pub duration: Option<String>,
    pub duration_secs: Option<u64>,
    pub statistics: Option<Statistics>,
}

impl VideoRecord {
    pub fn best_thumbnail(&self) -> Option<&Thumbnail> {
        THUMBNAIL_PREFERENCE
            .iter()
            .find_map(|name| self.snippet.thumbnails.get(*name))
    }

    pub fn view_count(&self) -> u64 {
        self.statistics
            .as_ref()
            .and_then(|s| s.view_count)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub total_results: u64,
    pub results_per_page: u64,
}

/// A page of records in upstream order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoCollectionPage {
    pub kind: String,
    pub items: Vec<VideoRecord>,
    pub next_page_token: Option<String>,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub custom_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Channel,
    Playlist,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Channel => "channel",
            MediaType::Playlist => "playlist",
        }
    }
}

/// Everything that decides which upstream call is made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryParams {
    pub q: Option<String>,
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
}

impl QueryParams {
    pub fn search(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            media_type: MediaType::Video,
        }
    }

    /// Blank search text is treated the same as no search text.
    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Card-sized view of a record, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    pub id: Option<String>,
    pub title: String,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
    pub duration: String,
    pub views: String,
    pub uploaded: String,
}

impl VideoSummary {
    pub fn new(video: &VideoRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: video.id.clone(),
            title: video.snippet.title.clone(),
            channel_title: video.snippet.channel_title.clone(),
            thumbnail_url: video.best_thumbnail().map(|t| t.url.clone()),
            duration: format::format_duration(video.duration_secs.unwrap_or_default()),
            views: format::format_views(video.view_count()),
            uploaded: video
                .snippet
                .published_at
                .map(|at| format::format_time_ago(at, now))
                .unwrap_or_default(),
        }
    }
}

/// Detail-page view of a record. Uses the "Yesterday" label variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoDetail {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub category: Option<&'static str>,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub duration: String,
    pub views: String,
    pub likes: String,
    pub comments: String,
    pub uploaded: String,
}

impl VideoDetail {
    pub fn new(video: &VideoRecord, now: DateTime<Utc>) -> Self {
        let stats = video.statistics.clone().unwrap_or_default();
        Self {
            id: video.id.clone(),
            title: video.snippet.title.clone(),
            description: video.snippet.description.clone(),
            channel_id: video.snippet.channel_id.clone(),
            channel_title: video.snippet.channel_title.clone(),
            category: format::category_label(&video.snippet.category_id),
            tags: video.snippet.tags.clone(),
            thumbnail_url: video.best_thumbnail().map(|t| t.url.clone()),
            duration: format::format_duration_str(video.duration.as_deref()),
            views: format::format_views(stats.view_count.unwrap_or_default()),
            likes: format::format_views(stats.like_count.unwrap_or_default()),
            comments: format::format_views(stats.comment_count.unwrap_or_default()),
            uploaded: video
                .snippet
                .published_at
                .map(|at| format::format_upload_date(at, now))
                .unwrap_or_default(),
        }
    }
}

const FORBIDDEN_REMEDIATION: &[&str] = &[
    "Go to Google Cloud Console (https://console.cloud.google.com/apis/credentials)",
    "Check your API key restrictions",
    "Add your domain to allowed referrers",
    "Ensure YouTube Data API v3 is enabled",
];

/// What the error boundary renders. Built only from the structured error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub likely_causes: Vec<&'static str>,
    pub remediation: Vec<&'static str>,
    pub params: Option<Params>,
    pub hint: &'static str,
}

impl From<&CatalogError> for ErrorView {
    fn from(err: &CatalogError) -> Self {
        let transport = err.transport();
        let message = transport
            .and_then(|t| t.upstream_message())
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());

        let mut view = ErrorView {
            kind: err.kind(),
            status: transport.and_then(|t| t.status()),
            message,
            likely_causes: Vec::new(),
            remediation: Vec::new(),
            params: None,
            hint: "Something went wrong while loading videos. Please try again.",
        };

        match transport {
            Some(TransportError::Forbidden { likely_causes, .. }) => {
                view.likely_causes = likely_causes.to_vec();
                view.remediation = FORBIDDEN_REMEDIATION.to_vec();
                view.hint = "Common causes for 403 errors are listed below.";
            }
            Some(TransportError::BadRequest { params, .. }) => {
                view.params = Some(params.clone());
                view.hint = "The request parameters are invalid.";
            }
            _ => {}
        }

        if err.kind() == ErrorKind::Configuration {
            view.hint = "Set YOUTUBE_API_KEY and restart the service.";
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FORBIDDEN_LIKELY_CAUSES;
    use chrono::TimeZone;

    fn record() -> VideoRecord {
        let mut thumbnails = BTreeMap::new();
        thumbnails.insert(
            "medium".to_string(),
            Thumbnail { url: "thumb_medium.jpg".to_string(), width: Some(320), height: Some(180) },
        );
        thumbnails.insert(
            "high".to_string(),
            Thumbnail { url: "thumb_high.jpg".to_string(), width: Some(480), height: Some(360) },
        );
        VideoRecord {
            id: Some("video1".to_string()),
            snippet: Snippet {
                title: "Test Video 1".to_string(),
                channel_id: "channel1".to_string(),
                channel_title: "Channel 1".to_string(),
                published_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                category_id: "10".to_string(),
                thumbnails,
                ..Default::default()
            },
            duration: Some("PT5M30S".to_string()),
            duration_secs: Some(330),
            statistics: Some(Statistics {
                view_count: Some(1500),
                like_count: Some(100),
                comment_count: Some(10),
                favorite_count: Some(0),
            }),
        }
    }

    #[test]
    fn test_summary_labels() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let summary = VideoSummary::new(&record(), now);
        assert_eq!(summary.thumbnail_url.as_deref(), Some("thumb_high.jpg"));
        assert_eq!(summary.duration, "5m 30s");
        assert_eq!(summary.views, "1.5K");
        assert_eq!(summary.uploaded, "1 day ago");
    }

    #[test]
    fn test_detail_uses_yesterday_label() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let detail = VideoDetail::new(&record(), now);
        assert_eq!(detail.uploaded, "Yesterday");
        assert_eq!(detail.category, Some("Music"));
        assert_eq!(detail.likes, "100");
    }

    #[test]
    fn test_blank_query_is_no_query() {
        assert_eq!(QueryParams::search("  ").query(), None);
        assert_eq!(QueryParams::search("cats").query(), Some("cats"));
    }

    #[test]
    fn test_error_view_for_forbidden() {
        let err = CatalogError::Request {
            endpoint: "/videos",
            params: Vec::new(),
            source: TransportError::Forbidden {
                message: Some("The request cannot be completed because you have exceeded your quota.".to_string()),
                likely_causes: FORBIDDEN_LIKELY_CAUSES,
            },
        };
        let view = ErrorView::from(&err);
        assert_eq!(view.kind, ErrorKind::Forbidden);
        assert_eq!(view.status, Some(403));
        assert_eq!(view.likely_causes.len(), 4);
        assert_eq!(view.remediation.len(), 4);
        assert!(view.message.starts_with("The request cannot be completed"));
    }

    #[test]
    fn test_error_view_for_server_error_is_generic() {
        let err = CatalogError::Request {
            endpoint: "/search",
            params: Vec::new(),
            source: TransportError::ServerError(reqwest::StatusCode::BAD_GATEWAY),
        };
        let view = ErrorView::from(&err);
        assert_eq!(view.kind, ErrorKind::ServerError);
        assert!(view.likely_causes.is_empty());
        assert!(view.params.is_none());
    }
}
