use crate::errors::{CatalogError, Params};
use crate::models::{QueryParams, VideoCollectionPage};
use super::response::ApiListResponse;
use super::{check_api_key, param, request_failed, ApiClient, MAX_RESULTS};

const ENDPOINT: &str = "/search";

fn build_params(params: &QueryParams) -> Params {
    let mut sent = vec![
        param("part", "snippet"),
        param("maxResults", MAX_RESULTS),
    ];
    if let Some(q) = params.query() {
        sent.push(param("q", q));
    }
    sent.push(param("type", params.media_type.as_str()));
    sent
}

/// Runs a search. Upstream ids come back as `{kind, videoId}` objects and are
/// resolved to plain ids here.
pub async fn search_videos(
    client: &ApiClient,
    params: &QueryParams,
) -> Result<VideoCollectionPage, CatalogError> {
    check_api_key(client)?;

    let sent = build_params(params);
    let response: ApiListResponse = client
        .get(ENDPOINT, &sent)
        .await
        .map_err(|e| request_failed(ENDPOINT, &sent, e))?;

    Ok(response.into_page())
}
