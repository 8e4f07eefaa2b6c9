use crate::errors::{CatalogError, Params};
use crate::models::{QueryParams, VideoCollectionPage};
use super::response::ApiListResponse;
use super::{check_api_key, param, request_failed, ApiClient, MAX_RESULTS};

const ENDPOINT: &str = "/videos";

/// Statistics are not available alongside a free-text query on this endpoint.
const FULL_PARTS: &str = "id,statistics,snippet,contentDetails";
const SNIPPET_ONLY: &str = "snippet";

const CHART: &str = "mostPopular";

fn build_params(params: &QueryParams) -> Params {
    let query = params.query();
    let mut sent = vec![
        param("part", if query.is_some() { SNIPPET_ONLY } else { FULL_PARTS }),
        param("maxResults", MAX_RESULTS),
    ];

    match query {
        Some(q) => sent.push(param("q", q)),
        None => sent.push(param("chart", CHART)),
    }

    sent.push(param("type", params.media_type.as_str()));
    sent
}

/// Lists the most popular videos, or runs a free-text query against the
/// videos endpoint. Ids in the result are plain strings upstream.
pub async fn get_videos(
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
