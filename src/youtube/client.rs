use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{Params, TransportError, FORBIDDEN_LIKELY_CAUSES};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Error,
}

#[derive(Debug, Deserialize)]
struct Error {
    message: Option<String>,
}

/// The single point of egress to the YouTube Data API. Every request carries
/// the configured key and goes to the configured base address. Failures are
/// classified here; retries are not.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
    ) -> Result<T, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?params, "Sending request");

        let mut request = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .query(params);

        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::OK => (),
            reqwest::StatusCode::FORBIDDEN => {
                let message = upstream_message(resp).await;
                warn!(path, message = message.as_deref(), "Forbidden by the YouTube API");
                return Err(TransportError::Forbidden {
                    message,
                    likely_causes: FORBIDDEN_LIKELY_CAUSES,
                });
            }
            reqwest::StatusCode::BAD_REQUEST => {
                let message = upstream_message(resp).await;
                warn!(path, ?params, message = message.as_deref(), "Bad request to the YouTube API");
                return Err(TransportError::BadRequest {
                    message,
                    params: params.clone(),
                });
            }
            reqwest::StatusCode::NOT_FOUND => return Err(TransportError::NotFound),
            status if status.is_server_error() => return Err(TransportError::ServerError(status)),
            status => {
                let body = resp
                    .text()
                    .await
                    .map_err(|e| TransportError::Parse(e.to_string()))?;
                warn!(path, status = status.as_u16(), %body, "Unknown status code");
                return Err(TransportError::UnknownStatus(status));
            }
        }

        resp.json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))
    }
}

// An unreadable error body yields None; the status still classifies the failure.
async fn upstream_message(resp: reqwest::Response) -> Option<String> {
    resp.json::<ErrorResponse>()
        .await
        .ok()
        .and_then(|body| body.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::Value;

    fn params() -> Params {
        vec![
            ("part".to_string(), "snippet".to_string()),
            ("maxResults".to_string(), "25".to_string()),
        ]
    }

    #[tokio::test]
    async fn test_get_attaches_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "secret".into()),
                Matcher::UrlEncoded("part".into(), "snippet".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Some("secret".to_string()));
        let body: Value = client.get("/videos", &params()).await.unwrap();

        assert_eq!(body["items"], Value::Array(Vec::new()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forbidden_is_classified() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"API key not valid"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Some("secret".to_string()));
        let err = client.get::<Value>("/videos", &params()).await.unwrap_err();

        match err {
            TransportError::Forbidden { message, likely_causes } => {
                assert_eq!(message.as_deref(), Some("API key not valid"));
                assert_eq!(likely_causes.len(), 4);
            }
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forbidden_without_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None);
        let err = client.get::<Value>("/videos", &params()).await.unwrap_err();
        assert!(matches!(err, TransportError::Forbidden { message: None, .. }));
    }

    #[tokio::test]
    async fn test_bad_request_echoes_params() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid value"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Some("secret".to_string()));
        let err = client.get::<Value>("/search", &params()).await.unwrap_err();

        match err {
            TransportError::BadRequest { message, params: sent } => {
                assert_eq!(message.as_deref(), Some("Invalid value"));
                assert_eq!(sent, params());
            }
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_statuses() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server.mock("GET", "/missing").match_query(Matcher::Any).with_status(404).create_async().await;
        let _broken = server.mock("GET", "/broken").match_query(Matcher::Any).with_status(503).create_async().await;
        let _limited = server.mock("GET", "/limited").match_query(Matcher::Any).with_status(429).create_async().await;

        let client = ApiClient::new(server.url(), None);
        let missing = client.get::<Value>("/missing", &params()).await.unwrap_err();
        let broken = client.get::<Value>("/broken", &params()).await.unwrap_err();
        let limited = client.get::<Value>("/limited", &params()).await.unwrap_err();

        assert!(matches!(missing, TransportError::NotFound));
        assert!(matches!(broken, TransportError::ServerError(s) if s.as_u16() == 503));
        assert!(matches!(limited, TransportError::UnknownStatus(s) if s.as_u16() == 429));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let client = ApiClient::new("http://127.0.0.1:1", None);
        let err = client.get::<Value>("/videos", &params()).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
