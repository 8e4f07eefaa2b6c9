use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::errors::{CatalogError, ErrorKind};
use crate::models::ErrorView;

#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogError),
    InvalidRequest(String),
    NotFound(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Catalog(err) => {
                let (status, error_code) = match err.kind() {
                    ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
                    ErrorKind::BadRequest => (StatusCode::BAD_REQUEST, "bad_request"),
                    ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                    ErrorKind::ServerError | ErrorKind::Network => (StatusCode::BAD_GATEWAY, "upstream_error"),
                    ErrorKind::Configuration => (StatusCode::SERVICE_UNAVAILABLE, "configuration_error"),
                    ErrorKind::Other => (StatusCode::INTERNAL_SERVER_ERROR, "unknown_error"),
                };
                let view = ErrorView::from(&err);

                (status, Json(json!({
                    "error": error_code,
                    "message": view.message,
                    "kind": view.kind,
                    "likely_causes": view.likely_causes,
                    "remediation": view.remediation,
                    "params": view.params,
                }))).into_response()
            },
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({
                    "error": "invalid_request",
                    "message": msg
                }))).into_response()
            },
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({
                    "error": "not_found",
                    "message": msg
                }))).into_response()
            }
        }
    }
}
