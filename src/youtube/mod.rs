pub mod channels;
pub mod client;
pub mod search;
pub mod videos;
mod response;

use tracing::error;

use crate::errors::{CatalogError, Params, TransportError};

pub use client::ApiClient;

/// Page size for every list request.
pub const MAX_RESULTS: u32 = 25;

#[cfg(not(test))]
fn check_api_key(client: &ApiClient) -> Result<(), CatalogError> {
    if !client.has_api_key() {
        return Err(CatalogError::MissingApiKey);
    }
    Ok(())
}

// Tests talk to a mock server and never carry a real key.
#[cfg(test)]
fn check_api_key(_client: &ApiClient) -> Result<(), CatalogError> {
    Ok(())
}

fn request_failed(endpoint: &'static str, params: &Params, source: TransportError) -> CatalogError {
    error!(
        endpoint,
        status = source.status(),
        ?params,
        error = %source,
        "YouTube API request failed"
    );
    CatalogError::Request {
        endpoint,
        params: params.clone(),
        source,
    }
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}
