use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Query parameters as they were sent upstream, kept for diagnostics.
pub type Params = Vec<(String, String)>;

pub const FORBIDDEN_LIKELY_CAUSES: &[&str] = &[
    "API key restrictions in Google Cloud Console",
    "YouTube Data API v3 not enabled",
    "Daily quota limit exceeded (10,000 units/day)",
    "Domain not allowed in HTTP referrer restrictions",
];

/// Classification of a failure. Consumers branch on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Forbidden,
    BadRequest,
    NotFound,
    ServerError,
    Network,
    Configuration,
    Other,
}

impl ErrorKind {
    /// Forbidden and BadRequest point at a durable problem with the key or the
    /// request; a missing key will not appear between attempts either.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            ErrorKind::Forbidden | ErrorKind::BadRequest | ErrorKind::Configuration
        )
    }
}

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Forbidden: {}", message_or(.message, "access denied by the YouTube API"))]
    Forbidden {
        message: Option<String>,
        likely_causes: &'static [&'static str],
    },
    #[error("Bad request: {} (sent: {})", message_or(.message, "invalid parameters"), join_params(.params))]
    BadRequest { message: Option<String>, params: Params },
    #[error("Not found")]
    NotFound,
    #[error("Server error: {0}")]
    ServerError(StatusCode),
    #[error("Unknown status code: {0}")]
    UnknownStatus(StatusCode),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Forbidden { .. } => ErrorKind::Forbidden,
            TransportError::BadRequest { .. } => ErrorKind::BadRequest,
            TransportError::NotFound => ErrorKind::NotFound,
            TransportError::ServerError(_) => ErrorKind::ServerError,
            TransportError::Network(_) => ErrorKind::Network,
            TransportError::UnknownStatus(_) | TransportError::Parse(_) => ErrorKind::Other,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Forbidden { .. } => Some(403),
            TransportError::BadRequest { .. } => Some(400),
            TransportError::NotFound => Some(404),
            TransportError::ServerError(status) | TransportError::UnknownStatus(status) => {
                Some(status.as_u16())
            }
            TransportError::Network(_) | TransportError::Parse(_) => None,
        }
    }

    /// The message the upstream API put in its error body, if it sent one.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            TransportError::Forbidden { message, .. } | TransportError::BadRequest { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

/// Failure surfaced by an accessor: either the key was never configured, or the
/// transport failed and the endpoint plus the parameters sent are attached.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("YouTube API key is not configured. Please set YOUTUBE_API_KEY in your environment variables.")]
    MissingApiKey,
    #[error("{endpoint} request failed: {source}")]
    Request {
        endpoint: &'static str,
        params: Params,
        #[source]
        source: TransportError,
    },
    #[error("Query was cancelled before it completed")]
    Cancelled,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::MissingApiKey => ErrorKind::Configuration,
            CatalogError::Request { source, .. } => source.kind(),
            CatalogError::Cancelled => ErrorKind::Other,
        }
    }

    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            CatalogError::Request { source, .. } => Some(source),
            CatalogError::MissingApiKey | CatalogError::Cancelled => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn message_or<'a>(message: &'a Option<String>, fallback: &'a str) -> &'a str {
    message.as_deref().unwrap_or(fallback)
}

fn join_params(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
