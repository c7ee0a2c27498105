use serde::Serialize;

/// Coarse classification of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Decode,
    NotFound,
}

/// Error type for fetch operations.
///
/// Fetch errors never cross the cache boundary as `Err`; they are captured
/// into `CacheEntry::error` and surfaced through the entry status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// Transport failure or a non-2xx response other than 404.
    #[error("network error for '{url}': {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },
    /// The response body was not the JSON we expected.
    #[error("decode error for '{url}': {message}")]
    Decode { url: String, message: String },
    /// The resource does not exist.
    #[error("resource not found: '{url}'")]
    NotFound { url: String },
}

impl FetchError {
    /// Create a new network error.
    pub fn network(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        FetchError::Network {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a new decode error.
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error.
    pub fn not_found(url: impl Into<String>) -> Self {
        FetchError::NotFound { url: url.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network { .. } => ErrorKind::Network,
            FetchError::Decode { .. } => ErrorKind::Decode,
            FetchError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Human readable description without the URL prefix.
    pub fn message(&self) -> String {
        match self {
            FetchError::Network {
                status: Some(status),
                message,
                ..
            } => format!("HTTP {}: {}", status, message),
            FetchError::Network { message, .. } => message.clone(),
            FetchError::Decode { message, .. } => message.clone(),
            FetchError::NotFound { .. } => "not found".to_string(),
        }
    }

    /// The URL the failed operation targeted.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Decode { url, .. }
            | FetchError::NotFound { url } => url,
        }
    }
}

/// Error type for building a cache from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base url '{0}': expected an absolute http(s) url")]
    InvalidBaseUrl(String),
    #[error("invalid ttl {0}ms: must not be negative")]
    InvalidTtl(i64),
    #[error("invalid value for {var}: {message}")]
    Env { var: String, message: String },
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = FetchError::network("https://x/ep/2", Some(500), "boom");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.message(), "HTTP 500: boom");
        assert_eq!(err.url(), "https://x/ep/2");

        let err = FetchError::not_found("https://x/character/999");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "resource not found: 'https://x/character/999'");
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = FetchError::decode("/loc/3", "expected value at line 1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "decode");
        assert_eq!(json["url"], "/loc/3");
    }
}
