// src/error.rs
//! Error types for the crawler with a classified failure taxonomy.
//!
//! Every failure a task can hit is mapped onto a [`FailureClass`]. The class,
//! not the concrete error, decides what happens to the entity: rate limits
//! and transient failures leave it pending, access denial makes it terminal.

use std::fmt;
use thiserror::Error;

/// Remote error codes as a typed vocabulary.
///
/// Instead of matching on raw status numbers all over the crawler, the
/// remote source's signals are encoded once here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorCode {
    /// "Too many requests": back off before calling again
    RateLimited,
    /// The entity's listing is private or the session is not allowed to see it
    Forbidden,
    /// Credentials were rejected
    Unauthorized,
    /// The entity does not exist on the remote side
    NotFound,
    /// Remote internal error or temporary unavailability
    ServerError(u16),
    /// Any other unexpected status
    HttpStatus(u16),
}

impl RemoteErrorCode {
    /// Create from an HTTP status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            500..=599 => Self::ServerError(status),
            other => Self::HttpStatus(other),
        }
    }

    /// The failure class this code belongs to.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::RateLimited => FailureClass::RateLimited,
            Self::Forbidden | Self::Unauthorized => FailureClass::AccessDenied,
            Self::NotFound | Self::ServerError(_) | Self::HttpStatus(_) => FailureClass::Transient,
        }
    }
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::ServerError(code) => write!(f, "server_error_{}", code),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
        }
    }
}

/// Classification of a failure, deciding what happens to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Remote overload. Entity stays pending, the worker cools down.
    RateLimited,
    /// Entity is and will remain inaccessible. Persisted as terminal.
    AccessDenied,
    /// Network error, malformed payload, timeout. Entity stays pending.
    Transient,
    /// The store rejected an operation. Entity stays pending.
    Persistence,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate-limited"),
            Self::AccessDenied => write!(f, "access-denied"),
            Self::Transient => write!(f, "transient"),
            Self::Persistence => write!(f, "persistence"),
        }
    }
}

/// Errors raised by a [`GraphStore`](crate::GraphStore) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Snapshot IO error for {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Snapshot is not valid JSON: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Main crawler error type.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Remote source rate limit reached{}", .retry_after_secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Access denied for '{key}' ({code})")]
    AccessDenied { key: String, code: RemoteErrorCode },

    #[error("Network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Remote source returned an error ({code}) for {endpoint}")]
    RemoteStatus {
        code: RemoteErrorCode,
        endpoint: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CrawlError {
    /// Maps this error onto the crawler's failure taxonomy.
    pub fn class(&self) -> FailureClass {
        match self {
            CrawlError::RateLimited { .. } => FailureClass::RateLimited,
            CrawlError::AccessDenied { .. } => FailureClass::AccessDenied,
            CrawlError::RemoteStatus { code, .. } => code.class(),
            CrawlError::Persistence(_) => FailureClass::Persistence,
            CrawlError::Network(_)
            | CrawlError::MalformedResponse(_)
            | CrawlError::Io(_)
            | CrawlError::Configuration(_)
            | CrawlError::Validation(_)
            | CrawlError::Internal { .. } => FailureClass::Transient,
        }
    }

    /// Back-off hint the remote source attached to a rate limit.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            CrawlError::RateLimited { retry_after_secs } => {
                retry_after_secs.map(std::time::Duration::from_secs)
            }
            _ => None,
        }
    }

    /// Builds the error for a non-success HTTP status.
    pub fn from_status(status: u16, key: &str, endpoint: &str, retry_after_secs: Option<u64>) -> Self {
        let code = RemoteErrorCode::from_http_status(status);
        match code.class() {
            FailureClass::RateLimited => CrawlError::RateLimited { retry_after_secs },
            FailureClass::AccessDenied => CrawlError::AccessDenied {
                key: key.to_string(),
                code,
            },
            _ => CrawlError::RemoteStatus {
                code,
                endpoint: endpoint.to_string(),
            },
        }
    }
}

// Allow converting from anyhow::Error, preserving the message
impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        CrawlError::Internal {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(err: serde_json::Error) -> Self {
        CrawlError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = CrawlError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_onto_failure_classes() {
        assert_eq!(
            RemoteErrorCode::from_http_status(429).class(),
            FailureClass::RateLimited
        );
        assert_eq!(
            RemoteErrorCode::from_http_status(401).class(),
            FailureClass::AccessDenied
        );
        assert_eq!(
            RemoteErrorCode::from_http_status(403).class(),
            FailureClass::AccessDenied
        );
        assert_eq!(
            RemoteErrorCode::from_http_status(503).class(),
            FailureClass::Transient
        );
        assert_eq!(
            RemoteErrorCode::from_http_status(418).class(),
            FailureClass::Transient
        );
    }

    #[test]
    fn from_status_builds_classified_errors() {
        let err = CrawlError::from_status(429, "alice", "followers/list.json", Some(30));
        assert_eq!(err.class(), FailureClass::RateLimited);
        assert_eq!(
            err.to_string(),
            "Remote source rate limit reached, retry after 30s"
        );

        let err = CrawlError::from_status(401, "alice", "followers/list.json", None);
        assert_eq!(err.class(), FailureClass::AccessDenied);
        assert_eq!(err.to_string(), "Access denied for 'alice' (unauthorized)");

        let err = CrawlError::from_status(502, "alice", "followers/list.json", None);
        assert_eq!(err.class(), FailureClass::Transient);
    }

    #[test]
    fn store_errors_are_persistence_failures() {
        let err = CrawlError::from(StoreError::Unavailable("disk full".into()));
        assert_eq!(err.class(), FailureClass::Persistence);
    }
}
