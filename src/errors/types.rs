//! Error type definitions for IPTV Manager
//!
//! Source errors describe everything that can go wrong while talking to a
//! single data provider. They never escape the source boundary during an
//! aggregation run: the aggregator logs them and carries on with an empty
//! contribution for that source. `AppError` is the top-level type used by
//! everything else (configuration, persistence, publishing).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Source handling errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Filesystem errors (publishing output, reading stores)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while fetching or decoding data from one source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Nobody connected back to the reply socket (or wrote the reply file) in time
    #[error("Timeout waiting for reply on {endpoint} after {timeout:?}")]
    TransportTimeout { endpoint: String, timeout: Duration },

    /// The peer connected but closed without sending anything
    #[error("Empty reply from {source_name}")]
    EmptyReply { source_name: String },

    /// The reply envelope carries a version newer than we understand
    #[error("Unsupported version {version} from {uri} (supported: {supported})")]
    UnsupportedVersion {
        uri: String,
        version: u64,
        supported: u64,
    },

    /// A record lacks a required field
    #[error("Incomplete record: missing {field}")]
    IncompleteRecord { field: String },

    /// A local file does not exist
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Generic network or process failure
    #[error("Fetch failed: {message}")]
    FetchFailed { message: String },

    /// The URI scheme cannot be handled by this kind of source
    #[error("Not implemented: unsupported URI {uri}")]
    NotImplemented { uri: String },

    /// The reply could not be decoded at all
    #[error("Malformed reply: {message}")]
    MalformedReply { message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create a fetch failed error
    pub fn fetch_failed<S: Into<String>>(message: S) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    /// Create a malformed reply error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedReply {
            message: message.into(),
        }
    }

    /// Create an incomplete record error
    pub fn incomplete<S: Into<String>>(field: S) -> Self {
        Self::IncompleteRecord {
            field: field.into(),
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::FetchFailed {
            message: err.to_string(),
        }
    }
}
