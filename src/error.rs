//! Error handling for divtrack
//!
//! Defines the pipeline error taxonomy and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for fetch and aggregation operations
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{provider} responded with {status}")]
    Http { provider: String, status: String },

    #[error("unable to retrieve {0} from cookies")]
    MissingCookie(String),

    #[error("instrument mismatch: requested {requested}, received {received}")]
    LookupMismatch { requested: String, received: String },

    #[error("{provider} has no data for {instrument}")]
    ProviderEmpty { provider: String, instrument: String },

    #[error("graphql error: {0}")]
    GraphQl(String),

    #[error("instrument {0} is not in the inventory")]
    NotInInventory(String),

    #[error("pagination stopped after {0} pages without reaching the end")]
    PageLimit(usize),

    #[error("offline: {provider} has no cached {resource}")]
    Offline { provider: String, resource: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to write cache entry {path}: {reason}")]
    CacheWrite { path: String, reason: String },
}

impl PipelineError {
    pub fn http(provider: &str, status: reqwest::StatusCode) -> Self {
        Self::Http {
            provider: provider.to_string(),
            status: status.to_string(),
        }
    }

    pub fn empty(provider: &str, instrument: &str) -> Self {
        Self::ProviderEmpty {
            provider: provider.to_string(),
            instrument: instrument.to_string(),
        }
    }

    pub fn cache_write(path: &str, err: &anyhow::Error) -> Self {
        Self::CacheWrite {
            path: path.to_string(),
            reason: format!("{:#}", err),
        }
    }
}

/// A failed cache write aborts the run, even inside best-effort lookups.
pub fn is_cache_write(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::CacheWrite { .. })
    )
}

/// Result type alias for pipeline operations
pub type Result<T> = anyhow::Result<T>;
