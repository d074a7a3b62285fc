//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Poller not configured: {0}")]
    NotConfigured(String),

    #[error("Store error: {0}")]
    Store(#[from] envwatch_persistence::PersistenceError),
}

pub type FeedResult<T> = Result<T, FeedError>;
