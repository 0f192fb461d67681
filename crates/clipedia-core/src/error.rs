use thiserror::Error;

/// Errors surfaced by the command bridge and at the wire boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("item {id}: invalid capturedAt {value:?}")]
    Timestamp {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid page request (offset {offset}, limit {limit})")]
    InvalidPage { offset: usize, limit: usize },
    #[error("store task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
