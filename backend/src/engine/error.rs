use thiserror::Error;

/// Errors surfaced by the presentation editor collaborator.
///
/// `RateLimited` is the only transient variant: the engine retries it with a
/// bounded backoff. Everything else is recorded against the failing item and
/// the loop moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlideError {
    #[error("rate limited by the presentation API")]
    RateLimited,
    #[error("{0}")]
    Other(String),
}

/// Errors from the job/item persistence store. Always fatal: the store is
/// the single source of truth for progress, so the engine never continues
/// past a failed write.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("could not encode stored value: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Fatal engine errors. Per-item failures never appear here: they are
/// swallowed by the loop and recorded into the item and the job's error
/// list instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown template type: {0}")]
    UnknownTemplateType(String),
    #[error("could not read spreadsheet: {0}")]
    RowRead(String),
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("job store error: {0}")]
    Store(#[from] StoreError),
    #[error("presentation API error: {0}")]
    Slide(#[from] SlideError),
}
