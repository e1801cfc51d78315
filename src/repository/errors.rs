use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The database cannot be reached: no connection could be obtained.
    #[error("database unavailable: {0}")]
    Unavailable(#[from] diesel::r2d2::PoolError),
    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("invalid stored record: {0}")]
    Validation(String),
}

impl RepositoryError {
    /// Whether the gateway itself is unreachable, as opposed to a single
    /// record failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
