use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The search backend could not answer. Distinct from a query with no matches.
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Index write failed: {0}")]
    Index(String),

    #[error("Store operation failed: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_search_unavailable(&self) -> bool {
        matches!(self, Error::SearchUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
