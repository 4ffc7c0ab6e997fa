use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A backend unique constraint rejected the write, i.e. `(ip, port)`.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error(
        "Unparseable date `{0}`; accepted formats: YYYYMMDD, YYYY-MM-DD, \
         YYYY-MM-DD HH:MM, YYYYMMDDHHMM, YYYY-MM-DD HH:MM:SS, YYYYMMDDHHMMSS"
    )]
    UnparseableDate(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Delete requires at least one criterion")]
    EmptyCriteria,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::DuplicateKey(db.message().to_string())
            }
            sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::StoreUnavailable(err.to_string()),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}
